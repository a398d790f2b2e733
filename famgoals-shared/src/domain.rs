use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of members a family may have.
pub const MIN_MEMBERS: usize = 2;
/// Maximum number of members a family may have.
pub const MAX_MEMBERS: usize = 10;
/// Custom goals allowed per member and frequency.
pub const MAX_CUSTOM_GOALS: i64 = 4;

pub const DEFAULT_AVATAR_COLOR: &str = "#6366f1";
pub const DEFAULT_WATER_TARGET_ML: f64 = 3000.0;
pub const LEGACY_WATER_TARGET_ML: f64 = 2000.0;
pub const DEFAULT_EXERCISE_TARGET_MIN: f64 = 30.0;
pub const DEFAULT_STEPS_TARGET: f64 = 10000.0;
pub const DEFAULT_MINDFULNESS_TARGET_MIN: f64 = 15.0;

#[derive(Debug, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum!(
    /// What a goal tracks. Built-in kinds are backed by an entry log.
    GoalType, "goal type", {
        Water => "water",
        Exercise => "exercise",
        Steps => "steps",
        Mindfulness => "mindfulness",
        Custom => "custom",
        Assigned => "assigned",
    }
);

string_enum!(Frequency, "frequency", {
    Daily => "daily",
    Weekly => "weekly",
});

string_enum!(
    /// Where a tracking entry came from. `Healthkit` readings are cumulative
    /// per day and replace the previous reading instead of adding to it.
    EntrySource, "source", {
        Manual => "manual",
        Healthkit => "healthkit",
    }
);

string_enum!(PhotoKind, "photo type", {
    Profile => "profile",
    Goal => "goal",
    Background => "background",
});

string_enum!(NotificationKind, "notification type", {
    Reminder => "reminder",
    Achievement => "achievement",
    Assignment => "assignment",
    Streak => "streak",
});

string_enum!(BackgroundType, "background type", {
    Gradient => "gradient",
    Photo => "photo",
});

string_enum!(BackgroundFit, "background fit", {
    Cover => "cover",
    Contain => "contain",
    Fill => "fill",
});

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Daily
    }
}

impl Default for EntrySource {
    fn default() -> Self {
        EntrySource::Manual
    }
}

/// Completion state of a goal for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    Incomplete,
    Completed,
}

impl CompletionState {
    pub fn is_completed(self) -> bool {
        matches!(self, CompletionState::Completed)
    }

    pub fn toggled(self) -> Self {
        match self {
            CompletionState::Incomplete => CompletionState::Completed,
            CompletionState::Completed => CompletionState::Incomplete,
        }
    }
}

/// Supported units for logging water; everything is stored in milliliters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterUnit {
    #[serde(rename = "ml")]
    Milliliters,
    #[serde(rename = "L")]
    Liters,
    #[serde(rename = "oz")]
    FluidOunces,
    #[serde(rename = "cups")]
    Cups,
}

impl WaterUnit {
    fn factor(self) -> f64 {
        match self {
            WaterUnit::Milliliters => 1.0,
            WaterUnit::Liters => 1000.0,
            WaterUnit::FluidOunces => 29.5735,
            WaterUnit::Cups => 236.588,
        }
    }

    /// Converts to whole milliliters.
    pub fn to_ml(self, value: f64) -> f64 {
        (value * self.factor()).round()
    }

    /// Converts milliliters to this unit, rounded to one decimal.
    pub fn from_ml(self, ml: f64) -> f64 {
        ((ml / self.factor()) * 10.0).round() / 10.0
    }
}

impl FromStr for WaterUnit {
    type Err = ParseEnumError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ml" => Ok(WaterUnit::Milliliters),
            "L" | "l" => Ok(WaterUnit::Liters),
            "oz" => Ok(WaterUnit::FluidOunces),
            "cups" => Ok(WaterUnit::Cups),
            other => Err(ParseEnumError {
                kind: "water unit",
                value: other.to_string(),
            }),
        }
    }
}

pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday() as u64;
    date - Days::new(back)
}

/// Sunday of the ISO week containing `date`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Days::new(6)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    let first = month_start(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

/// Shifts `date` by whole weeks, negative offsets go back in time.
pub fn shift_weeks(date: NaiveDate, offset: i32) -> NaiveDate {
    let days = Days::new((offset.unsigned_abs() as u64) * 7);
    if offset >= 0 {
        date.checked_add_days(days).unwrap_or(date)
    } else {
        date.checked_sub_days(days).unwrap_or(date)
    }
}

/// Shifts `date` by whole months, clamping the day to the target month.
pub fn shift_months(date: NaiveDate, offset: i32) -> NaiveDate {
    let months = Months::new(offset.unsigned_abs());
    if offset >= 0 {
        date.checked_add_months(months).unwrap_or(date)
    } else {
        date.checked_sub_months(months).unwrap_or(date)
    }
}

/// The date a completion for a goal of `frequency` is stored under.
pub fn period_key(frequency: Frequency, today: NaiveDate) -> NaiveDate {
    match frequency {
        Frequency::Daily => today,
        Frequency::Weekly => week_start(today),
    }
}

/// Every calendar day in `[start, end]`, inclusive.
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

/// A PIN is exactly four ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}
