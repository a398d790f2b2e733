//! Dashboard and statistics aggregation over rows already loaded from the
//! store. Everything here is pure so the arithmetic can be tested directly.

use std::collections::HashSet;

use chrono::NaiveDate;
use famgoals_shared::api::{
    DashboardGoalDto, DashboardMemberDto, GoalDto, ProgressDto, StatsDayDto, StatsDto,
    StatsSummaryDto,
};
use famgoals_shared::domain::{
    DEFAULT_EXERCISE_TARGET_MIN, DEFAULT_MINDFULNESS_TARGET_MIN, DEFAULT_STEPS_TARGET,
    DEFAULT_WATER_TARGET_ML, Frequency, GoalType, days_in_range, period_key,
};

use crate::storage::entries::{DailySums, DaySeries};
use crate::storage::models::{GoalCompletion, Member};

/// Target of the first goal of `kind` with a positive value.
fn target_of(goals: &[GoalDto], kind: GoalType, fallback: f64) -> f64 {
    goals
        .iter()
        .filter(|g| g.goal_type == kind)
        .find_map(|g| g.target_value.filter(|v| *v > 0.0))
        .unwrap_or(fallback)
}

/// Builds one member's dashboard card. `completions` may contain rows for
/// any period; only those under each goal's current period key count.
pub fn dashboard_member(
    member: Member,
    goals: Vec<GoalDto>,
    completions: &[GoalCompletion],
    sums: DailySums,
    today: NaiveDate,
) -> DashboardMemberDto {
    let water_target = target_of(&goals, GoalType::Water, DEFAULT_WATER_TARGET_ML);
    let exercise_target = target_of(&goals, GoalType::Exercise, DEFAULT_EXERCISE_TARGET_MIN);
    let steps_target = target_of(&goals, GoalType::Steps, DEFAULT_STEPS_TARGET);
    let mindfulness_target =
        target_of(&goals, GoalType::Mindfulness, DEFAULT_MINDFULNESS_TARGET_MIN);

    let goals: Vec<DashboardGoalDto> = goals
        .into_iter()
        .map(|goal| {
            let period = period_key(goal.frequency, today);
            let done = completions
                .iter()
                .find(|c| c.goal_id == goal.id && c.period_date == period);
            DashboardGoalDto {
                is_completed: done.is_some(),
                completion_value: done.and_then(|c| c.value),
                completion_notes: done.and_then(|c| c.notes.clone()),
                goal,
            }
        })
        .collect();

    let count = |freq: Frequency, done_only: bool| {
        goals
            .iter()
            .filter(|g| g.goal.frequency == freq && (!done_only || g.is_completed))
            .count()
    };
    let completed_count = count(Frequency::Daily, true);
    let total_goals = count(Frequency::Daily, false);
    let weekly_completed_count = count(Frequency::Weekly, true);
    let weekly_total_goals = count(Frequency::Weekly, false);

    DashboardMemberDto {
        id: member.id,
        name: member.name,
        avatar_color: member.avatar_color,
        profile_photo_url: member.profile_photo_url,
        goals,
        water_progress: ProgressDto {
            current: sums.water,
            target: water_target,
        },
        exercise_progress: ProgressDto {
            current: sums.exercise as f64,
            target: exercise_target,
        },
        steps_progress: ProgressDto {
            current: sums.steps as f64,
            target: steps_target,
        },
        mindfulness_progress: ProgressDto {
            current: sums.mindfulness as f64,
            target: mindfulness_target,
        },
        completed_count,
        total_goals,
        weekly_completed_count,
        weekly_total_goals,
    }
}

/// One row per day of `[start, end]`. `completed` counts completions of the
/// given daily goals on that day; `total` is the number of daily goals.
pub fn stats_days(
    start: NaiveDate,
    end: NaiveDate,
    daily_goal_ids: &HashSet<String>,
    completions: &[GoalCompletion],
    series: &DaySeries,
) -> Vec<StatsDayDto> {
    let total = daily_goal_ids.len() as i64;
    days_in_range(start, end)
        .into_iter()
        .map(|date| StatsDayDto {
            date,
            completed: completions
                .iter()
                .filter(|c| c.period_date == date && daily_goal_ids.contains(&c.goal_id))
                .count() as i64,
            total,
            water: series.water.get(&date).copied().unwrap_or(0.0),
            exercise: series.exercise.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

fn is_perfect(day: &StatsDayDto) -> bool {
    day.total > 0 && day.completed >= day.total
}

/// Summary over `days`. The streak counts perfect days backwards from
/// `anchor` (days after it are ignored); days without goals neither extend
/// nor break it.
pub fn summarize(days: &[StatsDayDto], anchor: NaiveDate) -> StatsSummaryDto {
    let completed: i64 = days.iter().map(|d| d.completed).sum();
    let possible: i64 = days.iter().map(|d| d.total).sum();
    let avg_completion = if possible > 0 {
        ((completed as f64 / possible as f64) * 100.0).round() as i64
    } else {
        0
    };

    let mut current_streak = 0;
    for day in days.iter().rev().filter(|d| d.date <= anchor) {
        if day.total == 0 {
            continue;
        }
        if !is_perfect(day) {
            break;
        }
        current_streak += 1;
    }

    StatsSummaryDto {
        avg_completion,
        perfect_days: days.iter().filter(|d| is_perfect(d)).count(),
        current_streak,
        total_water: days.iter().map(|d| d.water).sum(),
        total_exercise: days.iter().map(|d| d.exercise).sum(),
    }
}

/// Full stats payload for a range; the streak is anchored at `today` or at
/// the end of the range, whichever comes first.
pub fn build_stats(
    period: &str,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    daily_goal_ids: &HashSet<String>,
    completions: &[GoalCompletion],
    series: &DaySeries,
) -> StatsDto {
    let days = stats_days(start, end, daily_goal_ids, completions, series);
    let summary = summarize(&days, today.min(end));
    StatsDto {
        period: period.to_string(),
        start_date: start,
        end_date: end,
        days,
        summary,
    }
}
