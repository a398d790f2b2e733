use std::collections::HashMap;

use chrono::NaiveDate;
use diesel::dsl::sum;
use diesel::prelude::*;
use famgoals_shared::domain::EntrySource;

use super::models::{
    CustomExercise, ExerciseEntry, MindfulnessEntry, NewCustomExercise, NewExerciseEntry,
    NewMindfulnessEntry, NewStepsEntry, NewWaterEntry, StepsEntry, WaterEntry,
};
use super::schema::{
    custom_exercises, exercise_entries, family_members, mindfulness_entries, steps_entries,
    water_entries,
};
use super::{StorageError, Store, new_id, now_utc};

/// Outcome of logging an entry: the row written, whether an existing
/// healthkit reading was replaced, and the new daily total.
#[derive(Debug, Clone)]
pub struct Logged {
    pub id: String,
    pub updated: bool,
    pub total: f64,
}

/// Per-member sums for one day.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DailySums {
    pub water: f64,
    pub exercise: i64,
    pub steps: i64,
    pub mindfulness: i64,
}

/// Per-day water and exercise sums for one member.
#[derive(Debug, Default, Clone)]
pub struct DaySeries {
    pub water: HashMap<NaiveDate, f64>,
    pub exercise: HashMap<NaiveDate, i64>,
}

fn water_total(conn: &mut SqliteConnection, member: &str, day: NaiveDate) -> QueryResult<f64> {
    let total: Option<f64> = water_entries::table
        .filter(water_entries::member_id.eq(member))
        .filter(water_entries::entry_date.eq(day))
        .select(sum(water_entries::amount_ml))
        .first(conn)?;
    Ok(total.unwrap_or(0.0))
}

fn steps_total(conn: &mut SqliteConnection, member: &str, day: NaiveDate) -> QueryResult<i64> {
    let total: Option<i64> = steps_entries::table
        .filter(steps_entries::member_id.eq(member))
        .filter(steps_entries::entry_date.eq(day))
        .select(sum(steps_entries::steps))
        .first(conn)?;
    Ok(total.unwrap_or(0))
}

fn exercise_total(conn: &mut SqliteConnection, member: &str, day: NaiveDate) -> QueryResult<i64> {
    let total: Option<i64> = exercise_entries::table
        .filter(exercise_entries::member_id.eq(member))
        .filter(exercise_entries::entry_date.eq(day))
        .select(sum(exercise_entries::duration_minutes))
        .first(conn)?;
    Ok(total.unwrap_or(0))
}

fn mindfulness_total(
    conn: &mut SqliteConnection,
    member: &str,
    day: NaiveDate,
) -> QueryResult<i64> {
    let total: Option<i64> = mindfulness_entries::table
        .filter(mindfulness_entries::member_id.eq(member))
        .filter(mindfulness_entries::entry_date.eq(day))
        .select(sum(mindfulness_entries::duration_minutes))
        .first(conn)?;
    Ok(total.unwrap_or(0))
}

impl Store {
    pub async fn list_water(
        &self,
        member_id: &str,
        day: NaiveDate,
    ) -> Result<(Vec<WaterEntry>, f64), StorageError> {
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            let rows = water_entries::table
                .filter(water_entries::member_id.eq(&mid))
                .filter(water_entries::entry_date.eq(day))
                .order(water_entries::created_at.desc())
                .select(WaterEntry::as_select())
                .load(conn)?;
            Ok((rows, water_total(conn, &mid, day)?))
        })
        .await
    }

    /// Records water intake. A healthkit reading replaces the member's
    /// previous healthkit reading for the same day; manual entries append.
    pub async fn log_water(
        &self,
        member_id: &str,
        amount_ml: f64,
        day: NaiveDate,
        source: EntrySource,
    ) -> Result<Logged, StorageError> {
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Logged, StorageError> {
                let existing: Option<String> = if source == EntrySource::Healthkit {
                    water_entries::table
                        .filter(water_entries::member_id.eq(&mid))
                        .filter(water_entries::entry_date.eq(day))
                        .filter(water_entries::source.eq(source.as_str()))
                        .select(water_entries::id)
                        .first(conn)
                        .optional()?
                } else {
                    None
                };
                let (id, updated) = match existing {
                    Some(id) => {
                        diesel::update(water_entries::table.filter(water_entries::id.eq(&id)))
                            .set((
                                water_entries::amount_ml.eq(amount_ml),
                                water_entries::created_at.eq(now_utc()),
                            ))
                            .execute(conn)?;
                        (id, true)
                    }
                    None => {
                        let id = new_id();
                        diesel::insert_into(water_entries::table)
                            .values(&NewWaterEntry {
                                id: &id,
                                member_id: &mid,
                                amount_ml,
                                entry_date: day,
                                source: source.as_str(),
                                created_at: now_utc(),
                            })
                            .execute(conn)?;
                        (id, false)
                    }
                };
                let total = water_total(conn, &mid, day)?;
                Ok(Logged { id, updated, total })
            })
        })
        .await
    }

    pub async fn list_steps(
        &self,
        member_id: &str,
        day: NaiveDate,
    ) -> Result<(Vec<StepsEntry>, i64), StorageError> {
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            let rows = steps_entries::table
                .filter(steps_entries::member_id.eq(&mid))
                .filter(steps_entries::entry_date.eq(day))
                .order(steps_entries::created_at.desc())
                .select(StepsEntry::as_select())
                .load(conn)?;
            Ok((rows, steps_total(conn, &mid, day)?))
        })
        .await
    }

    /// Records a step count; same replace-or-append rule as [`Store::log_water`].
    pub async fn log_steps(
        &self,
        member_id: &str,
        steps: i32,
        day: NaiveDate,
        source: EntrySource,
    ) -> Result<Logged, StorageError> {
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Logged, StorageError> {
                let existing: Option<String> = if source == EntrySource::Healthkit {
                    steps_entries::table
                        .filter(steps_entries::member_id.eq(&mid))
                        .filter(steps_entries::entry_date.eq(day))
                        .filter(steps_entries::source.eq(source.as_str()))
                        .select(steps_entries::id)
                        .first(conn)
                        .optional()?
                } else {
                    None
                };
                let (id, updated) = match existing {
                    Some(id) => {
                        diesel::update(steps_entries::table.filter(steps_entries::id.eq(&id)))
                            .set((
                                steps_entries::steps.eq(steps),
                                steps_entries::created_at.eq(now_utc()),
                            ))
                            .execute(conn)?;
                        (id, true)
                    }
                    None => {
                        let id = new_id();
                        diesel::insert_into(steps_entries::table)
                            .values(&NewStepsEntry {
                                id: &id,
                                member_id: &mid,
                                steps,
                                entry_date: day,
                                source: source.as_str(),
                                created_at: now_utc(),
                            })
                            .execute(conn)?;
                        (id, false)
                    }
                };
                let total = steps_total(conn, &mid, day)? as f64;
                Ok(Logged { id, updated, total })
            })
        })
        .await
    }

    pub async fn list_exercise(
        &self,
        member_id: &str,
        day: NaiveDate,
    ) -> Result<(Vec<ExerciseEntry>, i64), StorageError> {
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            let rows = exercise_entries::table
                .filter(exercise_entries::member_id.eq(&mid))
                .filter(exercise_entries::entry_date.eq(day))
                .order(exercise_entries::created_at.desc())
                .select(ExerciseEntry::as_select())
                .load(conn)?;
            Ok((rows, exercise_total(conn, &mid, day)?))
        })
        .await
    }

    pub async fn log_exercise(
        &self,
        member_id: &str,
        minutes: i32,
        activity: Option<&str>,
        notes: Option<&str>,
        day: NaiveDate,
    ) -> Result<Logged, StorageError> {
        let mid = member_id.to_string();
        let activity = activity.map(str::to_string);
        let notes = notes.map(str::to_string);
        self.blocking(move |conn| {
            let id = new_id();
            diesel::insert_into(exercise_entries::table)
                .values(&NewExerciseEntry {
                    id: &id,
                    member_id: &mid,
                    duration_minutes: minutes,
                    activity: activity.as_deref(),
                    notes: notes.as_deref(),
                    entry_date: day,
                    created_at: now_utc(),
                })
                .execute(conn)?;
            let total = exercise_total(conn, &mid, day)? as f64;
            Ok(Logged {
                id,
                updated: false,
                total,
            })
        })
        .await
    }

    pub async fn list_mindfulness(
        &self,
        member_id: &str,
        day: NaiveDate,
    ) -> Result<(Vec<MindfulnessEntry>, i64), StorageError> {
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            let rows = mindfulness_entries::table
                .filter(mindfulness_entries::member_id.eq(&mid))
                .filter(mindfulness_entries::entry_date.eq(day))
                .order(mindfulness_entries::created_at.desc())
                .select(MindfulnessEntry::as_select())
                .load(conn)?;
            Ok((rows, mindfulness_total(conn, &mid, day)?))
        })
        .await
    }

    /// Mindfulness sessions always append, whatever their source.
    pub async fn log_mindfulness(
        &self,
        member_id: &str,
        minutes: i32,
        source: EntrySource,
        notes: Option<&str>,
        day: NaiveDate,
    ) -> Result<Logged, StorageError> {
        let mid = member_id.to_string();
        let notes = notes.map(str::to_string);
        self.blocking(move |conn| {
            let id = new_id();
            diesel::insert_into(mindfulness_entries::table)
                .values(&NewMindfulnessEntry {
                    id: &id,
                    member_id: &mid,
                    duration_minutes: minutes,
                    entry_date: day,
                    source: source.as_str(),
                    notes: notes.as_deref(),
                    created_at: now_utc(),
                })
                .execute(conn)?;
            let total = mindfulness_total(conn, &mid, day)? as f64;
            Ok(Logged {
                id,
                updated: false,
                total,
            })
        })
        .await
    }

    /// Sums for each of `member_ids` on `day`. Members without entries map
    /// to zeroes.
    pub async fn daily_sums(
        &self,
        member_ids: Vec<String>,
        day: NaiveDate,
    ) -> Result<HashMap<String, DailySums>, StorageError> {
        self.blocking(move |conn| {
            let mut out: HashMap<String, DailySums> = member_ids
                .iter()
                .map(|id| (id.clone(), DailySums::default()))
                .collect();

            let water: Vec<(String, Option<f64>)> = water_entries::table
                .filter(water_entries::member_id.eq_any(&member_ids))
                .filter(water_entries::entry_date.eq(day))
                .group_by(water_entries::member_id)
                .select((water_entries::member_id, sum(water_entries::amount_ml)))
                .load(conn)?;
            for (id, v) in water {
                out.entry(id).or_default().water = v.unwrap_or(0.0);
            }

            let exercise: Vec<(String, Option<i64>)> = exercise_entries::table
                .filter(exercise_entries::member_id.eq_any(&member_ids))
                .filter(exercise_entries::entry_date.eq(day))
                .group_by(exercise_entries::member_id)
                .select((
                    exercise_entries::member_id,
                    sum(exercise_entries::duration_minutes),
                ))
                .load(conn)?;
            for (id, v) in exercise {
                out.entry(id).or_default().exercise = v.unwrap_or(0);
            }

            let steps: Vec<(String, Option<i64>)> = steps_entries::table
                .filter(steps_entries::member_id.eq_any(&member_ids))
                .filter(steps_entries::entry_date.eq(day))
                .group_by(steps_entries::member_id)
                .select((steps_entries::member_id, sum(steps_entries::steps)))
                .load(conn)?;
            for (id, v) in steps {
                out.entry(id).or_default().steps = v.unwrap_or(0);
            }

            let mindfulness: Vec<(String, Option<i64>)> = mindfulness_entries::table
                .filter(mindfulness_entries::member_id.eq_any(&member_ids))
                .filter(mindfulness_entries::entry_date.eq(day))
                .group_by(mindfulness_entries::member_id)
                .select((
                    mindfulness_entries::member_id,
                    sum(mindfulness_entries::duration_minutes),
                ))
                .load(conn)?;
            for (id, v) in mindfulness {
                out.entry(id).or_default().mindfulness = v.unwrap_or(0);
            }

            Ok(out)
        })
        .await
    }

    /// Water and exercise totals per day within `[start, end]`.
    pub async fn day_series(
        &self,
        member_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DaySeries, StorageError> {
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            let water: Vec<(NaiveDate, Option<f64>)> = water_entries::table
                .filter(water_entries::member_id.eq(&mid))
                .filter(water_entries::entry_date.between(start, end))
                .group_by(water_entries::entry_date)
                .select((water_entries::entry_date, sum(water_entries::amount_ml)))
                .load(conn)?;
            let exercise: Vec<(NaiveDate, Option<i64>)> = exercise_entries::table
                .filter(exercise_entries::member_id.eq(&mid))
                .filter(exercise_entries::entry_date.between(start, end))
                .group_by(exercise_entries::entry_date)
                .select((
                    exercise_entries::entry_date,
                    sum(exercise_entries::duration_minutes),
                ))
                .load(conn)?;
            Ok(DaySeries {
                water: water
                    .into_iter()
                    .map(|(d, v)| (d, v.unwrap_or(0.0)))
                    .collect(),
                exercise: exercise
                    .into_iter()
                    .map(|(d, v)| (d, v.unwrap_or(0)))
                    .collect(),
            })
        })
        .await
    }

    /// Custom exercises of the family with the creator's name, by name.
    pub async fn list_custom_exercises(
        &self,
        family_id: &str,
    ) -> Result<Vec<(CustomExercise, Option<String>)>, StorageError> {
        let fid = family_id.to_string();
        self.blocking(move |conn| {
            Ok(custom_exercises::table
                .left_join(
                    family_members::table
                        .on(family_members::id.nullable().eq(custom_exercises::created_by)),
                )
                .filter(custom_exercises::family_id.eq(&fid))
                .order((custom_exercises::name.asc(), custom_exercises::id.asc()))
                .select((
                    CustomExercise::as_select(),
                    family_members::name.nullable(),
                ))
                .load(conn)?)
        })
        .await
    }

    pub async fn create_custom_exercise(
        &self,
        family_id: &str,
        name: &str,
        icon: &str,
        default_duration: i32,
        created_by: Option<&str>,
    ) -> Result<CustomExercise, StorageError> {
        let fid = family_id.to_string();
        let name = name.to_string();
        let icon = icon.to_string();
        let created_by = created_by.map(str::to_string);
        self.blocking(move |conn| {
            let id = new_id();
            Ok(diesel::insert_into(custom_exercises::table)
                .values(&NewCustomExercise {
                    id: &id,
                    family_id: &fid,
                    name: &name,
                    icon: &icon,
                    default_duration,
                    created_by: created_by.as_deref(),
                    created_at: now_utc(),
                })
                .returning(CustomExercise::as_returning())
                .get_result(conn)?)
        })
        .await
    }
}
