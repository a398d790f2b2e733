use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use famgoals_shared::domain::{
    CompletionState, DEFAULT_EXERCISE_TARGET_MIN, DEFAULT_MINDFULNESS_TARGET_MIN,
    DEFAULT_STEPS_TARGET, DEFAULT_WATER_TARGET_ML, Frequency, GoalType, MAX_CUSTOM_GOALS,
};

use super::models::{Goal, GoalChanges, GoalCompletion, NewGoal, NewGoalCompletion};
use super::schema::{family_members, goal_completions, goals};
use super::{StorageError, Store, new_id, now_utc};

fn builtin_goal(
    member_id: &str,
    kind: GoalType,
    title: &str,
    description: &str,
    target: Option<(f64, Option<&str>)>,
    now: NaiveDateTime,
) -> NewGoal {
    NewGoal {
        id: new_id(),
        member_id: member_id.to_string(),
        goal_type: kind.as_str().to_string(),
        title: title.to_string(),
        description: Some(description.to_string()),
        target_value: target.map(|(v, _)| v),
        target_unit: target.and_then(|(_, u)| u.map(str::to_string)),
        assigned_by: None,
        is_custom: kind == GoalType::Custom,
        frequency: Frequency::Daily.as_str().to_string(),
        due_time: None,
        reminder_enabled: false,
        reminder_time: None,
        created_at: now,
    }
}

pub(crate) fn steps_goal(member_id: &str, now: NaiveDateTime) -> NewGoal {
    builtin_goal(
        member_id,
        GoalType::Steps,
        "Daily Steps",
        "Keep moving throughout the day",
        Some((DEFAULT_STEPS_TARGET, Some("steps"))),
        now,
    )
}

pub(crate) fn mindfulness_goal(member_id: &str, now: NaiveDateTime) -> NewGoal {
    builtin_goal(
        member_id,
        GoalType::Mindfulness,
        "Daily Mindfulness",
        "Take a few minutes to breathe and reset",
        Some((DEFAULT_MINDFULNESS_TARGET_MIN, Some("minutes"))),
        now,
    )
}

/// Goals every new member starts with: water, exercise, steps and one
/// editable custom goal.
pub(crate) fn default_goals(member_id: &str, now: NaiveDateTime) -> Vec<NewGoal> {
    vec![
        builtin_goal(
            member_id,
            GoalType::Water,
            "Drink Water",
            "Recommended daily intake: Men 3.7L, Women 2.7L, Teens 2-3L, Children 1-2L (source: Mayo Clinic)",
            Some((DEFAULT_WATER_TARGET_ML, Some("ml"))),
            now,
        ),
        builtin_goal(
            member_id,
            GoalType::Exercise,
            "Exercise",
            "Stay active!",
            Some((DEFAULT_EXERCISE_TARGET_MIN, Some("minutes"))),
            now,
        ),
        steps_goal(member_id, now),
        builtin_goal(
            member_id,
            GoalType::Custom,
            "My Goal",
            "Set your personal goal!",
            None,
            now,
        ),
    ]
}

/// Goal given by `assigner` to `assignee`.
pub(crate) fn assigned_goal(
    assignee_id: &str,
    assigner_id: &str,
    assigner_name: &str,
    now: NaiveDateTime,
) -> NewGoal {
    let mut goal = builtin_goal(
        assignee_id,
        GoalType::Assigned,
        &format!("Goal from {assigner_name}"),
        "Complete this goal!",
        None,
        now,
    );
    goal.assigned_by = Some(assigner_id.to_string());
    goal
}

/// Goals for `assignee_id` from every other member of `peers`, and from the
/// assignee to each of them.
pub(crate) fn assigned_goals_between(
    new_member: (&str, &str),
    peers: &[(String, String)],
    now: NaiveDateTime,
) -> Vec<NewGoal> {
    let (new_id_, new_name) = new_member;
    let mut out = Vec::with_capacity(peers.len() * 2);
    for (peer_id, peer_name) in peers {
        if peer_id == new_id_ {
            continue;
        }
        out.push(assigned_goal(new_id_, peer_id, peer_name, now));
        out.push(assigned_goal(peer_id, new_id_, new_name, now));
    }
    out
}

fn count_custom(
    conn: &mut SqliteConnection,
    member: &str,
    frequency: &str,
    excluding: Option<&str>,
) -> Result<i64, StorageError> {
    let mut q = goals::table
        .filter(goals::member_id.eq(member))
        .filter(goals::is_custom.eq(true))
        .filter(goals::frequency.eq(frequency))
        .into_boxed();
    if let Some(id) = excluding {
        q = q.filter(goals::id.ne(id));
    }
    Ok(q.count().get_result(conn)?)
}

fn custom_limit_error(frequency: &str) -> StorageError {
    StorageError::InvalidInput(format!(
        "Maximum {MAX_CUSTOM_GOALS} {frequency} custom goals allowed"
    ))
}

impl Store {
    /// All goals owned by members of `family_id`, optionally narrowed to one
    /// member, oldest first.
    pub async fn list_family_goals(
        &self,
        family_id: &str,
        member_id: Option<&str>,
    ) -> Result<Vec<Goal>, StorageError> {
        let fam = family_id.to_string();
        let member = member_id.map(str::to_string);
        self.blocking(move |conn| {
            let mut q = goals::table
                .inner_join(family_members::table.on(family_members::id.eq(goals::member_id)))
                .filter(family_members::family_id.eq(&fam))
                .select(Goal::as_select())
                .order((goals::created_at.asc(), goals::id.asc()))
                .into_boxed();
            if let Some(m) = &member {
                q = q.filter(goals::member_id.eq(m));
            }
            Ok(q.load(conn)?)
        })
        .await
    }

    pub async fn get_goal_in_family(
        &self,
        family_id: &str,
        goal_id: &str,
    ) -> Result<Option<Goal>, StorageError> {
        let fam = family_id.to_string();
        let gid = goal_id.to_string();
        self.blocking(move |conn| {
            Ok(goals::table
                .inner_join(family_members::table.on(family_members::id.eq(goals::member_id)))
                .filter(family_members::family_id.eq(&fam))
                .filter(goals::id.eq(&gid))
                .select(Goal::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    /// Target of the member's first goal of `kind`, if one exists and has a value.
    pub async fn goal_target(
        &self,
        member_id: &str,
        kind: GoalType,
    ) -> Result<Option<(f64, Option<String>)>, StorageError> {
        let member = member_id.to_string();
        self.blocking(move |conn| {
            let row: Option<(Option<f64>, Option<String>)> = goals::table
                .filter(goals::member_id.eq(&member))
                .filter(goals::goal_type.eq(kind.as_str()))
                .order(goals::created_at.asc())
                .select((goals::target_value, goals::target_unit))
                .first(conn)
                .optional()?;
            Ok(row.and_then(|(v, unit)| v.map(|v| (v, unit))))
        })
        .await
    }

    /// Inserts a goal, enforcing the per-frequency custom goal limit inside
    /// the same transaction.
    pub async fn create_goal(&self, goal: NewGoal) -> Result<Goal, StorageError> {
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Goal, StorageError> {
                if goal.is_custom
                    && count_custom(conn, &goal.member_id, &goal.frequency, None)?
                        >= MAX_CUSTOM_GOALS
                {
                    return Err(custom_limit_error(&goal.frequency));
                }
                Ok(diesel::insert_into(goals::table)
                    .values(&goal)
                    .returning(Goal::as_returning())
                    .get_result(conn)?)
            })
        })
        .await
    }

    /// Applies a partial update. Moving a custom goal to a frequency that is
    /// already full is rejected.
    pub async fn update_goal(
        &self,
        goal_id: &str,
        changes: GoalChanges,
    ) -> Result<(), StorageError> {
        let gid = goal_id.to_string();
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<(), StorageError> {
                let current: Goal = goals::table
                    .filter(goals::id.eq(&gid))
                    .select(Goal::as_select())
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| StorageError::NotFound("Goal not found".into()))?;
                if let Some(freq) = &changes.frequency
                    && current.is_custom
                    && *freq != current.frequency
                    && count_custom(conn, &current.member_id, freq, Some(&current.id))?
                        >= MAX_CUSTOM_GOALS
                {
                    return Err(custom_limit_error(freq));
                }
                if changes.is_empty() {
                    return Ok(());
                }
                diesel::update(goals::table.filter(goals::id.eq(&gid)))
                    .set(&changes)
                    .execute(conn)?;
                Ok(())
            })
        })
        .await
    }

    /// Deletes a custom goal. Built-in and assigned goals are not deletable,
    /// and report `false` just like a missing goal.
    pub async fn delete_custom_goal(
        &self,
        family_id: &str,
        goal_id: &str,
    ) -> Result<bool, StorageError> {
        let fam = family_id.to_string();
        let gid = goal_id.to_string();
        self.blocking(move |conn| {
            let owners = family_members::table
                .filter(family_members::family_id.eq(&fam))
                .select(family_members::id);
            let deleted = diesel::delete(
                goals::table
                    .filter(goals::id.eq(&gid))
                    .filter(goals::is_custom.eq(true))
                    .filter(goals::member_id.eq_any(owners)),
            )
            .execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Flips the completion of `goal_id` for `member_id` in the period keyed
    /// by `period`. Returns the state after the toggle.
    pub async fn toggle_completion(
        &self,
        goal_id: &str,
        member_id: &str,
        period: NaiveDate,
        value: Option<f64>,
        notes: Option<&str>,
    ) -> Result<CompletionState, StorageError> {
        let gid = goal_id.to_string();
        let mid = member_id.to_string();
        let notes = notes.map(str::to_string);
        self.blocking(move |conn| {
            conn.immediate_transaction(|conn| -> Result<CompletionState, StorageError> {
                let existing: Option<String> = goal_completions::table
                    .filter(goal_completions::goal_id.eq(&gid))
                    .filter(goal_completions::member_id.eq(&mid))
                    .filter(goal_completions::period_date.eq(period))
                    .select(goal_completions::id)
                    .first(conn)
                    .optional()?;
                let state = match existing {
                    Some(_) => CompletionState::Completed,
                    None => CompletionState::Incomplete,
                };
                match existing {
                    Some(id) => {
                        diesel::delete(goal_completions::table.filter(goal_completions::id.eq(id)))
                            .execute(conn)?;
                    }
                    None => {
                        let id = new_id();
                        diesel::insert_into(goal_completions::table)
                            .values(&NewGoalCompletion {
                                id: &id,
                                goal_id: &gid,
                                member_id: &mid,
                                period_date: period,
                                value,
                                notes: notes.as_deref(),
                                completed_at: now_utc(),
                            })
                            .execute(conn)?;
                    }
                }
                Ok(state.toggled())
            })
        })
        .await
    }

    /// Completions recorded by any of `member_ids` under one of `periods`.
    pub async fn completions_for(
        &self,
        member_ids: Vec<String>,
        periods: Vec<NaiveDate>,
    ) -> Result<Vec<GoalCompletion>, StorageError> {
        self.blocking(move |conn| {
            Ok(goal_completions::table
                .filter(goal_completions::member_id.eq_any(&member_ids))
                .filter(goal_completions::period_date.eq_any(&periods))
                .select(GoalCompletion::as_select())
                .load(conn)?)
        })
        .await
    }

    /// Completions of one member within `[start, end]`.
    pub async fn completions_in_range(
        &self,
        member_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<GoalCompletion>, StorageError> {
        let mid = member_id.to_string();
        self.blocking(move |conn| {
            Ok(goal_completions::table
                .filter(goal_completions::member_id.eq(&mid))
                .filter(goal_completions::period_date.between(start, end))
                .select(GoalCompletion::as_select())
                .load(conn)?)
        })
        .await
    }
}

impl GoalChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.target_value.is_none()
            && self.target_unit.is_none()
            && self.due_time.is_none()
            && self.reminder_enabled.is_none()
            && self.reminder_time.is_none()
            && self.frequency.is_none()
    }
}
