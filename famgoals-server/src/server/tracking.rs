use axum::extract::State;
use axum::{Extension, Json};
use chrono::NaiveDate;
use famgoals_shared::api;
use famgoals_shared::domain::{
    DEFAULT_EXERCISE_TARGET_MIN, DEFAULT_MINDFULNESS_TARGET_MIN, DEFAULT_STEPS_TARGET,
    DEFAULT_WATER_TARGET_ML, EntrySource, GoalType,
};
use tracing::debug;

use super::auth::AuthCtx;
use super::extract::{ApiJson, ApiQuery};
use super::{AppError, AppState, required, rfc3339};
use crate::storage::entries::Logged;
use crate::storage::models::Member;

const DEFAULT_EXERCISE_ICON: &str = "🏃";
const DEFAULT_EXERCISE_DURATION: i32 = 30;

/// Member and day addressed by an entries listing.
async fn listing_scope(
    state: &AppState,
    auth: &AuthCtx,
    q: &api::EntriesQuery,
) -> Result<(Member, NaiveDate), AppError> {
    let member_id = required(q.member_id.as_deref().unwrap_or_default(), "Member ID")?;
    let member = state.member_in_family(auth, member_id).await?;
    Ok((member, q.date.unwrap_or_else(|| state.today())))
}

/// Target and unit from the member's goal of `kind`, else the defaults.
async fn target_for(
    state: &AppState,
    member_id: &str,
    kind: GoalType,
    default_target: f64,
    default_unit: &str,
) -> Result<(f64, String), AppError> {
    let found = state.store.goal_target(member_id, kind).await?;
    Ok(match found {
        Some((value, unit)) if value > 0.0 => (
            value,
            unit.filter(|u| !u.is_empty())
                .unwrap_or_else(|| default_unit.to_string()),
        ),
        _ => (default_target, default_unit.to_string()),
    })
}

fn positive<T: PartialOrd + Default>(value: T, message: &str) -> Result<T, AppError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(AppError::bad_request(message))
    }
}

fn parse_source(raw: &str) -> Result<EntrySource, AppError> {
    raw.parse().map_err(AppError::internal)
}

fn logged(l: Logged) -> Json<api::LogEntryResp> {
    Json(api::LogEntryResp {
        success: true,
        id: l.id,
        updated: l.updated,
        total: l.total,
    })
}

pub async fn list_water(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiQuery(q): ApiQuery<api::EntriesQuery>,
) -> Result<Json<api::EntriesResp<api::WaterEntryDto>>, AppError> {
    let (member, day) = listing_scope(&state, &auth, &q).await?;
    let (rows, total) = state.store.list_water(&member.id, day).await?;
    let (target, unit) =
        target_for(&state, &member.id, GoalType::Water, DEFAULT_WATER_TARGET_ML, "ml").await?;
    let mut entries = Vec::with_capacity(rows.len());
    for e in rows {
        entries.push(api::WaterEntryDto {
            source: parse_source(&e.source)?,
            created_at: rfc3339(e.created_at),
            id: e.id,
            member_id: e.member_id,
            amount_ml: e.amount_ml,
            date: e.entry_date,
        });
    }
    Ok(Json(api::EntriesResp {
        entries,
        total,
        target,
        unit,
    }))
}

pub async fn log_water(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::LogWaterReq>,
) -> Result<Json<api::LogEntryResp>, AppError> {
    let member_id = required(&body.member_id, "Member ID")?;
    let amount = positive(body.amount_ml, "Amount must be positive")?;
    let member = state.member_in_family(&auth, member_id).await?;
    let day = body.date.unwrap_or_else(|| state.today());
    let source = body.source.unwrap_or_default();
    let res = state
        .store
        .log_water(&member.id, amount, day, source)
        .await?;
    debug!(member_id=%member.id, %day, %source, updated = res.updated, "log_water");
    Ok(logged(res))
}

pub async fn list_exercise(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiQuery(q): ApiQuery<api::EntriesQuery>,
) -> Result<Json<api::EntriesResp<api::ExerciseEntryDto>>, AppError> {
    let (member, day) = listing_scope(&state, &auth, &q).await?;
    let (rows, total) = state.store.list_exercise(&member.id, day).await?;
    let (target, unit) = target_for(
        &state,
        &member.id,
        GoalType::Exercise,
        DEFAULT_EXERCISE_TARGET_MIN,
        "minutes",
    )
    .await?;
    let entries = rows
        .into_iter()
        .map(|e| api::ExerciseEntryDto {
            created_at: rfc3339(e.created_at),
            id: e.id,
            member_id: e.member_id,
            duration_minutes: e.duration_minutes,
            activity: e.activity,
            notes: e.notes,
            date: e.entry_date,
        })
        .collect();
    Ok(Json(api::EntriesResp {
        entries,
        total: total as f64,
        target,
        unit,
    }))
}

pub async fn log_exercise(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::LogExerciseReq>,
) -> Result<Json<api::LogEntryResp>, AppError> {
    let member_id = required(&body.member_id, "Member ID")?;
    let minutes = positive(body.duration_minutes, "Duration must be positive")?;
    let member = state.member_in_family(&auth, member_id).await?;
    let day = body.date.unwrap_or_else(|| state.today());
    let res = state
        .store
        .log_exercise(
            &member.id,
            minutes,
            body.activity.as_deref().filter(|a| !a.is_empty()),
            body.notes.as_deref().filter(|n| !n.is_empty()),
            day,
        )
        .await?;
    Ok(logged(res))
}

pub async fn list_steps(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiQuery(q): ApiQuery<api::EntriesQuery>,
) -> Result<Json<api::EntriesResp<api::StepsEntryDto>>, AppError> {
    let (member, day) = listing_scope(&state, &auth, &q).await?;
    let (rows, total) = state.store.list_steps(&member.id, day).await?;
    let (target, unit) =
        target_for(&state, &member.id, GoalType::Steps, DEFAULT_STEPS_TARGET, "steps").await?;
    let mut entries = Vec::with_capacity(rows.len());
    for e in rows {
        entries.push(api::StepsEntryDto {
            source: parse_source(&e.source)?,
            created_at: rfc3339(e.created_at),
            id: e.id,
            member_id: e.member_id,
            steps: e.steps,
            date: e.entry_date,
        });
    }
    Ok(Json(api::EntriesResp {
        entries,
        total: total as f64,
        target,
        unit,
    }))
}

/// Healthkit readings are cumulative for the day and replace the previous
/// reading; manual entries are added.
pub async fn log_steps(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::LogStepsReq>,
) -> Result<Json<api::LogEntryResp>, AppError> {
    let member_id = required(&body.member_id, "Member ID")?;
    let steps = positive(body.steps, "Steps must be positive")?;
    let member = state.member_in_family(&auth, member_id).await?;
    let day = body.date.unwrap_or_else(|| state.today());
    let source = body.source.unwrap_or_default();
    let res = state.store.log_steps(&member.id, steps, day, source).await?;
    debug!(member_id=%member.id, %day, %source, updated = res.updated, "log_steps");
    Ok(logged(res))
}

pub async fn list_mindfulness(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiQuery(q): ApiQuery<api::EntriesQuery>,
) -> Result<Json<api::EntriesResp<api::MindfulnessEntryDto>>, AppError> {
    let (member, day) = listing_scope(&state, &auth, &q).await?;
    let (rows, total) = state.store.list_mindfulness(&member.id, day).await?;
    let (target, unit) = target_for(
        &state,
        &member.id,
        GoalType::Mindfulness,
        DEFAULT_MINDFULNESS_TARGET_MIN,
        "minutes",
    )
    .await?;
    let mut entries = Vec::with_capacity(rows.len());
    for e in rows {
        entries.push(api::MindfulnessEntryDto {
            source: parse_source(&e.source)?,
            created_at: rfc3339(e.created_at),
            id: e.id,
            member_id: e.member_id,
            duration_minutes: e.duration_minutes,
            date: e.entry_date,
            notes: e.notes,
        });
    }
    Ok(Json(api::EntriesResp {
        entries,
        total: total as f64,
        target,
        unit,
    }))
}

pub async fn log_mindfulness(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::LogMindfulnessReq>,
) -> Result<Json<api::LogEntryResp>, AppError> {
    let member_id = required(&body.member_id, "Member ID")?;
    let minutes = positive(body.duration_minutes, "Duration must be positive")?;
    let member = state.member_in_family(&auth, member_id).await?;
    let day = body.date.unwrap_or_else(|| state.today());
    let res = state
        .store
        .log_mindfulness(
            &member.id,
            minutes,
            body.source.unwrap_or_default(),
            body.notes.as_deref().filter(|n| !n.is_empty()),
            day,
        )
        .await?;
    Ok(logged(res))
}

pub async fn list_custom_exercises(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<Vec<api::CustomExerciseDto>>, AppError> {
    let rows = state.store.list_custom_exercises(auth.family_id()).await?;
    let items = rows
        .into_iter()
        .map(|(e, creator)| api::CustomExerciseDto {
            created_at: rfc3339(e.created_at),
            id: e.id,
            family_id: e.family_id,
            name: e.name,
            icon: e.icon,
            default_duration: e.default_duration,
            created_by: e.created_by,
            created_by_name: creator,
        })
        .collect();
    Ok(Json(items))
}

pub async fn create_custom_exercise(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::CreateCustomExerciseReq>,
) -> Result<Json<api::CustomExerciseDto>, AppError> {
    let name = required(&body.name, "Exercise name")?;
    let creator = match body.member_id.as_deref().filter(|m| !m.is_empty()) {
        Some(m) => Some(state.member_in_family(&auth, m).await?),
        None => None,
    };
    let icon = body
        .icon
        .as_deref()
        .filter(|i| !i.trim().is_empty())
        .unwrap_or(DEFAULT_EXERCISE_ICON);
    let duration = body
        .default_duration
        .filter(|d| *d > 0)
        .unwrap_or(DEFAULT_EXERCISE_DURATION);
    let e = state
        .store
        .create_custom_exercise(
            auth.family_id(),
            name,
            icon,
            duration,
            creator.as_ref().map(|m| m.id.as_str()),
        )
        .await?;
    Ok(Json(api::CustomExerciseDto {
        created_at: rfc3339(e.created_at),
        id: e.id,
        family_id: e.family_id,
        name: e.name,
        icon: e.icon,
        default_duration: e.default_duration,
        created_by: e.created_by,
        created_by_name: creator.map(|m| m.name),
    }))
}
