use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use famgoals_shared::api;
use famgoals_shared::domain::{GoalType, period_key};
use tracing::info;

use super::auth::AuthCtx;
use super::extract::{ApiJson, ApiQuery, optional_json};
use super::{AppError, AppState, goal_dto, required};
use crate::storage::models::{GoalChanges, NewGoal};
use crate::storage::{new_id, now_utc};

pub async fn list_goals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiQuery(q): ApiQuery<api::GoalsQuery>,
) -> Result<Json<Vec<api::GoalDto>>, AppError> {
    let member = q.member_id.as_deref().filter(|m| !m.is_empty());
    if let Some(m) = member {
        state.member_in_family(&auth, m).await?;
    }
    let roster = state.store.list_members(auth.family_id()).await?;
    let rows = state
        .store
        .list_family_goals(auth.family_id(), member)
        .await?;
    let items = rows
        .into_iter()
        .map(|g| goal_dto(g, &roster))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(items))
}

pub async fn create_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::CreateGoalReq>,
) -> Result<Json<api::GoalDto>, AppError> {
    let member_id = required(&body.member_id, "Member ID")?;
    let title = required(&body.title, "Title")?;
    let member = state.member_in_family(&auth, member_id).await?;
    let assigned_by = match body.assigned_by.as_deref().filter(|a| !a.is_empty()) {
        Some(a) => Some(state.member_in_family(&auth, a).await?.id),
        None => None,
    };
    let goal_type = body.goal_type.unwrap_or(GoalType::Custom);
    let frequency = body.frequency.unwrap_or_default();

    let created = state
        .store
        .create_goal(NewGoal {
            id: new_id(),
            member_id: member.id,
            goal_type: goal_type.as_str().to_string(),
            title: title.to_string(),
            description: body.description.filter(|d| !d.is_empty()),
            target_value: body.target_value,
            target_unit: body.target_unit.filter(|u| !u.is_empty()),
            assigned_by,
            is_custom: goal_type == GoalType::Custom,
            frequency: frequency.as_str().to_string(),
            due_time: body.due_time.filter(|t| !t.is_empty()),
            reminder_enabled: body.reminder_enabled.unwrap_or(false),
            reminder_time: body.reminder_time.filter(|t| !t.is_empty()),
            created_at: now_utc(),
        })
        .await?;
    info!(goal_id=%created.id, member_id=%created.member_id, kind=%goal_type, "create_goal: goal created");
    let roster = state.store.list_members(auth.family_id()).await?;
    Ok(Json(goal_dto(created, &roster)?))
}

pub async fn update_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<api::UpdateGoalReq>,
) -> Result<Json<api::SuccessResp>, AppError> {
    let goal = state.goal_in_family(&auth, &id).await?;
    if let Some(t) = &body.title
        && t.trim().is_empty()
    {
        return Err(AppError::bad_request("Title cannot be empty"));
    }
    let changes = GoalChanges {
        title: body.title.map(|t| t.trim().to_string()),
        description: body.description,
        target_value: body.target_value,
        target_unit: body.target_unit,
        due_time: body.due_time,
        reminder_enabled: body.reminder_enabled,
        reminder_time: body.reminder_time,
        frequency: body.frequency.map(|f| f.as_str().to_string()),
    };
    state.store.update_goal(&goal.id, changes).await?;
    Ok(Json(api::SuccessResp::ok()))
}

/// Only custom goals can be deleted; anything else reads as not found.
pub async fn delete_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::SuccessResp>, AppError> {
    if !state.store.delete_custom_goal(auth.family_id(), &id).await? {
        return Err(AppError::not_found("Custom goal not found"));
    }
    Ok(Json(api::SuccessResp::ok()))
}

/// Toggles the goal for the current period: today for daily goals, the
/// Monday of this week for weekly ones.
pub async fn complete_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<api::CompleteGoalResp>, AppError> {
    let body: api::CompleteGoalReq = optional_json(&body)?;
    let goal = state.goal_in_family(&auth, &id).await?;
    let member_id = match body.member_id.as_deref().filter(|m| !m.is_empty()) {
        Some(m) => state.member_in_family(&auth, m).await?.id,
        None => goal.member_id.clone(),
    };
    let frequency = goal.frequency.parse().map_err(AppError::internal)?;
    let date = period_key(frequency, state.today());
    let notes = body.notes.as_deref().filter(|n| !n.is_empty());
    let completion = state
        .store
        .toggle_completion(&goal.id, &member_id, date, body.value, notes)
        .await?;
    Ok(Json(api::CompleteGoalResp {
        completed: completion.is_completed(),
        date,
    }))
}
