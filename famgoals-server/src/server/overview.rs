use std::collections::HashSet;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::NaiveDate;
use famgoals_shared::api;
use famgoals_shared::domain::{
    Frequency, month_end, month_start, shift_months, shift_weeks, week_end, week_start,
};

use super::auth::AuthCtx;
use super::extract::ApiQuery;
use super::{AppError, AppState, goal_dto};
use crate::progress;

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<Vec<api::DashboardMemberDto>>, AppError> {
    let today = state.today();
    let members = state.store.list_members(auth.family_id()).await?;
    let member_ids: Vec<String> = members.iter().map(|m| m.id.clone()).collect();

    let goals = state
        .store
        .list_family_goals(auth.family_id(), None)
        .await?
        .into_iter()
        .map(|g| goal_dto(g, &members))
        .collect::<Result<Vec<_>, _>>()?;
    let completions = state
        .store
        .completions_for(member_ids.clone(), vec![today, week_start(today)])
        .await?;
    let mut sums = state.store.daily_sums(member_ids, today).await?;

    let cards = members
        .into_iter()
        .map(|m| {
            let own: Vec<api::GoalDto> = goals
                .iter()
                .filter(|g| g.member_id == m.id)
                .cloned()
                .collect();
            let own_completions: Vec<_> = completions
                .iter()
                .filter(|c| c.member_id == m.id)
                .cloned()
                .collect();
            let member_sums = sums.remove(&m.id).unwrap_or_default();
            progress::dashboard_member(m, own, &own_completions, member_sums, today)
        })
        .collect();
    Ok(Json(cards))
}

async fn member_stats(
    state: &AppState,
    auth: &AuthCtx,
    member_id: &str,
    period: &str,
    (start, end): (NaiveDate, NaiveDate),
) -> Result<api::StatsDto, AppError> {
    let member = state.member_in_family(auth, member_id).await?;
    let daily_goal_ids: HashSet<String> = state
        .store
        .list_family_goals(auth.family_id(), Some(&member.id))
        .await?
        .into_iter()
        .filter(|g| g.frequency == Frequency::Daily.as_str())
        .map(|g| g.id)
        .collect();
    let completions = state
        .store
        .completions_in_range(&member.id, start, end)
        .await?;
    let series = state.store.day_series(&member.id, start, end).await?;
    Ok(progress::build_stats(
        period,
        start,
        end,
        state.today(),
        &daily_goal_ids,
        &completions,
        &series,
    ))
}

/// Monday-to-Sunday stats, `weekOffset` weeks away from the current week.
pub async fn week_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(member_id): Path<String>,
    ApiQuery(q): ApiQuery<api::WeekStatsQuery>,
) -> Result<Json<api::StatsDto>, AppError> {
    let anchor = shift_weeks(state.today(), q.week_offset.unwrap_or(0));
    let range = (week_start(anchor), week_end(anchor));
    Ok(Json(
        member_stats(&state, &auth, &member_id, "week", range).await?,
    ))
}

/// Calendar month stats, `monthOffset` months away from the current month.
pub async fn month_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(member_id): Path<String>,
    ApiQuery(q): ApiQuery<api::MonthStatsQuery>,
) -> Result<Json<api::StatsDto>, AppError> {
    let anchor = shift_months(state.today(), q.month_offset.unwrap_or(0));
    let range = (month_start(anchor), month_end(anchor));
    Ok(Json(
        member_stats(&state, &auth, &member_id, "month", range).await?,
    ))
}
