use axum::extract::{Path, State};
use axum::{Extension, Json};
use famgoals_shared::api;
use famgoals_shared::domain::{BackgroundFit, BackgroundType};

use super::auth::AuthCtx;
use super::extract::{ApiJson, ApiQuery};
use super::{AppError, AppState, required, rfc3339};
use crate::storage::models::{FamilySettings, SettingsChanges};

fn settings_dto(s: FamilySettings) -> api::SettingsDto {
    api::SettingsDto {
        updated_at: rfc3339(s.updated_at),
        id: s.id,
        family_id: s.family_id,
        theme: s.theme,
        background_type: s.background_type,
        background_value: s.background_value,
        background_fit: s.background_fit,
        background_position: s.background_position,
        background_blur: s.background_blur,
        background_overlay: s.background_overlay,
        background_overlay_color: s.background_overlay_color,
        background_contain_color: s.background_contain_color,
        accent_color: s.accent_color,
    }
}

pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::SettingsDto>, AppError> {
    let s = state.store.get_or_create_settings(auth.family_id()).await?;
    Ok(Json(settings_dto(s)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::UpdateSettingsReq>,
) -> Result<Json<api::UpdateSettingsResp>, AppError> {
    if let Some(t) = &body.background_type {
        t.parse::<BackgroundType>()
            .map_err(|e| AppError::bad_request(e.to_string()))?;
    }
    if let Some(f) = &body.background_fit {
        f.parse::<BackgroundFit>()
            .map_err(|e| AppError::bad_request(e.to_string()))?;
    }
    if body.background_blur.is_some_and(|b| b < 0) {
        return Err(AppError::bad_request("background_blur must not be negative"));
    }
    if body
        .background_overlay
        .is_some_and(|o| !(0.0..=1.0).contains(&o))
    {
        return Err(AppError::bad_request(
            "background_overlay must be between 0 and 1",
        ));
    }

    let changes = SettingsChanges {
        theme: body.theme,
        background_type: body.background_type,
        background_value: body.background_value,
        background_fit: body.background_fit,
        background_position: body.background_position,
        background_blur: body.background_blur,
        background_overlay: body.background_overlay,
        background_overlay_color: body.background_overlay_color,
        background_contain_color: body.background_contain_color,
        accent_color: body.accent_color,
        updated_at: None,
    };
    let s = state
        .store
        .update_settings(auth.family_id(), changes)
        .await?;
    Ok(Json(api::UpdateSettingsResp {
        success: true,
        settings: settings_dto(s),
    }))
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiQuery(q): ApiQuery<api::NotificationsQuery>,
) -> Result<Json<api::NotificationsResp>, AppError> {
    let member_id = required(q.member_id.as_deref().unwrap_or_default(), "Member ID")?;
    let member = state.member_in_family(&auth, member_id).await?;
    let (rows, unread_count) = state
        .store
        .list_notifications(&member.id, q.unread_only.unwrap_or(false))
        .await?;
    let mut notifications = Vec::with_capacity(rows.len());
    for (n, goal_title) in rows {
        notifications.push(api::NotificationDto {
            kind: n.kind.parse().map_err(AppError::internal)?,
            created_at: rfc3339(n.created_at),
            id: n.id,
            member_id: n.member_id,
            title: n.title,
            message: n.message,
            goal_id: n.goal_id,
            goal_title,
            is_read: n.is_read,
        });
    }
    Ok(Json(api::NotificationsResp {
        notifications,
        unread_count,
    }))
}

pub async fn create_notification(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::CreateNotificationReq>,
) -> Result<Json<api::CreateNotificationResp>, AppError> {
    let member_id = required(&body.member_id, "Member ID")?;
    let kind = body
        .kind
        .ok_or_else(|| AppError::bad_request("type is required"))?;
    let title = required(&body.title, "Title")?;
    let member = state.member_in_family(&auth, member_id).await?;
    let goal_id = match body.goal_id.as_deref().filter(|g| !g.is_empty()) {
        Some(g) => Some(state.goal_in_family(&auth, g).await?.id),
        None => None,
    };
    let id = state
        .store
        .create_notification(
            &member.id,
            kind,
            title,
            body.message.as_deref().filter(|m| !m.is_empty()),
            goal_id.as_deref(),
        )
        .await?;
    Ok(Json(api::CreateNotificationResp {
        success: true,
        notification_id: id,
    }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::SuccessResp>, AppError> {
    if !state
        .store
        .mark_notification_read(auth.family_id(), &id)
        .await?
    {
        return Err(AppError::not_found("Notification not found"));
    }
    Ok(Json(api::SuccessResp::ok()))
}
