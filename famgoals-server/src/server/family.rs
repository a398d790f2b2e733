use axum::extract::{Path, State};
use axum::{Extension, Json};
use famgoals_shared::api;
use famgoals_shared::domain::DEFAULT_AVATAR_COLOR;
use tracing::{info, warn};

use super::auth::{AuthCtx, check_pin, hash_secret, verify_secret};
use super::extract::ApiJson;
use super::{AppError, AppState, member_dto, required, rfc3339};
use crate::storage::family::MemberSeed;

pub async fn get_family(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::FamilyInfoDto>, AppError> {
    let family = state
        .store
        .get_family(auth.family_id())
        .await?
        .ok_or_else(|| AppError::not_found("Family not found"))?;
    Ok(Json(api::FamilyInfoDto {
        created_at: rfc3339(family.created_at),
        id: family.id,
        name: family.name,
    }))
}

pub async fn update_family(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::UpdateFamilyReq>,
) -> Result<Json<api::UpdateFamilyResp>, AppError> {
    let name = required(&body.name, "Family name")?;
    state.store.rename_family(auth.family_id(), name).await?;
    Ok(Json(api::UpdateFamilyResp {
        success: true,
        name: name.to_string(),
    }))
}

/// Deletes the family and all of its data after re-checking the password.
pub async fn delete_family(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::DeleteFamilyReq>,
) -> Result<Json<api::SuccessResp>, AppError> {
    if body.password.is_empty() {
        return Err(AppError::bad_request("Password required for deletion"));
    }
    let family = state
        .store
        .get_family(auth.family_id())
        .await?
        .ok_or_else(|| AppError::not_found("Family not found"))?;
    if !verify_secret(&body.password, &family.password_hash).await? {
        warn!(family_id=%family.id, "delete_family: invalid password");
        return Err(AppError::unauthorized());
    }
    state.store.delete_family(&family.id).await?;
    if let Err(e) = state.blobs.remove_family(&family.id).await {
        warn!(family_id=%family.id, error=%e, "delete_family: failed to remove uploads");
    }
    info!(family_id=%family.id, "delete_family: family removed");
    Ok(Json(api::SuccessResp::ok()))
}

pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<Vec<api::MemberDto>>, AppError> {
    let rows = state.store.list_members(auth.family_id()).await?;
    Ok(Json(rows.into_iter().map(member_dto).collect()))
}

pub async fn add_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::AddMemberReq>,
) -> Result<Json<api::AddMemberResp>, AppError> {
    let name = required(&body.name, "Name")?;
    check_pin(&body.pin)?;
    let seed = MemberSeed {
        name: name.to_string(),
        pin_hash: hash_secret(&state, &body.pin).await?,
        avatar_color: body
            .avatar_color
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AVATAR_COLOR.to_string()),
    };
    let member = state.store.add_member(auth.family_id(), seed).await?;
    info!(family_id=%auth.family_id(), member_id=%member.id, "add_member: member created");
    Ok(Json(api::AddMemberResp {
        id: member.id,
        name: member.name,
        avatar_color: member.avatar_color,
    }))
}

pub async fn get_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::MemberDto>, AppError> {
    let member = state.member_in_family(&auth, &id).await?;
    Ok(Json(member_dto(member)))
}

/// Partial member update. Blank values are ignored; changing a PIN needs a
/// token issued for that member.
pub async fn update_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<api::UpdateMemberReq>,
) -> Result<Json<api::SuccessResp>, AppError> {
    let member = state.member_in_family(&auth, &id).await?;
    let non_blank = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let pin_hash = match body.pin.as_deref() {
        Some(pin) if !pin.is_empty() => {
            check_pin(pin)?;
            if auth.member_id() != Some(member.id.as_str()) {
                warn!(member_id=%member.id, "update_member: PIN change without member token");
                return Err(AppError::forbidden());
            }
            Some(hash_secret(&state, pin).await?)
        }
        _ => None,
    };

    state
        .store
        .update_member(
            auth.family_id(),
            &member.id,
            non_blank(body.name),
            non_blank(body.avatar_color),
            pin_hash,
        )
        .await?;
    Ok(Json(api::SuccessResp::ok()))
}

pub async fn delete_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::SuccessResp>, AppError> {
    state.store.delete_member(auth.family_id(), &id).await?;
    info!(family_id=%auth.family_id(), member_id=%id, "delete_member: member removed");
    Ok(Json(api::SuccessResp::ok()))
}
