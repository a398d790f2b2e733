use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use axum::{Extension, Json};
use chrono::{Duration, Utc};
use famgoals_shared::api;
use famgoals_shared::domain::{DEFAULT_AVATAR_COLOR, MAX_MEMBERS, MIN_MEMBERS, is_valid_pin};
use famgoals_shared::jwt::{self, JwtClaims};
use tracing::{error, info, warn};

use super::extract::ApiJson;
use super::{AppError, AppState, goal_dto, member_dto};
use crate::storage::family::MemberSeed;

/// How many days of inactivity before a session is considered expired.
const SESSION_IDLE_DAYS: i64 = 14;
/// How many days before mandatory re-login.
const TOKEN_TTL_DAYS: i64 = 30;

#[derive(Clone, Debug)]
pub struct AuthCtx {
    pub claims: JwtClaims,
}

impl AuthCtx {
    pub fn family_id(&self) -> &str {
        &self.claims.family_id
    }

    /// Member selected through PIN verification, if any.
    pub fn member_id(&self) -> Option<&str> {
        self.claims.member_id.as_deref()
    }
}

pub async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let unauthorized = || Err(AppError::unauthorized());
    let header_val = match req.headers().get(header::AUTHORIZATION) {
        Some(v) => v,
        None => return unauthorized(),
    };
    let header_str = header_val.to_str().map_err(|_| AppError::unauthorized())?;
    let Some(token) = header_str.strip_prefix("Bearer ") else {
        return unauthorized();
    };

    let claims = match jwt::decode_and_verify(token, state.config.jwt_secret.as_bytes()) {
        Ok(c) => c,
        Err(e) => {
            warn!(error=%e, "auth: jwt decode failed");
            return unauthorized();
        }
    };

    let cutoff = Utc::now() - Duration::days(SESSION_IDLE_DAYS);
    match state
        .store
        .touch_session_with_cutoff(&claims.jti, cutoff.naive_utc())
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                jti = %claims.jti,
                family_id = %claims.family_id,
                idle_days = SESSION_IDLE_DAYS,
                "auth: session missing or expired"
            );
            return unauthorized();
        }
        Err(e) => {
            error!(jti = %claims.jti, error=%e, "auth: touch_session_with_cutoff failed");
            return Err(AppError::internal(e));
        }
    }
    req.extensions_mut().insert(AuthCtx { claims });
    Ok(next.run(req).await)
}

/// Signs a token for the family, optionally bound to a member, and records
/// its session.
pub async fn issue_jwt(
    state: &AppState,
    family_id: &str,
    member_id: Option<&str>,
) -> Result<String, AppError> {
    let jti = uuid::Uuid::new_v4().to_string();
    let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp();
    let claims = JwtClaims {
        jti: jti.clone(),
        exp,
        family_id: family_id.to_string(),
        member_id: member_id.map(str::to_string),
    };
    state
        .store
        .create_session(&jti, family_id, member_id)
        .await
        .map_err(|e| {
            error!(family_id, error=%e, "issue_jwt: create_session failed");
            AppError::internal(e)
        })?;
    jwt::encode(&claims, state.config.jwt_secret.as_bytes()).map_err(|e| {
        error!(family_id, error=%e, "issue_jwt: jwt encode failed");
        AppError::internal(e)
    })
}

/// bcrypt hash on the blocking pool.
pub(crate) async fn hash_secret(state: &AppState, plain: &str) -> Result<String, AppError> {
    let plain = plain.to_string();
    let cost = state.config.bcrypt_cost();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .map_err(AppError::internal)?
        .map_err(AppError::internal)
}

pub(crate) async fn verify_secret(plain: &str, hash: &str) -> Result<bool, AppError> {
    let plain = plain.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .map_err(AppError::internal)?
        .map_err(|e| {
            error!(error=%e, "auth: bcrypt verify failed");
            AppError::internal(e)
        })
}

pub(crate) fn check_pin(pin: &str) -> Result<(), AppError> {
    if is_valid_pin(pin) {
        Ok(())
    } else {
        Err(AppError::bad_request("PIN must be exactly 4 digits"))
    }
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<api::LoginReq>,
) -> Result<Json<api::LoginResp>, AppError> {
    let name = body.family_name.trim();
    if name.is_empty() || body.password.is_empty() {
        return Err(AppError::bad_request("Family name and password required"));
    }
    let Some(family) = state.store.find_family_by_name(name).await? else {
        warn!(family_name=%name, "login: unknown family");
        return Err(AppError::unauthorized());
    };
    if !verify_secret(&body.password, &family.password_hash).await? {
        warn!(family_id=%family.id, "login: invalid password");
        return Err(AppError::unauthorized());
    }
    let members = state.store.list_members(&family.id).await?;
    let token = issue_jwt(&state, &family.id, None).await?;
    info!(family_id=%family.id, "login: family signed in");
    Ok(Json(api::LoginResp {
        token,
        family: api::FamilyDto {
            id: family.id,
            name: family.name,
        },
        members: members.into_iter().map(member_dto).collect(),
    }))
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<api::RegisterReq>,
) -> Result<Json<api::RegisterResp>, AppError> {
    let name = body.family_name.trim();
    if name.is_empty() || body.password.is_empty() || body.members.len() < MIN_MEMBERS {
        return Err(AppError::bad_request(format!(
            "Family name, password, and at least {MIN_MEMBERS} members required"
        )));
    }
    if body.members.len() > MAX_MEMBERS {
        return Err(AppError::bad_request(format!(
            "Maximum {MAX_MEMBERS} family members allowed"
        )));
    }
    for m in &body.members {
        if m.name.trim().is_empty() {
            return Err(AppError::bad_request("Member name is required"));
        }
        check_pin(&m.pin)?;
    }

    let password_hash = hash_secret(&state, &body.password).await?;
    let mut seeds = Vec::with_capacity(body.members.len());
    for m in &body.members {
        seeds.push(MemberSeed {
            name: m.name.trim().to_string(),
            pin_hash: hash_secret(&state, &m.pin).await?,
            avatar_color: m
                .avatar_color
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AVATAR_COLOR.to_string()),
        });
    }

    let registered = state
        .store
        .register_family(name, &password_hash, seeds)
        .await?;
    let family = registered.family;
    let roster: Vec<_> = registered.members.iter().map(|(m, _)| m.clone()).collect();
    let mut members = Vec::with_capacity(registered.members.len());
    for (m, goals) in registered.members {
        let goals = goals
            .into_iter()
            .map(|g| goal_dto(g, &roster))
            .collect::<Result<Vec<_>, _>>()?;
        members.push(api::RegisteredMemberDto {
            id: m.id,
            name: m.name,
            avatar_color: m.avatar_color,
            goals,
        });
    }
    let token = issue_jwt(&state, &family.id, None).await?;
    info!(family_id=%family.id, members = members.len(), "register: family created");
    Ok(Json(api::RegisterResp {
        token,
        family: api::FamilyDto {
            id: family.id,
            name: family.name,
        },
        members,
    }))
}

pub async fn verify_pin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    ApiJson(body): ApiJson<api::VerifyPinReq>,
) -> Result<Json<api::VerifyPinResp>, AppError> {
    if body.member_id.trim().is_empty() || body.pin.is_empty() {
        return Err(AppError::bad_request("Member ID and PIN required"));
    }
    let member = state.member_in_family(&auth, body.member_id.trim()).await?;
    if !verify_secret(&body.pin, &member.pin_hash).await? {
        warn!(member_id=%member.id, "verify_pin: invalid PIN");
        return Err(AppError::unauthorized());
    }
    let token = issue_jwt(&state, auth.family_id(), Some(&member.id)).await?;
    Ok(Json(api::VerifyPinResp {
        token,
        member: api::MemberSummaryDto {
            id: member.id,
            name: member.name,
            avatar_color: member.avatar_color,
            profile_photo_url: member.profile_photo_url,
        },
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<StatusCode, AppError> {
    state.store.delete_session(&auth.claims.jti).await?;
    Ok(StatusCode::NO_CONTENT)
}
