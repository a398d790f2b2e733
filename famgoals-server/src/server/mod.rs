pub mod auth;
mod blob;
mod config;
mod extract;
mod family;
mod goals;
mod overview;
mod photos;
mod settings;
mod tracking;

use crate::server::auth::AuthCtx;
use crate::storage::models::{Goal, Member};
use crate::storage::{StorageError, Store};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware;
use axum::response::Response as AxumResponse;
use axum::{
    Json, Router,
    http::{Method, StatusCode, header},
    routing::{get, post, put},
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
pub use blob::BlobStore;
pub use config::{AppConfig, ConfigError};
use famgoals_shared::api::{self, API_V1_PREFIX};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Span, info_span};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Store,
    pub blobs: BlobStore,
    tz: Tz,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store) -> Self {
        let tz = config.tz().unwrap_or_else(|e| {
            tracing::warn!(error=%e, "config: falling back to UTC");
            Tz::UTC
        });
        let blobs = BlobStore::new(config.uploads_dir());
        Self {
            config,
            store,
            blobs,
            tz,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Calendar day in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// Member of the caller's family, or 404.
    async fn member_in_family(&self, auth: &AuthCtx, member_id: &str) -> Result<Member, AppError> {
        self.store
            .get_member(auth.family_id(), member_id)
            .await?
            .ok_or_else(|| AppError::not_found("Member not found"))
    }

    /// Goal owned by a member of the caller's family, or 404.
    async fn goal_in_family(&self, auth: &AuthCtx, goal_id: &str) -> Result<Goal, AppError> {
        self.store
            .get_goal_in_family(auth.family_id(), goal_id)
            .await?
            .ok_or_else(|| AppError::not_found("Goal not found"))
    }
}

#[derive(Clone, Debug)]
struct ReqId(pub String);

fn v1(path: &str) -> String {
    format!("{API_V1_PREFIX}{path}")
}

pub fn router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes() + 64 * 1024;
    let private = Router::new()
        .route(&v1("/auth/verify-pin"), post(auth::verify_pin))
        .route(&v1("/auth/logout"), post(auth::logout))
        .route(
            &v1("/family"),
            get(family::get_family)
                .put(family::update_family)
                .delete(family::delete_family),
        )
        .route(
            &v1("/members"),
            get(family::list_members).post(family::add_member),
        )
        .route(
            &v1("/members/{id}"),
            get(family::get_member)
                .put(family::update_member)
                .delete(family::delete_member),
        )
        .route(
            &v1("/goals"),
            get(goals::list_goals).post(goals::create_goal),
        )
        .route(
            &v1("/goals/{id}"),
            put(goals::update_goal).delete(goals::delete_goal),
        )
        .route(&v1("/goals/{id}/complete"), post(goals::complete_goal))
        .route(
            &v1("/water"),
            get(tracking::list_water).post(tracking::log_water),
        )
        .route(
            &v1("/exercise"),
            get(tracking::list_exercise).post(tracking::log_exercise),
        )
        .route(
            &v1("/steps"),
            get(tracking::list_steps).post(tracking::log_steps),
        )
        .route(
            &v1("/mindfulness"),
            get(tracking::list_mindfulness).post(tracking::log_mindfulness),
        )
        .route(
            &v1("/exercises/custom"),
            get(tracking::list_custom_exercises).post(tracking::create_custom_exercise),
        )
        .route(&v1("/dashboard"), get(overview::dashboard))
        .route(&v1("/stats/week/{member_id}"), get(overview::week_stats))
        .route(&v1("/stats/month/{member_id}"), get(overview::month_stats))
        .route(
            &v1("/settings"),
            get(settings::get_settings).put(settings::update_settings),
        )
        .route(
            &v1("/notifications"),
            get(settings::list_notifications).post(settings::create_notification),
        )
        .route(
            &v1("/notifications/{id}/read"),
            put(settings::mark_notification_read),
        )
        .route(&v1("/photos"), get(photos::list_photos))
        .route(
            &v1("/upload"),
            post(photos::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(state.clone())
        // Inner layer: runs after require_bearer has attached AuthCtx
        .layer(middleware::from_fn(set_auth_span_fields))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    // Trace with request context (method, path, request_id)
    let trace = TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
        let request_id = req
            .extensions()
            .get::<ReqId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        info_span!(
            "request",
            method = %req.method(),
            path = %req.uri().path(),
            request_id = %request_id,
            family_id = tracing::field::Empty,
            member_id = tracing::field::Empty
        )
    });

    let app = Router::new()
        .route("/healthz", get(health))
        .route(&v1("/version"), get(version))
        .route(&v1("/auth/login"), post(auth::login))
        .route(&v1("/auth/register"), post(auth::register))
        .route(&v1("/init"), get(init_db).post(init_db))
        .merge(private)
        .nest_service("/uploads", ServeDir::new(state.blobs.root()))
        .with_state(state.clone())
        .layer(trace)
        .layer(middleware::from_fn(add_security_headers))
        .layer(middleware::from_fn(add_request_id));

    // Optionally add CORS for dev if configured
    if let Some(origin) = &state.config.dev_cors_origin {
        let hv = header::HeaderValue::from_str(origin)
            .unwrap_or(header::HeaderValue::from_static("http://localhost:5173"));
        let cors = CorsLayer::new()
            .allow_origin(hv)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
        app.layer(cors)
    } else {
        app
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn version() -> Json<api::VersionInfoDto> {
    Json(api::VersionInfoDto {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn init_db(State(state): State<AppState>) -> Result<Json<api::InitResp>, AppError> {
    let report = state.store.initialize().await.map_err(|e| {
        tracing::error!(error=%e, "init: schema initialization failed");
        AppError::internal(e)
    })?;
    tracing::info!(?report, "init: schema ready");
    Ok(Json(api::InitResp {
        success: true,
        message: "Database initialized".into(),
    }))
}

async fn add_request_id(
    mut req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let hdr = HeaderName::from_static("x-request-id");
    // Use provided x-request-id if present, else generate
    let rid = req
        .headers()
        .get(&hdr)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(ReqId(rid.clone()));
    let mut resp = next.run(req).await;
    if let Ok(hv) = HeaderValue::from_str(&rid) {
        resp.headers_mut().insert(hdr, hv);
    }
    Ok(resp)
}

async fn add_security_headers(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    let path = req.uri().path().to_string();
    let mut resp = next.run(req).await;

    let headers = resp.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );

    // Disable caching for API and health endpoints
    if path == "/healthz" || path.starts_with("/api/") {
        headers.insert(
            HeaderName::from_static("cache-control"),
            HeaderValue::from_static("no-store, no-cache, must-revalidate, private"),
        );
        headers.insert(
            HeaderName::from_static("pragma"),
            HeaderValue::from_static("no-cache"),
        );
    }

    Ok(resp)
}

async fn set_auth_span_fields(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> Result<AxumResponse, AppError> {
    if let Some(auth) = req.extensions().get::<AuthCtx>() {
        let span = Span::current();
        span.record("family_id", tracing::field::display(auth.family_id()));
        if let Some(mid) = auth.member_id() {
            span.record("member_id", tracing::field::display(mid));
        }
    }
    Ok(next.run(req).await)
}

pub(crate) fn rfc3339(ts: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc).to_rfc3339()
}

/// Trimmed value of a required text field, or 400 naming the field.
pub(crate) fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, AppError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AppError::bad_request(format!("{field} is required")));
    }
    Ok(v)
}

pub(crate) fn member_dto(m: Member) -> api::MemberDto {
    api::MemberDto {
        created_at: rfc3339(m.created_at),
        id: m.id,
        family_id: m.family_id,
        name: m.name,
        avatar_color: m.avatar_color,
        profile_photo_url: m.profile_photo_url,
    }
}

/// Converts a goal row, resolving the assigner against the family roster.
pub(crate) fn goal_dto(g: Goal, roster: &[Member]) -> Result<api::GoalDto, AppError> {
    let goal_type = g.goal_type.parse().map_err(AppError::internal)?;
    let frequency = g.frequency.parse().map_err(AppError::internal)?;
    let assigner = g
        .assigned_by
        .as_deref()
        .and_then(|id| roster.iter().find(|m| m.id == id));
    Ok(api::GoalDto {
        assigned_by_name: assigner.map(|m| m.name.clone()),
        assigned_by_color: assigner.map(|m| m.avatar_color.clone()),
        created_at: rfc3339(g.created_at),
        id: g.id,
        member_id: g.member_id,
        goal_type,
        title: g.title,
        description: g.description,
        target_value: g.target_value,
        target_unit: g.target_unit,
        assigned_by: g.assigned_by,
        is_custom: g.is_custom,
        frequency,
        due_time: g.due_time,
        reminder_enabled: g.reminder_enabled,
        reminder_time: g.reminder_time,
    })
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        Self::BadRequest(msg.into())
    }
    fn unauthorized() -> Self {
        Self::Unauthorized
    }
    fn forbidden() -> Self {
        Self::Forbidden
    }
    fn not_found<T: Into<String>>(msg: T) -> Self {
        Self::NotFound(msg.into())
    }
    fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::InvalidInput(m) | StorageError::Conflict(m) => AppError::BadRequest(m),
            StorageError::NotFound(m) => AppError::NotFound(m),
            other => AppError::internal(other),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, msg, kind, detail) = match self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m, "bad_request", None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized".into(),
                "unauthorized",
                None,
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".into(), "forbidden", None),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m, "not_found", None),
            // Do not leak internal error details to clients, but log them
            AppError::Internal(m) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".into(),
                "internal",
                Some(m),
            ),
        };
        if let Some(detail) = detail {
            tracing::error!(status = %status, kind = kind, message = %msg, detail = %detail, "request failed");
        } else {
            tracing::warn!(status = %status, kind = kind, message = %msg, "request failed");
        }
        let body = axum::Json(ErrorBody { error: msg });
        (status, body).into_response()
    }
}
