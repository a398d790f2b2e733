//! Minimal REST client helpers for consumers (clients).

use super::endpoints as ep;
use super::*;
use once_cell::sync::OnceCell;
use std::time::Duration;

pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
}

static HTTP_CLIENT: OnceCell<reqwest::Client> = OnceCell::new();

fn mk_client() -> Result<reqwest::Client, RestError> {
    HTTP_CLIENT
        .get_or_try_init(|| {
            reqwest::Client::builder()
                .tcp_keepalive(Some(Duration::from_secs(180)))
                .pool_max_idle_per_host(4)
                .pool_idle_timeout(Duration::from_secs(180))
                // Bound request duration
                .timeout(Duration::from_secs(60))
                .build()
        })
        .cloned()
        .map_err(|e| RestError::Http(e.to_string()))
}

async fn handle_json<T: for<'de> serde::Deserialize<'de>>(
    res: reqwest::Response,
) -> Result<T, RestError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    res.json::<T>()
        .await
        .map_err(|e| RestError::Serde(e.to_string()))
}

async fn post_json<B: serde::Serialize, T: for<'de> serde::Deserialize<'de>>(
    url: String,
    bearer: Option<&str>,
    body: &B,
) -> Result<T, RestError> {
    let client = mk_client()?;
    let mut req = client.post(url).json(body);
    if let Some(token) = bearer {
        req = req.bearer_auth(token);
    }
    let res = req
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

async fn get_json<T: for<'de> serde::Deserialize<'de>>(
    url: String,
    bearer: &str,
) -> Result<T, RestError> {
    let client = mk_client()?;
    let res = client
        .get(url)
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn server_version(base: &str) -> Result<VersionInfoDto, RestError> {
    let client = mk_client()?;
    let res = client
        .get(ep::version(base))
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn login(base: &str, req: &LoginReq) -> Result<LoginResp, RestError> {
    post_json(ep::auth_login(base), None, req).await
}

pub async fn register(base: &str, req: &RegisterReq) -> Result<RegisterResp, RestError> {
    post_json(ep::auth_register(base), None, req).await
}

pub async fn verify_pin(
    base: &str,
    bearer: &str,
    req: &VerifyPinReq,
) -> Result<VerifyPinResp, RestError> {
    post_json(ep::auth_verify_pin(base), Some(bearer), req).await
}

/// Ends the session behind `bearer`. The server answers 204 with no body.
pub async fn logout(base: &str, bearer: &str) -> Result<(), RestError> {
    let client = mk_client()?;
    let res = client
        .post(ep::auth_logout(base))
        .bearer_auth(bearer)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(())
}

pub async fn list_members(base: &str, bearer: &str) -> Result<Vec<MemberDto>, RestError> {
    get_json(ep::members(base), bearer).await
}

pub async fn dashboard(base: &str, bearer: &str) -> Result<Vec<DashboardMemberDto>, RestError> {
    get_json(ep::dashboard(base), bearer).await
}

pub async fn log_water(
    base: &str,
    bearer: &str,
    req: &LogWaterReq,
) -> Result<LogEntryResp, RestError> {
    post_json(ep::water(base), Some(bearer), req).await
}

pub async fn log_steps(
    base: &str,
    bearer: &str,
    req: &LogStepsReq,
) -> Result<LogEntryResp, RestError> {
    post_json(ep::steps(base), Some(bearer), req).await
}

pub async fn log_mindfulness(
    base: &str,
    bearer: &str,
    req: &LogMindfulnessReq,
) -> Result<LogEntryResp, RestError> {
    post_json(ep::mindfulness(base), Some(bearer), req).await
}

pub async fn water_entries(
    base: &str,
    bearer: &str,
    member_id: &str,
    date: Option<NaiveDate>,
) -> Result<EntriesResp<WaterEntryDto>, RestError> {
    get_json(ep::water_for(base, member_id, date), bearer).await
}

pub async fn steps_entries(
    base: &str,
    bearer: &str,
    member_id: &str,
    date: Option<NaiveDate>,
) -> Result<EntriesResp<StepsEntryDto>, RestError> {
    get_json(ep::steps_for(base, member_id, date), bearer).await
}

pub async fn complete_goal(
    base: &str,
    bearer: &str,
    goal_id: &str,
    req: &CompleteGoalReq,
) -> Result<CompleteGoalResp, RestError> {
    post_json(ep::goal_complete(base, goal_id), Some(bearer), req).await
}
