use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use famgoals_shared::api::{self, rest::RestError};
use famgoals_shared::domain::{EntrySource, WaterUnit};
use famgoals_shared::jwt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub mod cli;
pub mod config;
pub mod health;
pub mod login;
pub mod token;

pub use cli::{Cli, Command};
pub use config::{AgentConfig, load_config, resolve_config_path};
pub use health::{FileHealthSource, HealthSource};
pub use token::TokenStore;

/// Consecutive failed syncs after which the loop logs at error level.
const FAILURE_ALERT_THRESHOLD: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("auth error: {0}")]
    Auth(String),
    #[error("health data error: {0}")]
    Health(String),
    #[error("keyring error: {0}")]
    Keyring(String),
    #[error("steps: {steps}; water: {water}")]
    Sync {
        steps: Box<AgentError>,
        water: Box<AgentError>,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// True when the server rejected the session.
    pub fn is_auth(&self) -> bool {
        match self {
            AgentError::Auth(_) => true,
            AgentError::Sync { steps, water } => steps.is_auth() || water.is_auth(),
            _ => false,
        }
    }
}

fn rest_error(context: &str, e: RestError) -> AgentError {
    match e {
        RestError::Status { status: 401, .. } => AgentError::Auth(format!(
            "{context}: session expired or revoked; run `famgoals-client login` again"
        )),
        other => AgentError::Http(format!("{context}: {other}")),
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// What one sync pushed. `None` means the reading was skipped because it
/// was zero or unchanged since the last push.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub date: NaiveDate,
    pub steps_total: Option<f64>,
    pub water_total: Option<f64>,
}

/// Pushes cumulative daily readings from a [`HealthSource`] to the server as
/// `healthkit` entries, which the server replaces in place.
pub struct Syncer {
    server_url: String,
    token: String,
    member_id: String,
    source: Arc<dyn HealthSource>,
    last_steps: Option<(NaiveDate, i64)>,
    last_water: Option<(NaiveDate, f64)>,
}

impl Syncer {
    pub fn new(
        server_url: &str,
        token: &str,
        member_id: &str,
        source: Arc<dyn HealthSource>,
    ) -> Self {
        Self {
            server_url: config::normalize_server_url(server_url),
            token: token.to_string(),
            member_id: member_id.to_string(),
            source,
            last_steps: None,
            last_water: None,
        }
    }

    /// Pushes both readings for `date`. A failing push does not stop the
    /// other one; if both fail the errors are reported together.
    pub async fn sync(&mut self, date: NaiveDate) -> Result<SyncReport, AgentError> {
        let steps = self.push_steps(date).await;
        let water = self.push_water(date).await;
        match (steps, water) {
            (Ok(steps_total), Ok(water_total)) => Ok(SyncReport {
                date,
                steps_total,
                water_total,
            }),
            (Err(e), Ok(_)) | (Ok(_), Err(e)) => Err(e),
            (Err(steps), Err(water)) => Err(AgentError::Sync {
                steps: Box::new(steps),
                water: Box::new(water),
            }),
        }
    }

    /// Records a drink in the health store, then pushes the store's new
    /// daily total. The drink reaches the server only through that
    /// `healthkit` total, so later syncs never count it again.
    pub async fn log_water(
        &mut self,
        amount: f64,
        unit: WaterUnit,
        date: NaiveDate,
    ) -> Result<f64, AgentError> {
        let ml = unit.to_ml(amount);
        if ml <= 0.0 {
            return Err(AgentError::Config("amount must be positive".into()));
        }
        self.source.save_water(ml, date).await?;
        self.push_water(date).await?.ok_or_else(|| {
            AgentError::Health(format!("health store did not record {ml} ml for {date}"))
        })
    }

    async fn push_steps(&mut self, date: NaiveDate) -> Result<Option<f64>, AgentError> {
        let steps = self.source.fetch_steps(date).await?;
        if steps <= 0 || self.last_steps == Some((date, steps)) {
            return Ok(None);
        }
        let reading = i32::try_from(steps).map_err(|_| {
            AgentError::Health(format!("steps reading {steps} for {date} is out of range"))
        })?;
        let resp = api::rest::log_steps(
            &self.server_url,
            &self.token,
            &api::LogStepsReq {
                member_id: self.member_id.clone(),
                steps: reading,
                date: Some(date),
                source: Some(EntrySource::Healthkit),
            },
        )
        .await
        .map_err(|e| rest_error("steps sync", e))?;
        self.last_steps = Some((date, steps));
        Ok(Some(resp.total))
    }

    async fn push_water(&mut self, date: NaiveDate) -> Result<Option<f64>, AgentError> {
        let water = self.source.fetch_water(date).await?;
        if water <= 0.0 || self.last_water == Some((date, water)) {
            return Ok(None);
        }
        let resp = api::rest::log_water(
            &self.server_url,
            &self.token,
            &api::LogWaterReq {
                member_id: self.member_id.clone(),
                amount_ml: water,
                date: Some(date),
                source: Some(EntrySource::Healthkit),
            },
        )
        .await
        .map_err(|e| rest_error("water sync", e))?;
        self.last_water = Some((date, water));
        Ok(Some(resp.total))
    }
}

struct Session {
    cfg: AgentConfig,
    token: String,
    member_id: String,
}

fn load_session(cfg_path: &Path) -> Result<Session, AgentError> {
    let cfg = load_config(cfg_path)?;
    let token = TokenStore::open(cfg_path, &cfg)?.read()?;
    let member_id = cfg.member_id.clone().ok_or_else(|| {
        AgentError::Config("no member selected; run `famgoals-client select-member`".into())
    })?;
    let claims =
        jwt::decode_unverified(&token).map_err(|e| AgentError::Auth(format!("stored token: {e}")))?;
    if claims.member_id.as_deref() != Some(member_id.as_str()) {
        return Err(AgentError::Auth(
            "stored token is not bound to the selected member; run `famgoals-client select-member`"
                .into(),
        ));
    }
    Ok(Session {
        cfg,
        token,
        member_id,
    })
}

async fn open_source(cfg: &AgentConfig) -> Result<Arc<dyn HealthSource>, AgentError> {
    let source = FileHealthSource::new(cfg.health_export.clone());
    if !source.is_available().await && !source.request_authorization().await? {
        return Err(AgentError::Health(format!(
            "no access to health export {}",
            source.path().display()
        )));
    }
    Ok(Arc::new(source))
}

pub async fn run(cli: Cli) -> Result<(), AgentError> {
    init_tracing();
    let cfg_path = resolve_config_path(cli.config)?;

    match cli.command {
        Some(Command::Login {
            server,
            family,
            health_export,
            token_file,
        }) => return login::login(server, family, health_export, token_file, &cfg_path).await,
        Some(Command::SelectMember { member_id }) => {
            return login::select_member(member_id, &cfg_path).await;
        }
        Some(Command::Logout) => {
            let cfg = load_config(&cfg_path)?;
            let store = TokenStore::open(&cfg_path, &cfg)?;
            if let Ok(token) = store.read()
                && let Err(e) = api::rest::logout(&cfg.server_url, &token).await
            {
                warn!(error=%e, "server logout failed; forgetting token anyway");
            }
            store.forget()?;
            println!("Logged out");
            return Ok(());
        }
        Some(Command::LogWater { amount, unit }) => {
            let session = load_session(&cfg_path)?;
            let source = open_source(&session.cfg).await?;
            let mut syncer = Syncer::new(
                &session.cfg.server_url,
                &session.token,
                &session.member_id,
                source,
            );
            let total = syncer
                .log_water(amount, unit, Local::now().date_naive())
                .await?;
            println!(
                "Logged {} ml, today's total is {total} ml",
                unit.to_ml(amount)
            );
            return Ok(());
        }
        Some(Command::Sync) => {
            let session = load_session(&cfg_path)?;
            let source = open_source(&session.cfg).await?;
            let mut syncer = Syncer::new(
                &session.cfg.server_url,
                &session.token,
                &session.member_id,
                source,
            );
            let report = syncer.sync(Local::now().date_naive()).await?;
            info!(date=%report.date, steps=?report.steps_total, water=?report.water_total, "sync done");
            return Ok(());
        }
        None => {}
    }

    let session = load_session(&cfg_path)?;
    info!(path=%cfg_path.display(), member_id=%session.member_id, "loaded config");
    let source = open_source(&session.cfg).await?;
    let interval = Duration::from_secs(session.cfg.interval_secs.max(10));
    let syncer = Syncer::new(
        &session.cfg.server_url,
        &session.token,
        &session.member_id,
        source,
    );

    let cancel = CancellationToken::new();
    let mut handle = tokio::spawn(main_loop(cancel.child_token(), syncer, interval));

    tokio::select! {
        _ = shutdown_signal() => {
            info!("shutdown signal received; stopping sync loop");
            cancel.cancel();
        }
        res = &mut handle => {
            return match res {
                Ok(r) => r,
                Err(e) => Err(AgentError::Io(std::io::Error::other(e.to_string()))),
            };
        }
    }
    if !handle.is_finished() {
        let _ = tokio::time::timeout(Duration::from_secs(3), handle).await;
    }
    Ok(())
}

/// Syncs today's readings every `interval` until cancelled. Stops early only
/// when the server rejects the session.
pub async fn main_loop(
    cancel: CancellationToken,
    mut syncer: Syncer,
    interval: Duration,
) -> Result<(), AgentError> {
    let mut failures: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            break;
        }
        let start = std::time::Instant::now();
        match syncer.sync(Local::now().date_naive()).await {
            Ok(report) => {
                failures = 0;
                debug!(date=%report.date, steps=?report.steps_total, water=?report.water_total, "sync ok");
            }
            Err(e) if e.is_auth() => {
                error!(error=%e, "sync stopped");
                return Err(e);
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                if failures >= FAILURE_ALERT_THRESHOLD {
                    error!(error=%e, failures, "sync keeps failing");
                } else {
                    warn!(error=%e, failures, "sync failed");
                }
            }
        }

        let elapsed = start.elapsed();
        if elapsed < interval {
            tokio::select! {
                _ = cancel.cancelled() => { break; }
                _ = sleep(interval - elapsed) => {}
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        if let (Ok(mut sigint), Ok(mut sigterm)) = (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            tokio::select! {
                _ = sigint.recv() => {}
                _ = sigterm.recv() => {}
            }
            return;
        }
    }
    let _ = tokio::signal::ctrl_c().await;
}
