pub mod entries;
pub mod family;
pub mod goals;
pub mod misc;
pub mod models;
pub mod schema;

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::DatabaseErrorKind;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{info, warn};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// The caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A uniqueness rule would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The row does not exist or is not visible to the caller's family.
    #[error("not found: {0}")]
    NotFound(String),

    /// Reading or writing an uploaded file failed.
    #[error("blob error: {0}")]
    Blob(#[from] std::io::Error),
}

impl StorageError {
    fn is_missing_table(&self) -> bool {
        matches!(
            self,
            StorageError::Database(diesel::result::Error::DatabaseError(_, info))
                if info.message().contains("no such table")
        )
    }

    pub(crate) fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(diesel::result::Error::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                _
            ))
        )
    }
}

/// Counts of rows touched by [`backfill_defaults`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    pub steps_goals_added: usize,
    pub mindfulness_goals_added: usize,
    pub water_targets_raised: usize,
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

/// Creates the directory holding the database file, if any.
pub fn ensure_db_dir(db_path: &str) -> std::io::Result<()> {
    match std::path::Path::new(db_path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

impl Store {
    pub async fn connect_sqlite(path: &str) -> Result<Self, StorageError> {
        let url = path.to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let pool = Pool::builder().max_size(8).build(manager)?;
        let store = Store { pool };

        // Run pending Diesel migrations on startup (auto-init empty DBs)
        store.initialize().await?;
        Ok(store)
    }

    /// Applies pending migrations and backfills default goals.
    pub async fn initialize(&self) -> Result<BackfillReport, StorageError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<BackfillReport, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            initialize_schema(&mut conn)
        })
        .await?
    }

    /// Runs `f` on a pooled connection off the async runtime. A query that
    /// fails on a missing table re-initializes the schema and is retried once.
    pub(crate) async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: Fn(&mut SqliteConnection) -> Result<T, StorageError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            match f(&mut conn) {
                Err(e) if e.is_missing_table() => {
                    warn!(error=%e, "storage: schema missing, re-initializing");
                    initialize_schema(&mut conn)?;
                    f(&mut conn)
                }
                other => other,
            }
        })
        .await?
    }

    // Session helpers for JWT inactivity windows
    pub async fn create_session(
        &self,
        jti: &str,
        family_id: &str,
        member_id: Option<&str>,
    ) -> Result<(), StorageError> {
        use models::NewSession;
        use schema::sessions;
        let j = jti.to_string();
        let f = family_id.to_string();
        let m = member_id.map(str::to_string);
        self.blocking(move |conn| {
            let now = now_utc();
            let new = NewSession {
                jti: &j,
                family_id: &f,
                member_id: m.as_deref(),
                issued_at: now,
                last_used_at: now,
            };
            diesel::insert_into(sessions::table)
                .values(&new)
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, jti_: &str) -> Result<Option<models::Session>, StorageError> {
        use schema::sessions::dsl::*;
        let j = jti_.to_string();
        self.blocking(move |conn| {
            Ok(sessions
                .filter(jti.eq(&j))
                .select(models::Session::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    pub async fn delete_session(&self, jti_: &str) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let j = jti_.to_string();
        self.blocking(move |conn| {
            let deleted = diesel::delete(sessions.filter(jti.eq(&j))).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Touch session atomically, but only if it hasn't expired.
    /// Returns `true` if the session was found and updated, `false` otherwise.
    pub async fn touch_session_with_cutoff(
        &self,
        jti_: &str,
        cutoff: NaiveDateTime,
    ) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let j = jti_.to_string();
        self.blocking(move |conn| {
            let updated =
                diesel::update(sessions.filter(jti.eq(&j)).filter(last_used_at.ge(cutoff)))
                    .set(last_used_at.eq(now_utc()))
                    .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }
}

pub(crate) fn now_utc() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn initialize_schema(conn: &mut SqliteConnection) -> Result<BackfillReport, StorageError> {
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    let report = backfill_defaults(conn)?;
    if report != BackfillReport::default() {
        info!(
            steps = report.steps_goals_added,
            mindfulness = report.mindfulness_goals_added,
            water = report.water_targets_raised,
            "storage: backfilled default goals"
        );
    }
    Ok(report)
}

/// Brings members created before the steps and mindfulness goals existed up
/// to the current defaults, and lifts water goals still on the old target.
fn backfill_defaults(conn: &mut SqliteConnection) -> Result<BackfillReport, StorageError> {
    use crate::storage::goals::{mindfulness_goal, steps_goal};
    use famgoals_shared::domain::{DEFAULT_WATER_TARGET_ML, GoalType, LEGACY_WATER_TARGET_ML};
    use schema::{family_members, goals};

    conn.immediate_transaction(|conn| -> Result<BackfillReport, StorageError> {
        let now = now_utc();
        let mut report = BackfillReport::default();

        for (kind, counter) in [
            (GoalType::Steps, &mut report.steps_goals_added),
            (GoalType::Mindfulness, &mut report.mindfulness_goals_added),
        ] {
            let having = goals::table
                .filter(goals::goal_type.eq(kind.as_str()))
                .select(goals::member_id);
            let missing: Vec<String> = family_members::table
                .filter(family_members::id.ne_all(having))
                .select(family_members::id)
                .load(conn)?;
            let rows: Vec<models::NewGoal> = missing
                .iter()
                .map(|member_id| match kind {
                    GoalType::Steps => steps_goal(member_id, now),
                    _ => mindfulness_goal(member_id, now),
                })
                .collect();
            if !rows.is_empty() {
                diesel::insert_into(goals::table).values(&rows).execute(conn)?;
            }
            *counter = rows.len();
        }

        report.water_targets_raised = diesel::update(
            goals::table
                .filter(goals::goal_type.eq(GoalType::Water.as_str()))
                .filter(goals::target_value.eq(LEGACY_WATER_TARGET_ML)),
        )
        .set(goals::target_value.eq(DEFAULT_WATER_TARGET_ML))
        .execute(conn)?;

        Ok(report)
    })
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // Enable WAL for better read/write concurrency and set a busy timeout
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    diesel::sql_query("PRAGMA foreign_keys=ON;").execute(conn)?;
    Ok(())
}
