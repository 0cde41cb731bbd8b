//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! All services share one `Arc<dyn PassportRepository>`. The in-memory
//! store is authoritative for reads; when a database pool is configured,
//! every mutation is written through to Postgres and the store is hydrated
//! from it on startup.
//!
//! A mutation is only visible in memory once Postgres has accepted it. With
//! a pool configured, passport mutations run one at a time under
//! `write_lock`; if the database write fails, the in-memory change is
//! reverted before the error is returned, so a client retrying after a 500
//! starts from the state that was actually stored.

use std::sync::Arc;
use std::time::Duration;

use dpp_core::{ImportJob, Passport, PassportId};
use dpp_registry::{
    demo_passports, AnchorService, DashboardAggregator, ImportJobTracker, InMemoryPassportStore,
    PassportRegistry, PassportRepository, UntrackedCompliancePolicy, VerificationMode,
    VerificationService, DEFAULT_JOB_TTL_SECS,
};
use sqlx::PgPool;
use thiserror::Error;

use crate::auth::AuthConfig;
use crate::error::AppError;

// -- Configuration ------------------------------------------------------------

/// Invalid environment configuration. Fails startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value for {var}: {reason}")]
pub struct ConfigError {
    /// Offending variable.
    pub var: &'static str,
    /// What was wrong with it.
    pub reason: String,
}

impl ConfigError {
    fn new(var: &'static str, reason: impl Into<String>) -> Self {
        Self {
            var,
            reason: reason.into(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Application configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Bearer allow-list; empty disables authentication.
    pub auth: AuthConfig,
    /// Load the demo passports at startup.
    pub seed_demo_data: bool,
    /// Verification outcome policy.
    pub verification_mode: VerificationMode,
    /// Import job retention.
    pub import_job_ttl_secs: u64,
    /// How passports with no compliance data count in metrics.
    pub untracked_policy: UntrackedCompliancePolicy,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Requests per minute per client.
    pub rate_limit_per_minute: u64,
    /// Log output format.
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_tokens", &self.auth.len())
            .field("seed_demo_data", &self.seed_demo_data)
            .field("verification_mode", &self.verification_mode)
            .field("import_job_ttl_secs", &self.import_job_ttl_secs)
            .field("untracked_policy", &self.untracked_policy)
            .field("request_timeout", &self.request_timeout)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth: AuthConfig::default(),
            seed_demo_data: false,
            verification_mode: VerificationMode::Deterministic,
            import_job_ttl_secs: DEFAULT_JOB_TTL_SECS as u64,
            untracked_policy: UntrackedCompliancePolicy::CountAsCompliant,
            request_timeout: Duration::from_secs(30),
            rate_limit_per_minute: 1000,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source. Unset or blank
    /// variables take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|e| ConfigError::new("PORT", e.to_string()))?,
            None => defaults.port,
        };

        let auth = match get("DPP_AUTH_TOKENS") {
            Some(v) => AuthConfig::parse(&v).map_err(|e| ConfigError::new("DPP_AUTH_TOKENS", e))?,
            None => defaults.auth,
        };

        let seed_demo_data = match get("DPP_SEED_DEMO_DATA") {
            Some(v) => parse_bool("DPP_SEED_DEMO_DATA", &v)?,
            None => defaults.seed_demo_data,
        };

        let verification_mode = match get("DPP_VERIFICATION_MODE") {
            Some(v) => v
                .parse::<VerificationMode>()
                .map_err(|e| ConfigError::new("DPP_VERIFICATION_MODE", e))?,
            None => defaults.verification_mode,
        };
        let verification_mode = match verification_mode {
            VerificationMode::Simulated { .. } => {
                let seed = match get("DPP_VERIFICATION_SEED") {
                    Some(v) => v
                        .parse::<u64>()
                        .map_err(|e| ConfigError::new("DPP_VERIFICATION_SEED", e.to_string()))?,
                    None => 0,
                };
                VerificationMode::Simulated { seed }
            }
            other => other,
        };

        let import_job_ttl_secs = match get("DPP_IMPORT_JOB_TTL_SECS") {
            Some(v) => parse_positive("DPP_IMPORT_JOB_TTL_SECS", &v)?,
            None => defaults.import_job_ttl_secs,
        };

        let untracked_policy = match get("DPP_UNTRACKED_POLICY") {
            Some(v) => v
                .parse::<UntrackedCompliancePolicy>()
                .map_err(|e| ConfigError::new("DPP_UNTRACKED_POLICY", e))?,
            None => defaults.untracked_policy,
        };

        let request_timeout = match get("DPP_REQUEST_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(parse_positive("DPP_REQUEST_TIMEOUT_SECS", &v)?),
            None => defaults.request_timeout,
        };

        let rate_limit_per_minute = match get("DPP_RATE_LIMIT_PER_MINUTE") {
            Some(v) => parse_positive("DPP_RATE_LIMIT_PER_MINUTE", &v)?,
            None => defaults.rate_limit_per_minute,
        };

        let log_format = match get("DPP_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("text") | None => LogFormat::Text,
            Some(other) => {
                return Err(ConfigError::new(
                    "DPP_LOG_FORMAT",
                    format!("expected text or json, got {other}"),
                ))
            }
        };

        Ok(Self {
            port,
            auth,
            seed_demo_data,
            verification_mode,
            import_job_ttl_secs,
            untracked_policy,
            request_timeout,
            rate_limit_per_minute,
            log_format,
        })
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::new(var, format!("expected a boolean, got {other}"))),
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(0) => Err(ConfigError::new(var, "must be greater than zero")),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::new(var, e.to_string())),
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Storage shared by every service below.
    pub repo: Arc<dyn PassportRepository>,
    pub registry: PassportRegistry,
    pub anchors: AnchorService,
    pub verifier: VerificationService,
    pub imports: ImportJobTracker,

    /// PostgreSQL pool for write-through persistence. `None` means
    /// in-memory only.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,

    /// Serializes passport write-through while a pool is configured.
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    /// State with default configuration and no database.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// State with the given configuration and optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        let repo: Arc<dyn PassportRepository> = Arc::new(InMemoryPassportStore::new());
        let registry = PassportRegistry::new(repo.clone())
            .with_dashboard(DashboardAggregator::new(config.untracked_policy));
        let ttl_secs = i64::try_from(config.import_job_ttl_secs).unwrap_or(i64::MAX);

        Self {
            anchors: AnchorService::new(repo.clone()),
            verifier: VerificationService::new(repo.clone(), config.verification_mode),
            imports: ImportJobTracker::new(chrono::Duration::seconds(ttl_secs)),
            registry,
            repo,
            db_pool,
            config,
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Run a mutation of passport `id` and write the result through.
    ///
    /// The record is compared before and after `mutate`; an unchanged
    /// record (an idempotent replay, a verification of an archived
    /// passport) is not written. On a database error the in-memory record
    /// is reverted and [`AppError::Internal`] is returned.
    pub async fn commit_passport<T>(
        &self,
        id: &PassportId,
        mutate: impl FnOnce() -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let Some(pool) = &self.db_pool else {
            return mutate();
        };
        let _guard = self.write_lock.lock().await;

        let before = self.repo.get(id);
        let out = mutate()?;
        let after = self.repo.get(id);

        if let Some(after) = after.filter(|a| before.as_ref() != Some(a)) {
            if let Err(e) = crate::db::passports::upsert(pool, &after).await {
                self.repo.revert(&after, before);
                tracing::warn!(passport_id = %id, "passport change reverted after failed write");
                return Err(AppError::Internal(format!("persist passport {id}: {e}")));
            }
        }
        Ok(out)
    }

    /// Create a passport and write it through. On a database error the new
    /// record is removed from memory again.
    pub async fn commit_new_passport(
        &self,
        create: impl FnOnce() -> Result<Passport, AppError>,
    ) -> Result<Passport, AppError> {
        let Some(pool) = &self.db_pool else {
            return create();
        };
        let _guard = self.write_lock.lock().await;

        let passport = create()?;
        if let Err(e) = crate::db::passports::upsert(pool, &passport).await {
            self.repo.revert(&passport, None);
            tracing::warn!(passport_id = %passport.id, "passport creation reverted after failed write");
            return Err(AppError::Internal(format!(
                "persist passport {}: {e}",
                passport.id
            )));
        }
        Ok(passport)
    }

    /// Write a freshly submitted import job through. On a database error the
    /// job is discarded so it cannot be polled.
    pub async fn commit_import_job(&self, job: &ImportJob) -> Result<(), AppError> {
        if let Some(pool) = &self.db_pool {
            if let Err(e) = crate::db::import_jobs::upsert(pool, job).await {
                self.imports.discard(&job.job_id);
                return Err(AppError::Internal(format!(
                    "persist import job {}: {e}",
                    job.job_id
                )));
            }
        }
        Ok(())
    }

    /// Load persisted passports and import jobs into the in-memory stores.
    ///
    /// Called once on startup; a no-op without a database pool.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let passports = crate::db::passports::load_all(pool)
            .await
            .map_err(|e| format!("failed to load passports: {e}"))?;
        let passport_count = self.registry.load(passports);

        let jobs = crate::db::import_jobs::load_all(pool)
            .await
            .map_err(|e| format!("failed to load import jobs: {e}"))?;
        let job_count = jobs.len();
        for job in jobs {
            self.imports.restore(job);
        }
        let evicted = self.imports.evict_expired(chrono::Utc::now());

        tracing::info!(
            passports = passport_count,
            import_jobs = job_count.saturating_sub(evicted),
            "Hydrated in-memory stores from database"
        );
        Ok(())
    }

    /// Insert the demo passports that are not already present and write
    /// them through. Returns how many were added.
    pub async fn seed_demo_data(&self) -> Result<usize, AppError> {
        let mut added = 0;
        for passport in demo_passports(chrono::Utc::now()) {
            if self.repo.get(&passport.id).is_some() {
                continue;
            }
            self.commit_new_passport(|| {
                self.repo.insert(passport.clone())?;
                Ok(passport)
            })
            .await?;
            added += 1;
        }
        tracing::info!(added, "demo passports seeded");
        Ok(added)
    }

    /// Drop expired import jobs from memory and from the database.
    pub async fn evict_expired_import_jobs(&self) -> Result<usize, AppError> {
        let now = chrono::Utc::now();
        let evicted = self.imports.evict_expired(now);
        if let Some(pool) = &self.db_pool {
            crate::db::import_jobs::delete_updated_before(pool, now - self.imports.ttl())
                .await
                .map_err(|e| AppError::Internal(format!("evict import jobs: {e}")))?;
        }
        Ok(evicted)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
