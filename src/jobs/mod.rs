//! Scheduled Jobs
//!
//! Background jobs for periodic maintenance tasks.
//! Revoked refresh tokens only matter until they expire; after that the
//! signature check rejects them anyway, so their rows can be dropped.
//! Password reset codes are likewise dead once expired.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::interval;

use crate::store::{ResetCodeStore, StoreError, TokenBlacklist};

// =========================================================================
// Revoked Token Purge Job
// =========================================================================

/// Delete revoked-token entries whose token has expired
pub async fn purge_expired_revoked_tokens(
    blacklist: &dyn TokenBlacklist,
    now: DateTime<Utc>,
) -> Result<u64, JobError> {
    let rows_deleted = blacklist.purge_expired(now).await?;

    if rows_deleted > 0 {
        tracing::info!(rows_deleted, "Purged expired revoked tokens");
    }

    Ok(rows_deleted)
}

// =========================================================================
// Reset Code Purge Job
// =========================================================================

/// Delete password reset codes past their expiry
pub async fn purge_expired_reset_codes(
    codes: &dyn ResetCodeStore,
    now: DateTime<Utc>,
) -> Result<u64, JobError> {
    let rows_deleted = codes.purge_expired_codes(now).await?;

    if rows_deleted > 0 {
        tracing::info!(rows_deleted, "Purged expired password reset codes");
    }

    Ok(rows_deleted)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for the revoked token purge (default: 1 hour)
    pub token_purge_interval: Duration,
    /// Interval for the reset code purge (default: 10 minutes)
    pub reset_code_purge_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            token_purge_interval: Duration::from_secs(3600),
            reset_code_purge_interval: Duration::from_secs(600),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    blacklist: Arc<dyn TokenBlacklist>,
    reset_codes: Arc<dyn ResetCodeStore>,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(blacklist: Arc<dyn TokenBlacklist>, reset_codes: Arc<dyn ResetCodeStore>) -> Self {
        Self {
            blacklist,
            reset_codes,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!(
            token_purge_secs = self.config.token_purge_interval.as_secs(),
            reset_code_purge_secs = self.config.reset_code_purge_interval.as_secs(),
            "Job scheduler started"
        );

        let mut token_interval = interval(self.config.token_purge_interval);
        let mut reset_code_interval = interval(self.config.reset_code_purge_interval);

        loop {
            tokio::select! {
                _ = token_interval.tick() => {
                    if let Err(e) = purge_expired_revoked_tokens(self.blacklist.as_ref(), Utc::now()).await {
                        tracing::error!(error = %e, "Revoked token purge failed");
                    }
                }
                _ = reset_code_interval.tick() => {
                    if let Err(e) = purge_expired_reset_codes(self.reset_codes.as_ref(), Utc::now()).await {
                        tracing::error!(error = %e, "Reset code purge failed");
                    }
                }
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match purge_expired_revoked_tokens(self.blacklist.as_ref(), Utc::now()).await {
            Ok(count) => report.revoked_tokens_purged = count,
            Err(e) => report.errors.push(format!("Revoked token purge: {}", e)),
        }

        match purge_expired_reset_codes(self.reset_codes.as_ref(), Utc::now()).await {
            Ok(count) => report.reset_codes_purged = count,
            Err(e) => report.errors.push(format!("Reset code purge: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub revoked_tokens_purged: u64,
    pub reset_codes_purged: u64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PasswordResetCode;
    use crate::store::MemoryStore;
    use uuid::Uuid;

    #[test]
    fn test_job_scheduler_config_default() {
        let config = JobSchedulerConfig::default();
        assert_eq!(config.token_purge_interval, Duration::from_secs(3600));
        assert_eq!(config.reset_code_purge_interval, Duration::from_secs(600));
    }

    #[test]
    fn test_maintenance_report_default() {
        let report = MaintenanceReport::default();
        assert_eq!(report.revoked_tokens_purged, 0);
        assert_eq!(report.reset_codes_purged, 0);
        assert_eq!(report.errors.len(), 0);
    }

    #[tokio::test]
    async fn test_purge_keeps_live_tokens() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let expired = Uuid::new_v4();
        let live = Uuid::new_v4();

        store
            .revoke(expired, Uuid::new_v4(), now - chrono::Duration::minutes(1))
            .await
            .unwrap();
        store
            .revoke(live, Uuid::new_v4(), now + chrono::Duration::hours(1))
            .await
            .unwrap();

        let purged = purge_expired_revoked_tokens(&store, now).await.unwrap();

        assert_eq!(purged, 1);
        assert!(!store.is_revoked(expired).await.unwrap());
        assert!(store.is_revoked(live).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_keeps_live_reset_codes() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let stale = PasswordResetCode::new("a@b.com", "h".to_string(), now - chrono::Duration::minutes(15));
        let live = PasswordResetCode::new("b@c.com", "h".to_string(), now);
        store.save_code(stale).await.unwrap();
        store.save_code(live.clone()).await.unwrap();

        let purged = purge_expired_reset_codes(&store, now).await.unwrap();

        assert_eq!(purged, 1);
        assert!(store.latest_code("a@b.com").await.unwrap().is_none());
        assert_eq!(store.latest_code("b@c.com").await.unwrap().unwrap().id, live.id);
    }

    #[tokio::test]
    async fn test_run_all_once() {
        let store = Arc::new(MemoryStore::new());
        let past = Utc::now() - chrono::Duration::minutes(15);
        store
            .revoke(Uuid::new_v4(), Uuid::new_v4(), past)
            .await
            .unwrap();
        store
            .save_code(PasswordResetCode::new("a@b.com", "h".to_string(), past))
            .await
            .unwrap();

        let report = JobScheduler::new(store.clone(), store).run_all_once().await;

        assert_eq!(report.revoked_tokens_purged, 1);
        assert_eq!(report.reset_codes_purged, 1);
        assert!(report.errors.is_empty());
    }
}
