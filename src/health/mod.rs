/*!
 * # Health Check Module
 *
 * Probes for the asset tracker:
 *
 * - Liveness (`/health/live`) - process is up
 * - Readiness (`/health/ready`) - database answers a ping
 * - Version (`/health/version`) - build information
 *
 * The detailed report (database plus expired-warranty job) is served under
 * `/api/v1/health` by the main router.
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::jobs::expired_warranty::{WarrantyJobState, WarrantyJobStatus};

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
    Degraded,
}

/// Health check detail
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct HealthDetail {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Overall health information
#[derive(Serialize, Debug, Clone, ToSchema)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub details: BTreeMap<String, HealthDetail>,
    pub warranty_job: WarrantyJobStatus,
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DatabaseConnection>,
    pub warranty_job: WarrantyJobState,
    pub start_time: SystemTime,
}

impl HealthState {
    pub fn new(db_pool: Arc<DatabaseConnection>, warranty_job: WarrantyJobState) -> Self {
        Self {
            db_pool,
            warranty_job,
            start_time: SystemTime::now(),
        }
    }

    /// Calculate system uptime
    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    async fn database_detail(&self) -> HealthDetail {
        let (status, message) = match crate::db::check_connection(&self.db_pool).await {
            Ok(latency) => (
                HealthStatus::Up,
                Some(format!("ping {} ms", latency.as_millis())),
            ),
            Err(e) => {
                error!("Database health check failed: {}", e);
                (HealthStatus::Down, Some("database unreachable".to_string()))
            }
        };
        HealthDetail {
            status,
            message,
            timestamp: Utc::now(),
        }
    }

    /// Database ping plus the state of the expired-warranty job
    pub async fn collect(&self) -> HealthInfo {
        let mut details = BTreeMap::new();
        details.insert("database".to_string(), self.database_detail().await);

        let job = self.warranty_job.snapshot().await;
        details.insert("warranty_job".to_string(), job_detail(&job));

        let status = overall_status(details.values());

        HealthInfo {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime_seconds: self.uptime(),
            details,
            warranty_job: job,
        }
    }
}

/// A failed last run degrades the service; it never takes it down
fn job_detail(job: &WarrantyJobStatus) -> HealthDetail {
    let (status, message) = match (job.enabled, job.last_run_ok) {
        (false, _) => (HealthStatus::Up, Some("disabled".to_string())),
        (true, None) => (HealthStatus::Up, Some("no run yet".to_string())),
        (true, Some(true)) => (HealthStatus::Up, None),
        (true, Some(false)) => (HealthStatus::Degraded, job.last_error.clone()),
    };
    HealthDetail {
        status,
        message,
        timestamp: Utc::now(),
    }
}

fn overall_status<'a>(details: impl Iterator<Item = &'a HealthDetail>) -> HealthStatus {
    let mut status = HealthStatus::Up;
    for detail in details {
        match detail.status {
            HealthStatus::Down => return HealthStatus::Down,
            HealthStatus::Degraded => status = HealthStatus::Degraded,
            HealthStatus::Up => {}
        }
    }
    status
}

/// Returns build and version information
pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
        "built": option_env!("BUILD_TIME").unwrap_or("unknown"),
    }))
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("Readiness check endpoint called");

    let database = state.database_detail().await;
    let ready = database.status == HealthStatus::Up;
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(json!({
            "ready": ready,
            "timestamp": Utc::now(),
        })),
    )
}

/// Liveness check endpoint
pub async fn liveness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "alive": true,
            "uptime_seconds": state.uptime(),
            "timestamp": Utc::now(),
        })),
    )
}

/// Creates router with the probe endpoints, meant to be nested at `/health`
pub fn health_routes(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
        .route("/version", get(version_info))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(status: HealthStatus) -> HealthDetail {
        HealthDetail {
            status,
            message: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn overall_status_takes_the_worst() {
        let all_up = [detail(HealthStatus::Up), detail(HealthStatus::Up)];
        assert_eq!(overall_status(all_up.iter()), HealthStatus::Up);

        let degraded = [detail(HealthStatus::Degraded), detail(HealthStatus::Up)];
        assert_eq!(overall_status(degraded.iter()), HealthStatus::Degraded);

        let down = [detail(HealthStatus::Degraded), detail(HealthStatus::Down)];
        assert_eq!(overall_status(down.iter()), HealthStatus::Down);
    }

    #[test]
    fn failed_job_run_degrades() {
        let job = WarrantyJobStatus {
            enabled: true,
            last_run_ok: Some(false),
            last_error: Some("Database error".into()),
            ..Default::default()
        };
        let detail = job_detail(&job);
        assert_eq!(detail.status, HealthStatus::Degraded);
        assert_eq!(detail.message.as_deref(), Some("Database error"));

        let disabled = WarrantyJobStatus::default();
        assert_eq!(job_detail(&disabled).status, HealthStatus::Up);
    }

    #[tokio::test]
    async fn collect_reports_database_up_for_sqlite() {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        let state = HealthState::new(Arc::new(db), WarrantyJobState::new(false));

        let info = state.collect().await;
        assert_eq!(info.status, HealthStatus::Up);
        assert_eq!(info.details["database"].status, HealthStatus::Up);
        assert!(!info.warranty_job.enabled);
    }
}
