use chrono::{DateTime, NaiveDate, Utc};
use metrics::gauge;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info};
use utoipa::ToSchema;

use super::DailySchedule;
use crate::services::warranty_suggestions::{WarrantyRunReport, WarrantySuggestionGenerator};

/// Last known state of the expired-warranty job, shown by the health endpoint
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct WarrantyJobStatus {
    pub enabled: bool,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_date: Option<NaiveDate>,
    pub last_run_ok: Option<bool>,
    pub last_created: Option<usize>,
    pub last_failed_devices: Option<usize>,
    pub last_error: Option<String>,
}

/// Shared handle to [`WarrantyJobStatus`]
#[derive(Debug, Clone, Default)]
pub struct WarrantyJobState {
    inner: Arc<RwLock<WarrantyJobStatus>>,
}

impl WarrantyJobState {
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(WarrantyJobStatus {
                enabled,
                ..Default::default()
            })),
        }
    }

    pub async fn snapshot(&self) -> WarrantyJobStatus {
        self.inner.read().await.clone()
    }

    async fn set_next_run(&self, next: DateTime<Utc>) {
        self.inner.write().await.next_run_at = Some(next);
    }

    async fn record_success(&self, report: &WarrantyRunReport) {
        let mut status = self.inner.write().await;
        status.last_run_at = Some(Utc::now());
        status.last_run_date = Some(report.run_date);
        status.last_run_ok = Some(true);
        status.last_created = Some(report.created.len());
        status.last_failed_devices = Some(report.failed);
        status.last_error = None;
    }

    async fn record_failure(&self, error: String) {
        let mut status = self.inner.write().await;
        status.last_run_at = Some(Utc::now());
        status.last_run_ok = Some(false);
        status.last_error = Some(error);
    }
}

/// Running worker. Dropping the handle also stops the worker, but without
/// waiting for it; use [`shutdown`](Self::shutdown) to wait.
pub struct WarrantyJobHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WarrantyJobHandle {
    /// Signals the worker to stop and waits for it. A run in progress finishes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("expired warranty worker ended abnormally: {}", e);
        }
    }
}

/// Runs the generator and records the outcome
pub async fn run_once(
    generator: &WarrantySuggestionGenerator,
    state: &WarrantyJobState,
) -> Option<WarrantyRunReport> {
    match generator.run().await {
        Ok(report) => {
            gauge!(
                "asset_tracker.warranty_job.last_success_timestamp",
                Utc::now().timestamp() as f64
            );
            state.record_success(&report).await;
            Some(report)
        }
        Err(e) => {
            error!(error = %e, "expired warranty run failed");
            state.record_failure(e.to_string()).await;
            None
        }
    }
}

/// Spawns the daily expired-warranty worker.
///
/// The loop sleeps until the next scheduled instant, runs the generator, and
/// repeats. A failed run does not stop the loop.
pub fn start_worker(
    generator: WarrantySuggestionGenerator,
    schedule: DailySchedule,
    state: WarrantyJobState,
) -> WarrantyJobHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        loop {
            let next = schedule.next_run_after(Utc::now());
            state.set_next_run(next).await;
            info!(next_run_at = %next, "expired warranty job scheduled");

            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::select! {
                _ = sleep(wait) => {}
                _ = shutdown_rx.changed() => {
                    info!("expired warranty worker stopping");
                    break;
                }
            }

            run_once(&generator, &state).await;
        }
    });

    WarrantyJobHandle {
        shutdown: shutdown_tx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::repositories::memory::{InMemoryDeviceReader, InMemorySuggestionStore};
    use crate::repositories::DeviceWarranty;
    use chrono::FixedOffset;
    use std::time::Duration;

    fn generator(store: Arc<InMemorySuggestionStore>) -> WarrantySuggestionGenerator {
        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        WarrantySuggestionGenerator::new(
            Arc::new(InMemoryDeviceReader::new(vec![DeviceWarranty {
                device_id: 1,
                serial_number: "SN-1".into(),
                part_type_id: Some(3),
                warranty_end: Some(today),
            }])),
            store,
            Arc::new(FixedClock(today)),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn run_once_records_success() {
        let store = Arc::new(InMemorySuggestionStore::new());
        let state = WarrantyJobState::new(true);

        let report = run_once(&generator(store.clone()), &state).await.unwrap();
        assert_eq!(report.created.len(), 1);

        let status = state.snapshot().await;
        assert_eq!(status.last_run_ok, Some(true));
        assert_eq!(status.last_created, Some(1));
        assert_eq!(
            status.last_run_date,
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[tokio::test]
    async fn worker_publishes_next_run_and_stops_on_shutdown() {
        let state = WarrantyJobState::new(true);
        let schedule =
            DailySchedule::new(0, 10, FixedOffset::east_opt(3 * 3600).unwrap()).unwrap();
        let handle = start_worker(
            generator(Arc::new(InMemorySuggestionStore::new())),
            schedule,
            state.clone(),
        );

        let mut next = None;
        for _ in 0..50 {
            next = state.snapshot().await.next_run_at;
            if next.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(next.is_some_and(|n| n > Utc::now()));

        tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .expect("worker should stop promptly");
        assert!(state.snapshot().await.last_run_at.is_none());
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_worker() {
        let state = WarrantyJobState::new(true);
        let store = Arc::new(InMemorySuggestionStore::new());
        let schedule =
            DailySchedule::new(0, 10, FixedOffset::east_opt(3 * 3600).unwrap()).unwrap();
        let handle = start_worker(generator(store.clone()), schedule, state.clone());

        for _ in 0..50 {
            if state.snapshot().await.next_run_at.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(Arc::strong_count(&store) > 1);

        drop(handle);

        // The task owns the generator, so the store is released once it ends
        let released = tokio::time::timeout(Duration::from_secs(2), async {
            while Arc::strong_count(&store) > 1 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(released.is_ok(), "worker kept running after its handle was dropped");
    }
}
