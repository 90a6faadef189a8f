//! Expired-warranty replacement suggestions.
//!
//! Once a day every device whose warranty has ended is looked at, and its part
//! type gets a `pending` replacement suggestion dated today unless one already
//! exists for that part type and day. The existence check is per
//! (part type, day), so several expired devices of one part type produce a
//! single suggestion. A concurrent second run may still race the check.

use chrono::NaiveDate;
use metrics::counter;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::Clock;
use crate::entities::replacement_suggestion::{
    self, GENERATED_BY_EXPIRED_WARRANTY, STATUS_PENDING,
};
use crate::errors::ServiceError;
use crate::repositories::{
    DeviceReader, DeviceWarranty, NewSuggestion, SuggestionFilter, SuggestionStore,
};

/// Outcome of one generator run
#[derive(Debug, Clone, Serialize)]
pub struct WarrantyRunReport {
    pub run_date: NaiveDate,
    /// Devices returned by storage
    pub devices_scanned: usize,
    /// Devices with `warranty_end <= run_date`
    pub expired_devices: usize,
    /// Suggestions inserted by this run
    pub created: Vec<replacement_suggestion::Model>,
    /// Expired devices whose (part type, day) already had a suggestion
    pub skipped_existing: usize,
    /// Expired devices whose device type could not be resolved
    pub skipped_unresolved: usize,
    /// Expired devices whose check or insert failed or timed out
    pub failed: usize,
}

impl WarrantyRunReport {
    fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            devices_scanned: 0,
            expired_devices: 0,
            created: Vec::new(),
            skipped_existing: 0,
            skipped_unresolved: 0,
            failed: 0,
        }
    }
}

/// Comment stored on generated suggestions
pub fn suggestion_comment(device_id: i64, warranty_end: NaiveDate) -> String {
    format!(
        "Auto-generated for device {} after warranty_end={}",
        device_id,
        warranty_end.format("%Y-%m-%d")
    )
}

#[derive(Clone)]
pub struct WarrantySuggestionGenerator {
    devices: Arc<dyn DeviceReader>,
    suggestions: Arc<dyn SuggestionStore>,
    clock: Arc<dyn Clock>,
    call_timeout: Duration,
}

impl WarrantySuggestionGenerator {
    pub fn new(
        devices: Arc<dyn DeviceReader>,
        suggestions: Arc<dyn SuggestionStore>,
        clock: Arc<dyn Clock>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            devices,
            suggestions,
            clock,
            call_timeout,
        }
    }

    /// Runs for the clock's current date
    pub async fn run(&self) -> Result<WarrantyRunReport, ServiceError> {
        let today = self.clock.today();
        self.run_for_date(today).await
    }

    /// Runs as if `today` were the current date.
    ///
    /// Only a failure to load devices is returned as an error. Failures for a
    /// single device are logged, counted in `failed`, and the run moves on.
    #[instrument(skip(self))]
    pub async fn run_for_date(&self, today: NaiveDate) -> Result<WarrantyRunReport, ServiceError> {
        let mut report = WarrantyRunReport::new(today);

        let mut devices = self.bounded(self.devices.fetch_all()).await.map_err(|e| {
            error!(error = %e, "Failed to load devices; warranty run aborted");
            counter!("asset_tracker.warranty_job.aborted", 1);
            e
        })?;
        report.devices_scanned = devices.len();

        devices.retain(|d| d.warranty_end.map_or(false, |end| end <= today));
        devices.sort_by_key(|d| d.device_id);
        report.expired_devices = devices.len();

        for device in &devices {
            self.process_device(device, today, &mut report).await;
        }

        counter!(
            "asset_tracker.warranty_job.suggestions_created",
            report.created.len() as u64
        );
        counter!("asset_tracker.warranty_job.device_failures", report.failed as u64);

        info!(
            run_date = %today,
            devices_scanned = report.devices_scanned,
            expired = report.expired_devices,
            created = report.created.len(),
            skipped_existing = report.skipped_existing,
            skipped_unresolved = report.skipped_unresolved,
            failed = report.failed,
            "Expired warranty run finished"
        );

        Ok(report)
    }

    async fn process_device(
        &self,
        device: &DeviceWarranty,
        today: NaiveDate,
        report: &mut WarrantyRunReport,
    ) {
        let device_id = device.device_id;
        let Some(warranty_end) = device.warranty_end else {
            return;
        };
        let Some(part_type_id) = device.part_type_id else {
            warn!(device_id, "Device type not resolvable; skipping device");
            report.skipped_unresolved += 1;
            return;
        };

        let existing = match self
            .bounded(
                self.suggestions
                    .find(SuggestionFilter::for_part_type_on(part_type_id, today)),
            )
            .await
        {
            Ok(existing) => existing,
            Err(e) => {
                log_device_failure(device_id, part_type_id, "existence check", &e);
                report.failed += 1;
                return;
            }
        };

        if !existing.is_empty() {
            debug!(
                device_id,
                part_type_id, "Suggestion for part type already exists today"
            );
            report.skipped_existing += 1;
            return;
        }

        let new_suggestion = NewSuggestion {
            part_type_id,
            suggestion_date: today,
            forecast_replacement_date: today,
            generated_by: GENERATED_BY_EXPIRED_WARRANTY.to_string(),
            status: STATUS_PENDING.to_string(),
            comments: Some(suggestion_comment(device_id, warranty_end)),
        };

        match self.bounded(self.suggestions.create(new_suggestion)).await {
            Ok(created) => {
                info!(
                    device_id,
                    part_type_id,
                    suggestion_id = created.id,
                    "Created replacement suggestion"
                );
                report.created.push(created);
            }
            Err(e) => {
                log_device_failure(device_id, part_type_id, "insert", &e);
                report.failed += 1;
            }
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, ServiceError>>,
    {
        tokio::time::timeout(self.call_timeout, call).await?
    }
}

fn log_device_failure(device_id: i64, part_type_id: i64, step: &str, err: &ServiceError) {
    match err {
        ServiceError::Timeout(_) => {
            warn!(device_id, part_type_id, step, "Storage call timed out; skipping device")
        }
        _ => error!(
            device_id,
            part_type_id,
            step,
            error = %err,
            "Storage call failed; skipping device"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::repositories::memory::{InMemoryDeviceReader, InMemorySuggestionStore};
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn device(id: i64, part_type_id: Option<i64>, warranty_end: Option<NaiveDate>) -> DeviceWarranty {
        DeviceWarranty {
            device_id: id,
            serial_number: format!("SN-{id}"),
            part_type_id,
            warranty_end,
        }
    }

    fn generator(
        devices: Vec<DeviceWarranty>,
        store: Arc<dyn SuggestionStore>,
        today: NaiveDate,
    ) -> WarrantySuggestionGenerator {
        WarrantySuggestionGenerator::new(
            Arc::new(InMemoryDeviceReader::new(devices)),
            store,
            Arc::new(FixedClock(today)),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn same_part_type_on_same_day_yields_one_suggestion() {
        let today = day(2024, 3, 1);
        let store = Arc::new(InMemorySuggestionStore::new());
        let gen = generator(
            vec![device(2, Some(7), Some(today)), device(1, Some(7), Some(today))],
            store.clone(),
            today,
        );

        let report = gen.run().await.unwrap();

        assert_eq!(report.created.len(), 1);
        assert_eq!(report.skipped_existing, 1);
        let rows = store.snapshot();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.part_type_id, 7);
        assert_eq!(row.suggestion_date, today);
        assert_eq!(row.forecast_replacement_date, today);
        assert_eq!(row.generated_by, "system:expired_warranty");
        assert_eq!(row.status, "pending");
        // lowest device id is processed first
        assert_eq!(
            row.comments.as_deref(),
            Some("Auto-generated for device 1 after warranty_end=2024-03-01")
        );
    }

    #[tokio::test]
    async fn existing_suggestion_for_today_prevents_new_one() {
        let today = day(2024, 3, 1);
        let store = Arc::new(InMemorySuggestionStore::with_rows(vec![
            replacement_suggestion::Model {
                id: 1,
                part_type_id: 7,
                suggestion_date: today,
                forecast_replacement_date: day(2024, 4, 1),
                generated_by: "manual".into(),
                status: "approved".into(),
                comments: None,
            },
        ]));
        let gen = generator(vec![device(1, Some(7), Some(day(2023, 1, 1)))], store.clone(), today);

        let report = gen.run().await.unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.skipped_existing, 1);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn yesterdays_suggestion_does_not_count() {
        let today = day(2024, 3, 2);
        let store = Arc::new(InMemorySuggestionStore::new());
        generator(vec![device(1, Some(7), Some(day(2024, 3, 1)))], store.clone(), day(2024, 3, 1))
            .run()
            .await
            .unwrap();

        let report = generator(vec![device(1, Some(7), Some(day(2024, 3, 1)))], store.clone(), today)
            .run()
            .await
            .unwrap();
        assert_eq!(report.created.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn future_or_missing_warranty_end_is_ignored() {
        let today = day(2024, 3, 1);
        let store = Arc::new(InMemorySuggestionStore::new());
        let report = generator(
            vec![device(1, Some(7), Some(day(2024, 3, 2))), device(2, Some(8), None)],
            store.clone(),
            today,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(report.devices_scanned, 2);
        assert_eq!(report.expired_devices, 0);
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn second_run_on_same_day_is_a_no_op() {
        let today = day(2024, 3, 1);
        let store = Arc::new(InMemorySuggestionStore::new());
        let gen = generator(
            vec![device(1, Some(7), Some(today)), device(2, Some(8), Some(today))],
            store.clone(),
            today,
        );

        assert_eq!(gen.run().await.unwrap().created.len(), 2);
        let again = gen.run().await.unwrap();
        assert!(again.created.is_empty());
        assert_eq!(again.skipped_existing, 2);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn unresolved_device_type_is_skipped() {
        let today = day(2024, 3, 1);
        let store = Arc::new(InMemorySuggestionStore::new());
        let report = generator(
            vec![device(1, None, Some(today)), device(2, Some(8), Some(today))],
            store.clone(),
            today,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(report.skipped_unresolved, 1);
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].part_type_id, 8);
    }

    /// Store that fails or hangs for chosen part types and delegates otherwise
    struct FlakyStore {
        inner: InMemorySuggestionStore,
        failing_part_type: Option<i64>,
        hanging_part_type: Option<i64>,
    }

    #[async_trait]
    impl SuggestionStore for FlakyStore {
        async fn find(
            &self,
            filter: SuggestionFilter,
        ) -> Result<Vec<replacement_suggestion::Model>, ServiceError> {
            if filter.part_type_id.is_some() && filter.part_type_id == self.hanging_part_type {
                std::future::pending::<()>().await;
            }
            self.inner.find(filter).await
        }

        async fn create(
            &self,
            suggestion: NewSuggestion,
        ) -> Result<replacement_suggestion::Model, ServiceError> {
            if Some(suggestion.part_type_id) == self.failing_part_type {
                return Err(ServiceError::db_error("insert rejected"));
            }
            self.inner.create(suggestion).await
        }
    }

    #[tokio::test]
    async fn store_failure_skips_only_that_device() {
        let today = day(2024, 3, 1);
        let store = Arc::new(FlakyStore {
            inner: InMemorySuggestionStore::new(),
            failing_part_type: Some(7),
            hanging_part_type: None,
        });
        let report = generator(
            vec![device(1, Some(7), Some(today)), device(2, Some(8), Some(today))],
            store.clone(),
            today,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.created.len(), 1);
        assert_eq!(store.inner.snapshot()[0].part_type_id, 8);
    }

    #[tokio::test]
    async fn timed_out_call_counts_as_failed() {
        let today = day(2024, 3, 1);
        let store = Arc::new(FlakyStore {
            inner: InMemorySuggestionStore::new(),
            failing_part_type: None,
            hanging_part_type: Some(7),
        });
        let report = generator(
            vec![device(1, Some(7), Some(today)), device(2, Some(8), Some(today))],
            store.clone(),
            today,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].part_type_id, 8);
    }

    struct BrokenDevices;

    #[async_trait]
    impl DeviceReader for BrokenDevices {
        async fn fetch_all(&self) -> Result<Vec<DeviceWarranty>, ServiceError> {
            Err(ServiceError::db_error("connection refused"))
        }
    }

    #[tokio::test]
    async fn device_fetch_failure_aborts_the_run() {
        let gen = WarrantySuggestionGenerator::new(
            Arc::new(BrokenDevices),
            Arc::new(InMemorySuggestionStore::new()),
            Arc::new(FixedClock(day(2024, 3, 1))),
            Duration::from_secs(1),
        );
        assert_matches!(gen.run().await, Err(ServiceError::DatabaseError(_)));
    }

    #[test]
    fn comment_uses_iso_dates() {
        assert_eq!(
            suggestion_comment(42, day(2023, 12, 31)),
            "Auto-generated for device 42 after warranty_end=2023-12-31"
        );
    }
}
