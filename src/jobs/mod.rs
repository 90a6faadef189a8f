//! Background jobs driven by a daily wall-clock schedule.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};

use crate::config::AppConfig;
use crate::errors::ServiceError;

pub mod expired_warranty;

/// Fires once a day at `hour:minute` local time in a fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    offset: FixedOffset,
}

impl DailySchedule {
    pub fn new(hour: u32, minute: u32, offset: FixedOffset) -> Result<Self, ServiceError> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            ServiceError::ValidationError(format!("invalid schedule time {:02}:{:02}", hour, minute))
        })?;
        Ok(Self { at, offset })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(
            cfg.warranty_job_hour,
            cfg.warranty_job_minute,
            cfg.scheduler_offset(),
        )
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// First scheduled instant strictly after `now`
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_now = now.with_timezone(&self.offset).naive_local();
        let mut candidate = local_now.date().and_time(self.at);
        if candidate <= local_now {
            candidate += Duration::days(1);
        }

        let as_utc = candidate - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&as_utc)
    }
}
