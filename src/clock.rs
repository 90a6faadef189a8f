use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

/// Source of "today" for date-driven jobs
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock observed at a fixed UTC offset
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Clock pinned to one date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_uses_its_offset() {
        let utc = SystemClock::new(FixedOffset::east_opt(0).unwrap());
        let far_east = SystemClock::new(FixedOffset::east_opt(14 * 3600).unwrap());
        let diff = far_east.today() - utc.today();
        // +14:00 is either on the same calendar day as UTC or one ahead
        assert!(diff.num_days() == 0 || diff.num_days() == 1);
    }
}
