// Time Provider Port (for testability)

use chrono::NaiveDate;

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Current calendar date, used for scrape dates, listing age and cache names
    fn today(&self) -> NaiveDate {
        chrono::DateTime::<chrono::Utc>::from_timestamp_millis(self.now_millis())
            .map(|dt| dt.date_naive())
            .unwrap_or_default()
    }
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

pub mod mocks {
    use super::*;

    /// Frozen clock for deterministic tests
    pub struct FixedTimeProvider {
        today: NaiveDate,
    }

    impl FixedTimeProvider {
        pub fn new(today: NaiveDate) -> Self {
            Self { today }
        }

        pub fn ymd(year: i32, month: u32, day: u32) -> Self {
            Self::new(NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default())
        }
    }

    impl TimeProvider for FixedTimeProvider {
        fn now_millis(&self) -> i64 {
            self.today
                .and_hms_opt(12, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis())
                .unwrap_or_default()
        }

        fn today(&self) -> NaiveDate {
            self.today
        }
    }
}
