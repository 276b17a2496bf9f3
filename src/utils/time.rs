use chrono::{DateTime, Utc};

/// Source of "now" for audit stamping.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Suffix used in export file names, e.g. `20250305_143000`.
pub fn to_file_stamp(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_file_stamps() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 5, 14, 30, 9).unwrap();
        assert_eq!(to_file_stamp(dt), "20250305_143009");
    }

    #[test]
    fn mocked_clock_returns_fixed_instant() {
        let fixed = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut clock = MockClock::new();
        clock.expect_now().return_const(fixed);
        assert_eq!(clock.now(), fixed);
    }
}
