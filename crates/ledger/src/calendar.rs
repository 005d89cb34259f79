use crate::error::LedgerError;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, NaiveTime, Utc, Weekday};

/// Business days between trade and settlement.
pub const SETTLEMENT_LAG_DAYS: u32 = 2;

/// Resolves T+2 settlement instants on an exchange's local calendar.
///
/// Only weekends are skipped; exchange holidays are not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementCalendar {
    offset: FixedOffset,
    settlement_time: NaiveTime,
}

impl SettlementCalendar {
    pub fn new(settlement_hour: u32, utc_offset_hours: i32) -> Result<Self, LedgerError> {
        let settlement_time = NaiveTime::from_hms_opt(settlement_hour, 0, 0)
            .ok_or(LedgerError::InvalidSettlementHour(settlement_hour))?;
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or(LedgerError::InvalidUtcOffset(utc_offset_hours))?;
        Ok(Self { offset, settlement_time })
    }

    /// The instant two business days after `created_at`, pinned to the
    /// settlement hour in local time.
    pub fn settlement_for(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        let mut date = created_at.with_timezone(&self.offset).date_naive();
        let mut business_days = 0;
        while business_days < SETTLEMENT_LAG_DAYS {
            date = date + Duration::days(1);
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                business_days += 1;
            }
        }

        let local = NaiveDateTime::new(date, self.settlement_time);
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        utc.and_utc()
    }
}
