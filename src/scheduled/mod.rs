//! Scheduled transfers
//!
//! Recurring transfer instructions owned by a user and executed by the
//! runner in `jobs`. The recipient identifier is stored as a string and
//! resolved at execution time, not when the schedule is created.

mod repository;

pub use repository::{NewScheduledTransfer, ScheduledTransferRepository};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::Category;

/// How often a scheduled transfer repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Once,
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Next run after a successful execution; `None` deactivates the
    /// schedule. Monthly advances by a fixed 30 days, a deliberate
    /// calendar-naive approximation that drifts against true month
    /// boundaries.
    pub fn next_after(&self, current: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Frequency::Once => None,
            Frequency::Daily => Some(current + Duration::days(1)),
            Frequency::Weekly => Some(current + Duration::days(7)),
            Frequency::Monthly => Some(current + Duration::days(30)),
        }
    }
}

impl From<String> for Frequency {
    fn from(s: String) -> Self {
        match s.as_str() {
            "once" => Frequency::Once,
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            _ => Frequency::Monthly,
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Once => write!(f, "once"),
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Monthly => write!(f, "monthly"),
        }
    }
}

/// A recurring transfer instruction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTransfer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub from_account_id: Uuid,
    /// Account number or email, resolved at execution time
    pub to_identifier: String,
    pub amount: Decimal,
    pub category: Category,
    pub description: String,
    pub frequency: Frequency,
    pub next_run: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ScheduledTransfer {
    /// Due when active and `next_run` is at or before `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_run <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_frequency_advancement() {
        let now = t("2026-08-30T12:00:00Z");
        assert_eq!(Frequency::Once.next_after(now), None);
        assert_eq!(Frequency::Daily.next_after(now), Some(t("2026-08-31T12:00:00Z")));
        assert_eq!(Frequency::Weekly.next_after(now), Some(t("2026-09-06T12:00:00Z")));
        assert_eq!(Frequency::Monthly.next_after(now), Some(t("2026-09-29T12:00:00Z")));
    }

    #[test]
    fn test_frequency_round_trip() {
        for (text, freq) in [
            ("once", Frequency::Once),
            ("daily", Frequency::Daily),
            ("weekly", Frequency::Weekly),
            ("monthly", Frequency::Monthly),
        ] {
            assert_eq!(Frequency::from(text.to_string()), freq);
            assert_eq!(freq.to_string(), text);
        }
    }
}
