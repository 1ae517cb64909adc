use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// unique identifier for a member
pub type MemberId = Uuid;
/// unique identifier for a loan
pub type LoanId = Uuid;
/// unique identifier for a payment
pub type PaymentId = Uuid;
/// unique identifier for a contribution
pub type ContributionId = Uuid;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// accruing interest and accepting payments
    Active,
    /// balance cleared through payments
    Paid,
    /// written off by an administrator
    Defaulted,
    /// withdrawn by an administrator
    Cancelled,
}

impl LoanStatus {
    /// paid, defaulted and cancelled are terminal
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoanStatus::Active)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoanStatus::Active => "active",
            LoanStatus::Paid => "paid",
            LoanStatus::Defaulted => "defaulted",
            LoanStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// payment status; payments are recorded as already settled unless staged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    #[default]
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// whether a payment clears the loan or pays down part of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Full,
    Partial,
}

/// how money changed hands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    BankTransfer,
    Upi,
    Cheque,
    Other,
}

/// a calendar month, the granularity of contributions and interest accrual
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// the month containing the given instant
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// absolute month index; whole-month spans are index differences
    pub fn index(&self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }

    /// whole calendar months from `earlier` to `self` (negative if earlier is later)
    pub fn months_since(&self, earlier: Month) -> i64 {
        self.index() - earlier.index()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// parse a `YYYY-MM` string
impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("month must be in YYYY-MM format, got '{s}'"))?;
        if year.len() != 4 || month.len() != 2 {
            return Err(format!("month must be in YYYY-MM format, got '{s}'"));
        }
        let year: i32 = year
            .parse()
            .map_err(|_| format!("invalid year in month '{s}'"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("invalid month in '{s}'"))?;
        Month::new(year, month).ok_or_else(|| format!("month out of range in '{s}'"))
    }
}

impl TryFrom<String> for Month {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Month> for String {
    fn from(m: Month) -> String {
        m.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_month_parse_and_display() {
        let m: Month = "2024-01".parse().unwrap();
        assert_eq!(m.year(), 2024);
        assert_eq!(m.month(), 1);
        assert_eq!(m.to_string(), "2024-01");
    }

    #[test]
    fn test_month_rejects_bad_input() {
        assert!("2024".parse::<Month>().is_err());
        assert!("2024-13".parse::<Month>().is_err());
        assert!("2024-00".parse::<Month>().is_err());
        assert!("24-01".parse::<Month>().is_err());
        assert!("2024-1".parse::<Month>().is_err());
    }

    #[test]
    fn test_months_since_crosses_year_boundary() {
        let nov: Month = "2023-11".parse().unwrap();
        let feb: Month = "2024-02".parse().unwrap();
        assert_eq!(feb.months_since(nov), 3);
        assert_eq!(nov.months_since(feb), -3);
    }

    #[test]
    fn test_month_from_datetime() {
        let dt = Utc.with_ymd_and_hms(2024, 7, 31, 23, 59, 59).unwrap();
        assert_eq!(Month::from_datetime(dt), "2024-07".parse().unwrap());
    }

    #[test]
    fn test_month_serde_round_trip() {
        let m: Month = "2025-12".parse().unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"2025-12\"");
        assert_eq!(serde_json::from_str::<Month>(&json).unwrap(), m);
    }
}
