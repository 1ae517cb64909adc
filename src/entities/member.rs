use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::FieldRules;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::MemberId;

/// a participant in the shared fund
///
/// The three totals are denormalized rollups over the member's contribution
/// and loan records. They are caches: the aggregator recomputes them after
/// every mutation that touches this member, and nothing else writes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: Option<String>,
    pub total_contributions: Money,
    pub total_loans: Money,
    pub total_payable: Money,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

/// recomputed rollups, produced by the aggregator from live records
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MemberTotals {
    pub total_contributions: Money,
    pub total_loans: Money,
    pub total_payable: Money,
}

impl Member {
    pub fn register(
        name: &str,
        email: Option<&str>,
        now: DateTime<Utc>,
        rules: &FieldRules,
    ) -> Result<Self> {
        let name = validate_name(name, rules)?;
        let email = email.map(validate_email).transpose()?;

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            email,
            total_contributions: Money::ZERO,
            total_loans: Money::ZERO,
            total_payable: Money::ZERO,
            is_active: true,
            joined_at: now,
        })
    }

    pub fn rename(&mut self, name: &str, rules: &FieldRules) -> Result<()> {
        self.name = validate_name(name, rules)?;
        Ok(())
    }

    pub fn set_email(&mut self, email: Option<&str>) -> Result<()> {
        self.email = email.map(validate_email).transpose()?;
        Ok(())
    }

    /// overwrite the cached rollups with freshly computed ones
    pub fn apply_totals(&mut self, totals: MemberTotals) {
        self.total_contributions = totals.total_contributions;
        self.total_loans = totals.total_loans;
        self.total_payable = totals.total_payable;
    }

    /// key used for case-insensitive name uniqueness
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }
}

pub(crate) fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn validate_name(name: &str, rules: &FieldRules) -> Result<String> {
    let name = name.trim();
    if name.len() < rules.name_min || name.len() > rules.name_max {
        return Err(LedgerError::validation(format!(
            "name must be between {} and {} characters",
            rules.name_min, rules.name_max
        )));
    }
    Ok(name.to_string())
}

fn validate_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(LedgerError::validation(format!("invalid email: {email}")));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;

    fn rules() -> FieldRules {
        LedgerConfig::standard().field_rules
    }

    #[test]
    fn test_register_trims_and_keeps_name() {
        let member = Member::register("  Asha Rao  ", None, Utc::now(), &rules()).unwrap();
        assert_eq!(member.name, "Asha Rao");
        assert!(member.is_active);
        assert_eq!(member.total_contributions, Money::ZERO);
    }

    #[test]
    fn test_name_length_bounds() {
        assert!(Member::register("A", None, Utc::now(), &rules()).is_err());
        let long = "x".repeat(51);
        assert!(Member::register(&long, None, Utc::now(), &rules()).is_err());
    }

    #[test]
    fn test_email_validation() {
        let now = Utc::now();
        assert!(Member::register("Asha", Some("asha@example.com"), now, &rules()).is_ok());
        let folded = Member::register("Asha", Some("AshA@Example.COM"), now, &rules()).unwrap();
        assert_eq!(folded.email.as_deref(), Some("asha@example.com"));
        assert!(Member::register("Asha", Some("not-an-email"), now, &rules()).is_err());
        assert!(Member::register("Asha", Some("a@b"), now, &rules()).is_err());
        assert!(Member::register("Asha", Some("a@@b.com"), now, &rules()).is_err());
    }

    #[test]
    fn test_name_key_folds_case() {
        let member = Member::register("Asha Rao", None, Utc::now(), &rules()).unwrap();
        assert_eq!(member.name_key(), "asha rao");
    }
}
