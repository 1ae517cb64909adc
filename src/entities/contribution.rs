use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::FieldRules;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{ContributionId, MemberId, Month, PaymentMethod};

const DEFAULT_DESCRIPTION: &str = "Monthly contribution";

/// a deposit into the pool by one member for one calendar month
///
/// At most one contribution may exist per (member, month) pair; the store
/// enforces that at creation. Member and month are immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub member_id: MemberId,
    pub amount: Money,
    pub month: Month,
    pub description: String,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl Contribution {
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        member_id: MemberId,
        amount: Money,
        month: Month,
        description: Option<&str>,
        method: PaymentMethod,
        reference: Option<&str>,
        now: DateTime<Utc>,
        rules: &FieldRules,
    ) -> Result<Self> {
        validate_amount(amount)?;
        let description = validate_description(description, rules)?;
        let reference = validate_reference(reference, rules)?;

        Ok(Self {
            id: Uuid::new_v4(),
            member_id,
            amount,
            month,
            description,
            method,
            reference,
            recorded_at: now,
        })
    }

    /// amount, description, method and reference stay editable; member and
    /// month never change once recorded
    pub fn edit(
        &mut self,
        amount: Option<Money>,
        description: Option<&str>,
        method: Option<PaymentMethod>,
        reference: Option<&str>,
        rules: &FieldRules,
    ) -> Result<()> {
        if let Some(amount) = amount {
            validate_amount(amount)?;
            self.amount = amount;
        }
        if description.is_some() {
            self.description = validate_description(description, rules)?;
        }
        if let Some(method) = method {
            self.method = method;
        }
        if reference.is_some() {
            self.reference = validate_reference(reference, rules)?;
        }
        Ok(())
    }
}

fn validate_amount(amount: Money) -> Result<()> {
    if amount < Money::ONE {
        return Err(LedgerError::validation(format!(
            "contribution amount must be at least 1, got {amount}"
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>, rules: &FieldRules) -> Result<String> {
    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DESCRIPTION);
    if description.len() > rules.note_max {
        return Err(LedgerError::validation(format!(
            "description cannot exceed {} characters",
            rules.note_max
        )));
    }
    Ok(description.to_string())
}

fn validate_reference(reference: Option<&str>, rules: &FieldRules) -> Result<Option<String>> {
    match reference.map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) if r.len() > rules.reference_max => Err(LedgerError::validation(format!(
            "reference cannot exceed {} characters",
            rules.reference_max
        ))),
        other => Ok(other.map(str::to_string)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;

    fn rules() -> FieldRules {
        LedgerConfig::standard().field_rules
    }

    fn month() -> Month {
        "2024-01".parse().unwrap()
    }

    #[test]
    fn test_record_defaults_description() {
        let c = Contribution::record(
            Uuid::new_v4(),
            Money::from_major(500),
            month(),
            None,
            PaymentMethod::default(),
            None,
            Utc::now(),
            &rules(),
        )
        .unwrap();
        assert_eq!(c.description, "Monthly contribution");
        assert_eq!(c.method, PaymentMethod::Cash);
    }

    #[test]
    fn test_amount_below_one_rejected() {
        let result = Contribution::record(
            Uuid::new_v4(),
            Money::from_str_exact("0.5").unwrap(),
            month(),
            None,
            PaymentMethod::Cash,
            None,
            Utc::now(),
            &rules(),
        );
        assert!(matches!(result, Err(LedgerError::Validation { .. })));
    }

    #[test]
    fn test_edit_keeps_month_and_member() {
        let member_id = Uuid::new_v4();
        let mut c = Contribution::record(
            member_id,
            Money::from_major(500),
            month(),
            None,
            PaymentMethod::Cash,
            None,
            Utc::now(),
            &rules(),
        )
        .unwrap();

        c.edit(
            Some(Money::from_major(750)),
            Some("festival top-up"),
            Some(PaymentMethod::Upi),
            Some("UPI-123"),
            &rules(),
        )
        .unwrap();

        assert_eq!(c.amount, Money::from_major(750));
        assert_eq!(c.description, "festival top-up");
        assert_eq!(c.member_id, member_id);
        assert_eq!(c.month, month());
    }

    #[test]
    fn test_overlong_reference_rejected() {
        let long = "r".repeat(51);
        let result = Contribution::record(
            Uuid::new_v4(),
            Money::from_major(500),
            month(),
            None,
            PaymentMethod::Cash,
            Some(&long),
            Utc::now(),
            &rules(),
        );
        assert!(result.is_err());
    }
}
