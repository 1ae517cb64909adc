use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};

/// ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub loan_limits: LoanLimits,
    pub field_rules: FieldRules,
    /// annual rate applied when a loan does not specify one
    pub default_annual_rate: Rate,
    /// balances at or below this settle to zero
    pub settlement_epsilon: Money,
}

/// principal bounds for new loans
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoanLimits {
    pub minimum: Money,
    pub maximum: Money,
}

/// length rules for free-text fields
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldRules {
    pub name_min: usize,
    pub name_max: usize,
    pub loan_description_min: usize,
    pub loan_description_max: usize,
    pub note_max: usize,
    pub reference_max: usize,
}

impl LedgerConfig {
    /// the community fund's standard terms: 20% annual, loans from 100 to 10,00,000
    pub fn standard() -> Self {
        Self {
            loan_limits: LoanLimits {
                minimum: Money::from_major(100),
                maximum: Money::from_major(1_000_000),
            },
            field_rules: FieldRules {
                name_min: 2,
                name_max: 50,
                loan_description_min: 5,
                loan_description_max: 500,
                note_max: 200,
                reference_max: 50,
            },
            default_annual_rate: Rate::from_percentage(20),
            settlement_epsilon: Money::EPSILON,
        }
    }

    /// annual rates must sit within [0, 1]
    pub fn validate_rate(&self, rate: Rate) -> Result<()> {
        if rate.as_decimal() < dec!(0) || rate.as_decimal() > dec!(1) {
            return Err(LedgerError::validation(format!(
                "interest rate must be between 0 and 1, got {}",
                rate.as_decimal()
            )));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_standard_terms() {
        let config = LedgerConfig::standard();
        assert_eq!(config.loan_limits.minimum, Money::from_major(100));
        assert_eq!(config.loan_limits.maximum, Money::from_major(1_000_000));
        assert_eq!(config.default_annual_rate, Rate::from_percentage(20));
    }

    #[test]
    fn test_rate_bounds() {
        let config = LedgerConfig::standard();
        assert!(config.validate_rate(Rate::ZERO).is_ok());
        assert!(config.validate_rate(Rate::ONE).is_ok());
        assert!(config
            .validate_rate(Rate::from_decimal(Decimal::from(2)))
            .is_err());
        assert!(config
            .validate_rate(Rate::from_decimal(Decimal::from(-1)))
            .is_err());
    }
}
