use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::types::{LoanId, LoanStatus, MemberId};

/// principal borrowed from the pool, accruing monthly compound interest
/// while active
///
/// `remaining_amount` is only ever decreased by payments and increased by
/// interest capitalization; it never goes below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub member_id: MemberId,
    /// original principal; fixed at origination
    pub principal: Money,
    pub description: String,
    pub annual_rate: Rate,
    /// principal x rate / 12, computed once at origination
    pub monthly_interest: Money,
    pub total_payable: Money,
    pub remaining_amount: Money,
    pub status: LoanStatus,
    pub due_date: DateTime<Utc>,
    /// last time interest was capitalized into the balance
    pub last_compound_date: DateTime<Utc>,
    /// cumulative whole months compounded over the loan's life
    pub compounding_months: u32,
    pub originated_at: DateTime<Utc>,
}

impl Loan {
    /// create an active loan with the first month's interest already
    /// capitalized into the payable balance
    pub fn originate(
        member_id: MemberId,
        principal: Money,
        description: &str,
        annual_rate: Rate,
        now: DateTime<Utc>,
        config: &LedgerConfig,
    ) -> Result<Self> {
        let limits = config.loan_limits;
        if principal < limits.minimum || principal > limits.maximum {
            return Err(LedgerError::validation(format!(
                "loan amount must be between {} and {}, got {principal}",
                limits.minimum, limits.maximum
            )));
        }

        let description = description.trim();
        let rules = config.field_rules;
        if description.len() < rules.loan_description_min
            || description.len() > rules.loan_description_max
        {
            return Err(LedgerError::validation(format!(
                "description must be between {} and {} characters",
                rules.loan_description_min, rules.loan_description_max
            )));
        }

        config.validate_rate(annual_rate)?;

        let monthly_interest = principal * annual_rate.monthly_rate().as_decimal();
        let total_payable = principal + monthly_interest;

        Ok(Self {
            id: Uuid::new_v4(),
            member_id,
            principal,
            description: description.to_string(),
            annual_rate,
            monthly_interest,
            total_payable,
            remaining_amount: total_payable,
            status: LoanStatus::Active,
            due_date: now + Months::new(1),
            last_compound_date: now,
            compounding_months: 0,
            originated_at: now,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    /// apply a payment against the remaining balance
    ///
    /// Caller must have accrued interest for the current period first, so the
    /// balance being validated against already includes newly-due interest.
    /// Returns the remaining balance after application. A balance within the
    /// settlement epsilon clamps to exactly zero and settles the loan.
    pub fn record_payment(&mut self, amount: Money, epsilon: Money) -> Result<Money> {
        if !self.is_active() {
            return Err(LedgerError::InvalidState {
                status: self.status,
            });
        }
        if !amount.is_positive() || amount > self.remaining_amount {
            return Err(LedgerError::InvalidAmount {
                amount,
                remaining: self.remaining_amount,
            });
        }

        self.remaining_amount -= amount;

        if self.remaining_amount <= epsilon {
            self.remaining_amount = Money::ZERO;
            self.status = LoanStatus::Paid;
        }

        Ok(self.remaining_amount)
    }

    /// administrative transition: an active loan may be defaulted or
    /// cancelled; paid is only reachable through payments, and no status
    /// leaves a terminal state
    pub fn transition(&mut self, new_status: LoanStatus) -> Result<LoanStatus> {
        if self.status.is_terminal() || !matches!(
            new_status,
            LoanStatus::Defaulted | LoanStatus::Cancelled
        ) {
            return Err(LedgerError::InvalidState {
                status: self.status,
            });
        }
        let old = self.status;
        self.status = new_status;
        Ok(old)
    }

    pub fn edit_description(&mut self, description: &str, config: &LedgerConfig) -> Result<()> {
        let description = description.trim();
        let rules = config.field_rules;
        if description.len() < rules.loan_description_min
            || description.len() > rules.loan_description_max
        {
            return Err(LedgerError::validation(format!(
                "description must be between {} and {} characters",
                rules.loan_description_min, rules.loan_description_max
            )));
        }
        self.description = description.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> LedgerConfig {
        LedgerConfig::standard()
    }

    fn originate(principal: i64) -> Loan {
        Loan::originate(
            Uuid::new_v4(),
            Money::from_major(principal),
            "school fees for the term",
            Rate::from_percentage(20),
            Utc::now(),
            &config(),
        )
        .unwrap()
    }

    #[test]
    fn test_origination_capitalizes_first_month() {
        let loan = originate(1_000);

        assert_eq!(loan.monthly_interest.round_dp(2), Money::from_str_exact("16.67").unwrap());
        assert_eq!(loan.total_payable.round_dp(2), Money::from_str_exact("1016.67").unwrap());
        assert_eq!(loan.remaining_amount, loan.total_payable);
        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.compounding_months, 0);
    }

    #[test]
    fn test_principal_bounds() {
        let make = |amount: i64| {
            Loan::originate(
                Uuid::new_v4(),
                Money::from_major(amount),
                "a valid description",
                Rate::from_percentage(20),
                Utc::now(),
                &config(),
            )
        };
        assert!(make(99).is_err());
        assert!(make(100).is_ok());
        assert!(make(1_000_000).is_ok());
        assert!(make(1_000_001).is_err());
    }

    #[test]
    fn test_description_bounds() {
        let result = Loan::originate(
            Uuid::new_v4(),
            Money::from_major(500),
            "shrt",
            Rate::from_percentage(20),
            Utc::now(),
            &config(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_full_payment_settles_exactly() {
        let mut loan = originate(1_000);
        let balance = loan.remaining_amount;

        let after = loan.record_payment(balance, Money::EPSILON).unwrap();
        assert_eq!(after, Money::ZERO);
        assert_eq!(loan.remaining_amount, Money::ZERO);
        assert_eq!(loan.status, LoanStatus::Paid);
    }

    #[test]
    fn test_residue_within_epsilon_clamps_to_zero() {
        let mut loan = originate(1_000);
        let almost = loan.remaining_amount - Money::from_str_exact("0.005").unwrap();

        loan.record_payment(almost, Money::EPSILON).unwrap();
        assert_eq!(loan.remaining_amount, Money::ZERO);
        assert_eq!(loan.status, LoanStatus::Paid);
    }

    #[test]
    fn test_partial_payment_keeps_loan_active() {
        let mut loan = originate(1_000);

        let after = loan
            .record_payment(Money::from_major(500), Money::EPSILON)
            .unwrap();
        assert_eq!(after.round_dp(2), Money::from_str_exact("516.67").unwrap());
        assert_eq!(loan.status, LoanStatus::Active);
    }

    #[test]
    fn test_overpayment_rejected() {
        let mut loan = originate(1_000);
        let too_much = loan.remaining_amount + Money::ONE;

        let result = loan.record_payment(too_much, Money::EPSILON);
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
        assert_eq!(loan.status, LoanStatus::Active);
    }

    #[test]
    fn test_payment_on_settled_loan_rejected() {
        let mut loan = originate(1_000);
        let balance = loan.remaining_amount;
        loan.record_payment(balance, Money::EPSILON).unwrap();

        let result = loan.record_payment(Money::ONE, Money::EPSILON);
        assert!(matches!(result, Err(LedgerError::InvalidState { .. })));
    }

    #[test]
    fn test_administrative_transitions() {
        let mut loan = originate(1_000);
        assert!(loan.transition(LoanStatus::Paid).is_err());
        assert_eq!(loan.transition(LoanStatus::Defaulted).unwrap(), LoanStatus::Active);

        // terminal states admit no further transitions
        assert!(loan.transition(LoanStatus::Cancelled).is_err());
        assert!(loan.transition(LoanStatus::Defaulted).is_err());
    }
}
