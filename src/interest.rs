use chrono::{DateTime, Utc};

use crate::decimal::Money;
use crate::entities::Loan;
use crate::types::Month;

/// result of one compounding pass over a loan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompoundingOutcome {
    pub months_applied: u32,
    pub old_balance: Money,
    pub new_balance: Money,
}

impl CompoundingOutcome {
    fn unchanged(balance: Money) -> Self {
        Self {
            months_applied: 0,
            old_balance: balance,
            new_balance: balance,
        }
    }

    pub fn interest_added(&self) -> Money {
        self.new_balance - self.old_balance
    }
}

/// whole calendar months between two instants, by (year x 12 + month)
/// difference; days within the month never count
pub fn whole_months_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    Month::from_datetime(to).months_since(Month::from_datetime(from))
}

/// capitalize monthly compound interest into an active loan's balance
///
/// Compounds once per whole calendar month elapsed since the loan's
/// `last_compound_date`: the remaining balance grows by (1 + rate/12)^months
/// and the payable total tracks it. No-op for inactive loans and within the
/// same calendar month, which makes repeated calls in one month idempotent.
/// Mutates the loan; the caller persists it.
pub fn apply_compound_interest(loan: &mut Loan, now: DateTime<Utc>) -> CompoundingOutcome {
    if !loan.is_active() {
        return CompoundingOutcome::unchanged(loan.remaining_amount);
    }

    let elapsed = whole_months_between(loan.last_compound_date, now);
    if elapsed <= 0 {
        return CompoundingOutcome::unchanged(loan.remaining_amount);
    }
    let elapsed = elapsed as u32;

    let old_balance = loan.remaining_amount;
    let monthly_rate = loan.annual_rate.monthly_rate().as_decimal();

    loan.remaining_amount = old_balance.compound(monthly_rate, elapsed);
    loan.total_payable = loan.remaining_amount;
    loan.compounding_months += elapsed;
    loan.last_compound_date = now;

    CompoundingOutcome {
        months_applied: elapsed,
        old_balance,
        new_balance: loan.remaining_amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::decimal::Rate;
    use crate::types::LoanStatus;
    use chrono::{Duration, TimeZone};
    use hourglass_rs::{SafeTimeProvider, TimeSource};
    use uuid::Uuid;

    fn loan_at(time: &SafeTimeProvider) -> Loan {
        Loan::originate(
            Uuid::new_v4(),
            Money::from_major(1_000),
            "two months of groceries",
            Rate::from_percentage(20),
            time.now(),
            &LedgerConfig::standard(),
        )
        .unwrap()
    }

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_whole_months_ignore_days() {
        let jan31 = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let feb1 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let jan1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(whole_months_between(jan31, feb1), 1);
        assert_eq!(whole_months_between(jan1, jan31), 0);
    }

    #[test]
    fn test_no_op_within_same_month() {
        let time = test_time();
        let mut loan = loan_at(&time);
        let control = time.test_control().unwrap();

        control.advance(Duration::days(10)); // still january
        let outcome = apply_compound_interest(&mut loan, time.now());

        assert_eq!(outcome.months_applied, 0);
        assert_eq!(outcome.interest_added(), Money::ZERO);
        assert_eq!(loan.compounding_months, 0);
    }

    #[test]
    fn test_three_months_compound_in_one_call() {
        let time = test_time();
        let mut loan = loan_at(&time);
        loan.remaining_amount = Money::from_major(1_000);
        let control = time.test_control().unwrap();

        control.advance(Duration::days(92)); // mid-april
        let outcome = apply_compound_interest(&mut loan, time.now());

        assert_eq!(outcome.months_applied, 3);
        assert_eq!(
            loan.remaining_amount.round_dp(2),
            Money::from_str_exact("1050.84").unwrap()
        );
        assert_eq!(loan.total_payable, loan.remaining_amount);
        assert_eq!(loan.compounding_months, 3);
    }

    #[test]
    fn test_idempotent_within_calendar_month() {
        let time = test_time();
        let mut loan = loan_at(&time);
        let control = time.test_control().unwrap();

        control.advance(Duration::days(30)); // mid-february
        let first = apply_compound_interest(&mut loan, time.now());
        assert_eq!(first.months_applied, 1);

        let balance = loan.remaining_amount;
        control.advance(Duration::days(5)); // still february
        let second = apply_compound_interest(&mut loan, time.now());

        assert_eq!(second.months_applied, 0);
        assert_eq!(loan.remaining_amount, balance);
        assert_eq!(loan.compounding_months, 1);
    }

    #[test]
    fn test_inactive_loans_never_accrue() {
        let time = test_time();
        let mut loan = loan_at(&time);
        loan.status = LoanStatus::Cancelled;
        let balance = loan.remaining_amount;
        let control = time.test_control().unwrap();

        control.advance(Duration::days(120));
        let outcome = apply_compound_interest(&mut loan, time.now());

        assert_eq!(outcome.months_applied, 0);
        assert_eq!(loan.remaining_amount, balance);
    }

    #[test]
    fn test_balance_growth_matches_closed_form() {
        let time = test_time();
        let mut loan = loan_at(&time);
        let start = loan.remaining_amount;
        let control = time.test_control().unwrap();

        control.advance(Duration::days(160)); // five whole month boundaries
        let outcome = apply_compound_interest(&mut loan, time.now());

        assert_eq!(outcome.months_applied, 5);
        let monthly = loan.annual_rate.monthly_rate().as_decimal();
        assert_eq!(loan.remaining_amount, start.compound(monthly, 5));
    }
}
