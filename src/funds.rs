use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::store::MemoryStore;
use crate::types::LoanStatus;

/// pool capital currently free to lend, with its breakdown
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundsSummary {
    pub available: Money,
    pub total_contributions: Money,
    pub total_active_loans: Money,
    pub total_interest_realized: Money,
}

impl FundsSummary {
    pub fn can_approve(&self, requested: Money) -> bool {
        requested <= self.available
    }
}

/// compute the funds available for new loans
///
/// available = all-time contributions
///           + interest realized from settled loans
///           - original principal of active loans,
/// floored at zero.
///
/// An active loan ties up its full original principal until it is closed,
/// regardless of how much has been repaid, and interest counts as income only
/// once a loan has actually settled: accrued interest on active loans is
/// paper profit, not lendable capital. Realized interest per settled loan is
/// completed payments received minus the original principal, floored at zero.
pub fn available_funds(store: &MemoryStore) -> FundsSummary {
    let total_contributions = store.total_contributions();
    let total_active_loans = store.total_active_principal();

    let total_interest_realized = store
        .loans_with_status(LoanStatus::Paid)
        .iter()
        .map(|loan| {
            (store.total_completed_payments_for_loan(loan.id) - loan.principal).max(Money::ZERO)
        })
        .sum();

    let available = (total_contributions + total_interest_realized - total_active_loans)
        .max(Money::ZERO);

    FundsSummary {
        available,
        total_contributions,
        total_active_loans,
        total_interest_realized,
    }
}
