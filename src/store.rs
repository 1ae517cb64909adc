use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::decimal::Money;
use crate::entities::{Contribution, Loan, Member, Payment};
use crate::errors::{LedgerError, Result};
use crate::types::{ContributionId, LoanId, LoanStatus, MemberId, Month, PaymentId};

/// in-memory document store for the four ledger collections
///
/// Collections sit behind their own read-write locks; the unique indexes
/// ((member, month) for contributions, case-folded name for members) are
/// maintained under the same write lock as the insert they guard, so the
/// constraint check and the write are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    members: RwLock<HashMap<MemberId, Member>>,
    contributions: RwLock<HashMap<ContributionId, Contribution>>,
    loans: RwLock<HashMap<LoanId, Loan>>,
    payments: RwLock<HashMap<PaymentId, Payment>>,
    month_index: RwLock<HashSet<(MemberId, Month)>>,
    name_index: RwLock<HashMap<String, MemberId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- members ----

    pub fn insert_member(&self, member: Member) -> Result<()> {
        let mut names = self.name_index.write();
        let key = member.name_key();
        if names.contains_key(&key) {
            return Err(LedgerError::DuplicateName { name: member.name });
        }
        names.insert(key, member.id);
        self.members.write().insert(member.id, member);
        Ok(())
    }

    pub fn update_member(&self, member: Member) -> Result<()> {
        let mut members = self.members.write();
        let existing = members.get(&member.id).ok_or(LedgerError::NotFound {
            entity: "member",
            id: member.id,
        })?;

        let old_key = existing.name_key();
        let new_key = member.name_key();
        if old_key != new_key {
            let mut names = self.name_index.write();
            if let Some(holder) = names.get(&new_key) {
                if *holder != member.id {
                    return Err(LedgerError::DuplicateName { name: member.name });
                }
            }
            names.remove(&old_key);
            names.insert(new_key, member.id);
        }
        members.insert(member.id, member);
        Ok(())
    }

    pub fn find_member(&self, id: MemberId) -> Result<Member> {
        self.members
            .read()
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound {
                entity: "member",
                id,
            })
    }

    pub fn members(&self) -> Vec<Member> {
        self.members.read().values().cloned().collect()
    }

    pub fn member_count(&self) -> usize {
        self.members.read().len()
    }

    // ---- contributions ----

    /// insert honoring the one-contribution-per-(member, month) constraint
    pub fn insert_contribution(&self, contribution: Contribution) -> Result<()> {
        let mut index = self.month_index.write();
        let key = (contribution.member_id, contribution.month);
        if !index.insert(key) {
            return Err(LedgerError::DuplicateMonth {
                member_id: contribution.member_id,
                month: contribution.month,
            });
        }
        self.contributions
            .write()
            .insert(contribution.id, contribution);
        Ok(())
    }

    /// member and month are immutable, so no index maintenance here
    pub fn update_contribution(&self, contribution: Contribution) -> Result<()> {
        let mut contributions = self.contributions.write();
        if !contributions.contains_key(&contribution.id) {
            return Err(LedgerError::NotFound {
                entity: "contribution",
                id: contribution.id,
            });
        }
        contributions.insert(contribution.id, contribution);
        Ok(())
    }

    pub fn delete_contribution(&self, id: ContributionId) -> Result<Contribution> {
        let removed =
            self.contributions
                .write()
                .remove(&id)
                .ok_or(LedgerError::NotFound {
                    entity: "contribution",
                    id,
                })?;
        self.month_index
            .write()
            .remove(&(removed.member_id, removed.month));
        Ok(removed)
    }

    pub fn find_contribution(&self, id: ContributionId) -> Result<Contribution> {
        self.contributions
            .read()
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound {
                entity: "contribution",
                id,
            })
    }

    pub fn contributions(&self) -> Vec<Contribution> {
        self.contributions.read().values().cloned().collect()
    }

    pub fn contributions_for(&self, member_id: MemberId) -> Vec<Contribution> {
        self.contributions
            .read()
            .values()
            .filter(|c| c.member_id == member_id)
            .cloned()
            .collect()
    }

    pub fn contributions_in(&self, month: Month) -> Vec<Contribution> {
        self.contributions
            .read()
            .values()
            .filter(|c| c.month == month)
            .cloned()
            .collect()
    }

    pub fn total_contributions(&self) -> Money {
        self.contributions.read().values().map(|c| c.amount).sum()
    }

    pub fn total_contributions_for(&self, member_id: MemberId) -> Money {
        self.contributions
            .read()
            .values()
            .filter(|c| c.member_id == member_id)
            .map(|c| c.amount)
            .sum()
    }

    // ---- loans ----

    pub fn insert_loan(&self, loan: Loan) {
        self.loans.write().insert(loan.id, loan);
    }

    pub fn update_loan(&self, loan: Loan) -> Result<()> {
        let mut loans = self.loans.write();
        if !loans.contains_key(&loan.id) {
            return Err(LedgerError::NotFound {
                entity: "loan",
                id: loan.id,
            });
        }
        loans.insert(loan.id, loan);
        Ok(())
    }

    pub fn find_loan(&self, id: LoanId) -> Result<Loan> {
        self.loans
            .read()
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound { entity: "loan", id })
    }

    pub fn loans(&self) -> Vec<Loan> {
        self.loans.read().values().cloned().collect()
    }

    pub fn loans_for(&self, member_id: MemberId) -> Vec<Loan> {
        self.loans
            .read()
            .values()
            .filter(|l| l.member_id == member_id)
            .cloned()
            .collect()
    }

    pub fn loans_with_status(&self, status: LoanStatus) -> Vec<Loan> {
        self.loans
            .read()
            .values()
            .filter(|l| l.status == status)
            .cloned()
            .collect()
    }

    pub fn active_loan_count_for(&self, member_id: MemberId) -> usize {
        self.loans
            .read()
            .values()
            .filter(|l| l.member_id == member_id && l.is_active())
            .count()
    }

    /// sum of original principal over active loans; the pool's capital at risk
    pub fn total_active_principal(&self) -> Money {
        self.loans
            .read()
            .values()
            .filter(|l| l.is_active())
            .map(|l| l.principal)
            .sum()
    }

    /// principal over all of a member's loans, any status
    pub fn total_loan_principal_for(&self, member_id: MemberId) -> Money {
        self.loans
            .read()
            .values()
            .filter(|l| l.member_id == member_id)
            .map(|l| l.principal)
            .sum()
    }

    /// remaining balance over a member's active loans only
    pub fn total_payable_for(&self, member_id: MemberId) -> Money {
        self.loans
            .read()
            .values()
            .filter(|l| l.member_id == member_id && l.is_active())
            .map(|l| l.remaining_amount)
            .sum()
    }

    // ---- payments ----

    pub fn insert_payment(&self, payment: Payment) {
        self.payments.write().insert(payment.id, payment);
    }

    pub fn update_payment(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write();
        if !payments.contains_key(&payment.id) {
            return Err(LedgerError::NotFound {
                entity: "payment",
                id: payment.id,
            });
        }
        payments.insert(payment.id, payment);
        Ok(())
    }

    pub fn delete_payment(&self, id: PaymentId) -> Result<Payment> {
        self.payments
            .write()
            .remove(&id)
            .ok_or(LedgerError::NotFound {
                entity: "payment",
                id,
            })
    }

    pub fn find_payment(&self, id: PaymentId) -> Result<Payment> {
        self.payments
            .read()
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound {
                entity: "payment",
                id,
            })
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.payments.read().values().cloned().collect()
    }

    pub fn completed_payments_for_loan(&self, loan_id: LoanId) -> Vec<Payment> {
        self.payments
            .read()
            .values()
            .filter(|p| p.loan_id == loan_id && p.is_completed())
            .cloned()
            .collect()
    }

    pub fn completed_payments_for_member(&self, member_id: MemberId) -> Vec<Payment> {
        self.payments
            .read()
            .values()
            .filter(|p| p.member_id == member_id && p.is_completed())
            .cloned()
            .collect()
    }

    pub fn completed_payments_in(&self, month: Month) -> Vec<Payment> {
        self.payments
            .read()
            .values()
            .filter(|p| p.is_completed() && Month::from_datetime(p.recorded_at) == month)
            .cloned()
            .collect()
    }

    pub fn total_completed_payments(&self) -> Money {
        self.payments
            .read()
            .values()
            .filter(|p| p.is_completed())
            .map(|p| p.amount)
            .sum()
    }

    pub fn total_completed_payments_for_loan(&self, loan_id: LoanId) -> Money {
        self.payments
            .read()
            .values()
            .filter(|p| p.loan_id == loan_id && p.is_completed())
            .map(|p| p.amount)
            .sum()
    }

    pub fn total_completed_payments_for_member(&self, member_id: MemberId) -> Money {
        self.payments
            .read()
            .values()
            .filter(|p| p.member_id == member_id && p.is_completed())
            .map(|p| p.amount)
            .sum()
    }
}

/// per-entity write serialization
///
/// Every read-modify-write on a loan or member runs under that entity's
/// mutex, so concurrent payments against one loan (or concurrent rollup
/// recomputes for one member) cannot lose updates.
#[derive(Debug, Default)]
pub struct EntityLocks {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::decimal::Rate;
    use crate::types::PaymentMethod;
    use chrono::Utc;

    fn store_with_member(name: &str) -> (MemoryStore, Member) {
        let store = MemoryStore::new();
        let member = Member::register(
            name,
            None,
            Utc::now(),
            &LedgerConfig::standard().field_rules,
        )
        .unwrap();
        store.insert_member(member.clone()).unwrap();
        (store, member)
    }

    fn contribution(member_id: MemberId, amount: i64, month: &str) -> Contribution {
        Contribution::record(
            member_id,
            Money::from_major(amount),
            month.parse().unwrap(),
            None,
            PaymentMethod::Cash,
            None,
            Utc::now(),
            &LedgerConfig::standard().field_rules,
        )
        .unwrap()
    }

    #[test]
    fn test_member_names_unique_case_insensitively() {
        let (store, _) = store_with_member("Asha Rao");
        let dup = Member::register(
            "ASHA rao",
            None,
            Utc::now(),
            &LedgerConfig::standard().field_rules,
        )
        .unwrap();

        let result = store.insert_member(dup);
        assert!(matches!(result, Err(LedgerError::DuplicateName { .. })));
    }

    #[test]
    fn test_rename_releases_old_name() {
        let (store, mut member) = store_with_member("Asha Rao");
        member
            .rename("Asha R", &LedgerConfig::standard().field_rules)
            .unwrap();
        store.update_member(member).unwrap();

        let reuse = Member::register(
            "Asha Rao",
            None,
            Utc::now(),
            &LedgerConfig::standard().field_rules,
        )
        .unwrap();
        assert!(store.insert_member(reuse).is_ok());
    }

    #[test]
    fn test_duplicate_month_rejected() {
        let (store, member) = store_with_member("Asha Rao");

        store
            .insert_contribution(contribution(member.id, 500, "2024-01"))
            .unwrap();
        let result = store.insert_contribution(contribution(member.id, 300, "2024-01"));

        assert!(matches!(result, Err(LedgerError::DuplicateMonth { .. })));
        // a different month is fine
        store
            .insert_contribution(contribution(member.id, 300, "2024-02"))
            .unwrap();
    }

    #[test]
    fn test_delete_frees_month_slot() {
        let (store, member) = store_with_member("Asha Rao");
        let c = contribution(member.id, 500, "2024-01");
        store.insert_contribution(c.clone()).unwrap();
        store.delete_contribution(c.id).unwrap();

        assert!(store
            .insert_contribution(contribution(member.id, 200, "2024-01"))
            .is_ok());
    }

    #[test]
    fn test_aggregates() {
        let (store, member) = store_with_member("Asha Rao");
        store
            .insert_contribution(contribution(member.id, 500, "2024-01"))
            .unwrap();
        store
            .insert_contribution(contribution(member.id, 700, "2024-02"))
            .unwrap();

        let config = LedgerConfig::standard();
        let loan = Loan::originate(
            member.id,
            Money::from_major(1_000),
            "a new bicycle for deliveries",
            Rate::from_percentage(20),
            Utc::now(),
            &config,
        )
        .unwrap();
        store.insert_loan(loan.clone());

        assert_eq!(store.total_contributions(), Money::from_major(1_200));
        assert_eq!(store.total_contributions_for(member.id), Money::from_major(1_200));
        assert_eq!(store.total_active_principal(), Money::from_major(1_000));
        assert_eq!(store.total_payable_for(member.id), loan.remaining_amount);
        assert_eq!(store.active_loan_count_for(member.id), 1);
    }

    #[test]
    fn test_entity_locks_hand_out_one_mutex_per_id() {
        let locks = EntityLocks::new();
        let id = Uuid::new_v4();

        let a = locks.lock_for(id);
        let b = locks.lock_for(id);
        assert!(Arc::ptr_eq(&a, &b));

        let other = locks.lock_for(Uuid::new_v4());
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
