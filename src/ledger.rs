use serde::{Deserialize, Serialize};
use std::sync::Arc;

use hourglass_rs::SafeTimeProvider;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::decimal::{Money, Rate};
use crate::entities::{Contribution, Loan, Member, MemberTotals, Payment};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::funds::{available_funds, FundsSummary};
use crate::interest;
use crate::store::{EntityLocks, MemoryStore};
use crate::types::{
    ContributionId, LoanId, LoanStatus, MemberId, Month, PaymentId, PaymentKind, PaymentMethod,
    PaymentStatus,
};

/// outcome of the bulk compounding sweep
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompoundSweep {
    /// loans whose balance actually grew
    pub compounded: usize,
    /// active loans visited
    pub visited: usize,
    /// loans that errored; the sweep continues past them
    pub failed: usize,
}

/// one member's financial position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub member: Member,
    pub active_loans: usize,
    pub total_payments_made: Money,
}

/// headline numbers for the whole fund
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_members: usize,
    pub contributions_this_month: Money,
    pub total_contributions: Money,
    pub active_loan_count: usize,
    pub total_outstanding: Money,
    pub total_payments: Money,
    pub funds: FundsSummary,
}

/// contribution volume for one month of a year's series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyContributionStat {
    pub month: Month,
    pub total: Money,
    pub count: usize,
}

/// the shared-fund ledger: members, contributions, loans, payments
///
/// This is the application-service layer: every operation runs
/// validate -> mutate -> persist -> recompute as explicit calls, emits events
/// into the event store, and serializes read-modify-write sequences per
/// entity. Loan approval checks and reserves pool funds under a single lock
/// so concurrent approvals cannot double-spend the pool.
pub struct Ledger {
    store: Arc<MemoryStore>,
    config: LedgerConfig,
    time: SafeTimeProvider,
    events: Mutex<EventStore>,
    loan_locks: EntityLocks,
    member_locks: EntityLocks,
    pool: Mutex<()>,
}

impl Ledger {
    pub fn new(config: LedgerConfig, time: SafeTimeProvider) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config, time)
    }

    pub fn with_store(store: Arc<MemoryStore>, config: LedgerConfig, time: SafeTimeProvider) -> Self {
        Self {
            store,
            config,
            time,
            events: Mutex::new(EventStore::new()),
            loan_locks: EntityLocks::new(),
            member_locks: EntityLocks::new(),
            pool: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// drain events emitted since the last call
    pub fn take_events(&self) -> Vec<Event> {
        self.events.lock().take_events()
    }

    fn emit(&self, event: Event) {
        self.events.lock().emit(event);
    }

    // ---- members ----

    pub fn register_member(&self, name: &str, email: Option<&str>) -> Result<Member> {
        let now = self.time.now();
        let member = Member::register(name, email, now, &self.config.field_rules)?;
        self.store.insert_member(member.clone())?;

        info!(member = %member.name, id = %member.id, "member registered");
        self.emit(Event::MemberRegistered {
            member_id: member.id,
            name: member.name.clone(),
            timestamp: now,
        });
        Ok(member)
    }

    /// update name and/or email; either field left `None` is unchanged
    pub fn update_member(
        &self,
        member_id: MemberId,
        name: Option<&str>,
        email: Option<&str>,
    ) -> Result<Member> {
        let handle = self.member_locks.lock_for(member_id);
        let _guard = handle.lock();

        let mut member = self.store.find_member(member_id)?;
        if let Some(name) = name {
            member.rename(name, &self.config.field_rules)?;
        }
        if email.is_some() {
            member.set_email(email)?;
        }
        self.store.update_member(member.clone())?;
        Ok(member)
    }

    /// soft delete; refused while the member has any active loan
    pub fn deactivate_member(&self, member_id: MemberId) -> Result<Member> {
        let handle = self.member_locks.lock_for(member_id);
        let _guard = handle.lock();

        let mut member = self.store.find_member(member_id)?;
        if self.store.active_loan_count_for(member_id) > 0 {
            return Err(LedgerError::validation(
                "cannot deactivate member with active loans",
            ));
        }
        member.is_active = false;
        self.store.update_member(member.clone())?;

        info!(member = %member.name, "member deactivated");
        self.emit(Event::MemberDeactivated {
            member_id,
            timestamp: self.time.now(),
        });
        Ok(member)
    }

    /// recompute the member's cached rollups from the live records
    pub fn recompute_member_totals(&self, member_id: MemberId) -> Result<Member> {
        let handle = self.member_locks.lock_for(member_id);
        let _guard = handle.lock();
        self.recompute_totals_locked(member_id)
    }

    /// caller already holds the member lock
    fn recompute_totals_locked(&self, member_id: MemberId) -> Result<Member> {
        let mut member = self.store.find_member(member_id)?;
        let totals = MemberTotals {
            total_contributions: self.store.total_contributions_for(member_id),
            total_loans: self.store.total_loan_principal_for(member_id),
            total_payable: self.store.total_payable_for(member_id),
        };
        member.apply_totals(totals);
        self.store.update_member(member.clone())?;

        debug!(
            member = %member.name,
            contributions = %totals.total_contributions,
            loans = %totals.total_loans,
            payable = %totals.total_payable,
            "member totals recomputed"
        );
        self.emit(Event::MemberTotalsRecomputed {
            member_id,
            total_contributions: totals.total_contributions,
            total_loans: totals.total_loans,
            total_payable: totals.total_payable,
        });
        Ok(member)
    }

    // ---- contributions ----

    pub fn create_contribution(
        &self,
        member_id: MemberId,
        amount: Money,
        month: Option<Month>,
        description: Option<&str>,
        method: Option<PaymentMethod>,
        reference: Option<&str>,
    ) -> Result<Contribution> {
        self.store.find_member(member_id)?;

        let now = self.time.now();
        let month = month.unwrap_or_else(|| Month::from_datetime(now));
        let contribution = Contribution::record(
            member_id,
            amount,
            month,
            description,
            method.unwrap_or_default(),
            reference,
            now,
            &self.config.field_rules,
        )?;
        self.store.insert_contribution(contribution.clone())?;
        self.recompute_member_totals(member_id)?;

        info!(member = %member_id, %amount, %month, "contribution recorded");
        self.emit(Event::ContributionRecorded {
            contribution_id: contribution.id,
            member_id,
            amount,
            month,
            timestamp: now,
        });
        Ok(contribution)
    }

    /// edit amount/description/method/reference; member and month are fixed
    pub fn update_contribution(
        &self,
        contribution_id: ContributionId,
        amount: Option<Money>,
        description: Option<&str>,
        method: Option<PaymentMethod>,
        reference: Option<&str>,
    ) -> Result<Contribution> {
        let mut contribution = self.store.find_contribution(contribution_id)?;
        contribution.edit(amount, description, method, reference, &self.config.field_rules)?;
        self.store.update_contribution(contribution.clone())?;
        self.recompute_member_totals(contribution.member_id)?;
        Ok(contribution)
    }

    pub fn delete_contribution(&self, contribution_id: ContributionId) -> Result<Contribution> {
        let removed = self.store.delete_contribution(contribution_id)?;
        self.recompute_member_totals(removed.member_id)?;

        self.emit(Event::ContributionRemoved {
            contribution_id,
            member_id: removed.member_id,
            amount: removed.amount,
            month: removed.month,
            timestamp: self.time.now(),
        });
        Ok(removed)
    }

    // ---- loans ----

    /// approve a loan against the pool
    ///
    /// The availability check and the insert happen under the pool lock, so
    /// two racing approvals cannot both lend the same capital.
    pub fn create_loan(
        &self,
        member_id: MemberId,
        amount: Money,
        description: &str,
        rate: Option<Rate>,
    ) -> Result<Loan> {
        self.store.find_member(member_id)?;

        let now = self.time.now();
        let rate = rate.unwrap_or(self.config.default_annual_rate);
        let loan = Loan::originate(member_id, amount, description, rate, now, &self.config)?;

        let funds = {
            let _pool = self.pool.lock();
            let funds = available_funds(&self.store);
            if !funds.can_approve(amount) {
                return Err(LedgerError::InsufficientFunds {
                    available: funds.available,
                    requested: amount,
                });
            }
            self.store.insert_loan(loan.clone());
            funds
        };
        self.recompute_member_totals(member_id)?;

        info!(
            member = %member_id,
            principal = %loan.principal,
            payable = %loan.total_payable,
            "loan approved"
        );
        self.emit(Event::LoanApproved {
            loan_id: loan.id,
            member_id,
            principal: loan.principal,
            total_payable: loan.total_payable,
            available_before: funds.available,
            timestamp: now,
        });
        Ok(loan)
    }

    /// lazily capitalize any whole months of interest due on one loan
    pub fn apply_compound_interest(&self, loan_id: LoanId) -> Result<Loan> {
        let handle = self.loan_locks.lock_for(loan_id);
        let _guard = handle.lock();

        let mut loan = self.store.find_loan(loan_id)?;
        let outcome = self.accrue_locked(&mut loan)?;
        if outcome.months_applied > 0 {
            self.recompute_member_totals(loan.member_id)?;
        }
        Ok(loan)
    }

    /// accrue on an already-locked loan, persisting when anything changed
    fn accrue_locked(&self, loan: &mut Loan) -> Result<interest::CompoundingOutcome> {
        let now = self.time.now();
        let outcome = interest::apply_compound_interest(loan, now);
        if outcome.months_applied > 0 {
            self.store.update_loan(loan.clone())?;
            debug!(
                loan = %loan.id,
                months = outcome.months_applied,
                interest = %outcome.interest_added(),
                "interest compounded"
            );
            self.emit(Event::InterestCompounded {
                loan_id: loan.id,
                months: outcome.months_applied,
                old_balance: outcome.old_balance,
                new_balance: outcome.new_balance,
                timestamp: now,
            });
        }
        Ok(outcome)
    }

    /// compound every active loan, independently and sequentially
    ///
    /// Best-effort: one loan failing never aborts the sweep.
    pub fn compound_all_active(&self) -> CompoundSweep {
        let mut sweep = CompoundSweep::default();
        for loan in self.store.loans_with_status(LoanStatus::Active) {
            sweep.visited += 1;
            let handle = self.loan_locks.lock_for(loan.id);
            let _guard = handle.lock();

            let result = self
                .store
                .find_loan(loan.id)
                .and_then(|mut fresh| {
                    let outcome = self.accrue_locked(&mut fresh)?;
                    if outcome.months_applied > 0 {
                        self.recompute_member_totals(fresh.member_id)?;
                    }
                    Ok(outcome)
                });
            match result {
                Ok(outcome) if outcome.months_applied > 0 => sweep.compounded += 1,
                Ok(_) => {}
                Err(error) => {
                    warn!(loan = %loan.id, %error, "compounding sweep skipped loan");
                    sweep.failed += 1;
                }
            }
        }
        info!(
            visited = sweep.visited,
            compounded = sweep.compounded,
            failed = sweep.failed,
            "compounding sweep finished"
        );
        sweep
    }

    /// edit the description and/or apply an administrative status change
    pub fn update_loan(
        &self,
        loan_id: LoanId,
        description: Option<&str>,
        status: Option<LoanStatus>,
    ) -> Result<Loan> {
        let handle = self.loan_locks.lock_for(loan_id);
        let _guard = handle.lock();

        let mut loan = self.store.find_loan(loan_id)?;
        if let Some(description) = description {
            loan.edit_description(description, &self.config)?;
        }
        let mut status_changed = false;
        if let Some(new_status) = status {
            let old = loan.transition(new_status)?;
            status_changed = true;
            self.emit(Event::LoanStatusChanged {
                loan_id,
                old_status: old,
                new_status,
                timestamp: self.time.now(),
            });
        }
        self.store.update_loan(loan.clone())?;
        if status_changed {
            // leaving active zeroes this loan's share of the member's payable
            self.recompute_member_totals(loan.member_id)?;
        }
        Ok(loan)
    }

    // ---- payments ----

    /// record a settled payment against an active loan
    ///
    /// Interest is accrued for the current period first, so validation sees a
    /// balance that already includes newly-due interest. For a full payment
    /// the caller's amount is a display hint only: the charge is always the
    /// exact remaining balance at validation time. A balance driven within
    /// the settlement epsilon clamps to zero and settles the loan.
    pub fn record_payment(
        &self,
        loan_id: LoanId,
        amount: Money,
        kind: PaymentKind,
        note: Option<&str>,
        method: Option<PaymentMethod>,
        reference: Option<&str>,
    ) -> Result<Payment> {
        let handle = self.loan_locks.lock_for(loan_id);
        let _guard = handle.lock();

        let mut loan = self.store.find_loan(loan_id)?;
        if !loan.is_active() {
            return Err(LedgerError::InvalidState {
                status: loan.status,
            });
        }

        self.accrue_locked(&mut loan)?;

        let effective = match kind {
            PaymentKind::Full => loan.remaining_amount,
            PaymentKind::Partial => amount,
        };
        let remaining_after =
            loan.record_payment(effective, self.config.settlement_epsilon)?;

        let now = self.time.now();
        let payment = Payment::record(
            loan_id,
            loan.member_id,
            effective,
            kind,
            note,
            method.unwrap_or_default(),
            reference,
            remaining_after,
            now,
            &self.config.field_rules,
        )?;

        self.store.insert_payment(payment.clone());
        self.store.update_loan(loan.clone())?;
        self.recompute_member_totals(loan.member_id)?;

        info!(
            loan = %loan_id,
            amount = %effective,
            remaining = %remaining_after,
            "payment received"
        );
        self.emit(Event::PaymentReceived {
            payment_id: payment.id,
            loan_id,
            member_id: loan.member_id,
            amount: effective,
            remaining_after,
            timestamp: now,
        });
        if loan.status == LoanStatus::Paid {
            info!(loan = %loan_id, "loan settled");
            self.emit(Event::LoanSettled {
                loan_id,
                member_id: loan.member_id,
                timestamp: now,
            });
        }
        Ok(payment)
    }

    /// stage a payment without touching the loan; it takes effect when
    /// completed via [`Ledger::update_payment_status`]
    pub fn stage_payment(
        &self,
        loan_id: LoanId,
        amount: Money,
        kind: PaymentKind,
        note: Option<&str>,
        method: Option<PaymentMethod>,
        reference: Option<&str>,
    ) -> Result<Payment> {
        let handle = self.loan_locks.lock_for(loan_id);
        let _guard = handle.lock();

        let loan = self.store.find_loan(loan_id)?;
        if !loan.is_active() {
            return Err(LedgerError::InvalidState {
                status: loan.status,
            });
        }
        if !amount.is_positive() || amount > loan.remaining_amount {
            return Err(LedgerError::InvalidAmount {
                amount,
                remaining: loan.remaining_amount,
            });
        }

        let mut payment = Payment::record(
            loan_id,
            loan.member_id,
            amount,
            kind,
            note,
            method.unwrap_or_default(),
            reference,
            loan.remaining_amount - amount,
            self.time.now(),
            &self.config.field_rules,
        )?;
        payment.status = PaymentStatus::Pending;
        self.store.insert_payment(payment.clone());
        Ok(payment)
    }

    /// administrative transition for a staged payment; completing it applies
    /// the amount to the loan through the normal payment path
    pub fn update_payment_status(
        &self,
        payment_id: PaymentId,
        new_status: PaymentStatus,
    ) -> Result<Payment> {
        let mut payment = self.store.find_payment(payment_id)?;
        let loan_handle = self.loan_locks.lock_for(payment.loan_id);
        let _loan_guard = loan_handle.lock();

        let old = payment.set_status(new_status)?;

        if new_status == PaymentStatus::Completed {
            let mut loan = self.store.find_loan(payment.loan_id)?;
            if !loan.is_active() {
                return Err(LedgerError::InvalidState {
                    status: loan.status,
                });
            }
            self.accrue_locked(&mut loan)?;
            let remaining_after =
                loan.record_payment(payment.amount, self.config.settlement_epsilon)?;
            payment.remaining_after = remaining_after;

            self.store.update_payment(payment.clone())?;
            self.store.update_loan(loan.clone())?;
            self.recompute_member_totals(loan.member_id)?;

            if loan.status == LoanStatus::Paid {
                self.emit(Event::LoanSettled {
                    loan_id: loan.id,
                    member_id: loan.member_id,
                    timestamp: self.time.now(),
                });
            }
        } else {
            self.store.update_payment(payment.clone())?;
        }

        self.emit(Event::PaymentStatusChanged {
            payment_id,
            old_status: old,
            new_status,
            timestamp: self.time.now(),
        });
        Ok(payment)
    }

    /// a completed payment's effect on its loan is final; only uncompleted
    /// payments may be deleted
    pub fn delete_payment(&self, payment_id: PaymentId) -> Result<Payment> {
        let payment = self.store.find_payment(payment_id)?;
        if payment.is_completed() {
            return Err(LedgerError::validation("cannot delete completed payment"));
        }
        self.store.delete_payment(payment_id)
    }

    // ---- queries ----

    pub fn available_funds(&self) -> FundsSummary {
        available_funds(&self.store)
    }

    pub fn member_summary(&self, member_id: MemberId) -> Result<MemberSummary> {
        let member = self.store.find_member(member_id)?;
        Ok(MemberSummary {
            active_loans: self.store.active_loan_count_for(member_id),
            total_payments_made: self.store.total_completed_payments_for_member(member_id),
            member,
        })
    }

    pub fn loans_for_member(
        &self,
        member_id: MemberId,
        status: Option<LoanStatus>,
    ) -> Vec<Loan> {
        let mut loans = self.store.loans_for(member_id);
        if let Some(status) = status {
            loans.retain(|l| l.status == status);
        }
        loans
    }

    pub fn contributions_for_member(&self, member_id: MemberId) -> Vec<Contribution> {
        self.store.contributions_for(member_id)
    }

    pub fn payments_for_member(&self, member_id: MemberId) -> (Vec<Payment>, Money) {
        let payments = self.store.completed_payments_for_member(member_id);
        let total = payments.iter().map(|p| p.amount).sum();
        (payments, total)
    }

    pub fn contributions_in(&self, month: Month) -> (Vec<Contribution>, Money) {
        let contributions = self.store.contributions_in(month);
        let total = contributions.iter().map(|c| c.amount).sum();
        (contributions, total)
    }

    pub fn payments_for_loan(&self, loan_id: LoanId) -> (Vec<Payment>, Money) {
        let payments = self.store.completed_payments_for_loan(loan_id);
        let total = payments.iter().map(|p| p.amount).sum();
        (payments, total)
    }

    pub fn payments_in(&self, month: Month) -> (Vec<Payment>, Money) {
        let payments = self.store.completed_payments_in(month);
        let total = payments.iter().map(|p| p.amount).sum();
        (payments, total)
    }

    pub fn dashboard(&self) -> DashboardStats {
        let funds = self.available_funds();
        let current_month = Month::from_datetime(self.time.now());
        let active = self.store.loans_with_status(LoanStatus::Active);

        DashboardStats {
            total_members: self.store.member_count(),
            contributions_this_month: self
                .store
                .contributions_in(current_month)
                .iter()
                .map(|c| c.amount)
                .sum(),
            total_contributions: funds.total_contributions,
            active_loan_count: active.len(),
            total_outstanding: active.iter().map(|l| l.remaining_amount).sum(),
            total_payments: self.store.total_completed_payments(),
            funds,
        }
    }

    /// contribution totals per month for one calendar year, missing months
    /// filled with zeroes
    pub fn monthly_contribution_stats(&self, year: i32) -> Vec<MonthlyContributionStat> {
        (1..=12)
            .filter_map(|m| Month::new(year, m))
            .map(|month| {
                let contributions = self.store.contributions_in(month);
                MonthlyContributionStat {
                    month,
                    total: contributions.iter().map(|c| c.amount).sum(),
                    count: contributions.len(),
                }
            })
            .collect()
    }
}
