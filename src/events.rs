use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    ContributionId, LoanId, LoanStatus, MemberId, Month, PaymentId, PaymentStatus,
};

/// all events emitted by ledger operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // member lifecycle
    MemberRegistered {
        member_id: MemberId,
        name: String,
        timestamp: DateTime<Utc>,
    },
    MemberDeactivated {
        member_id: MemberId,
        timestamp: DateTime<Utc>,
    },
    MemberTotalsRecomputed {
        member_id: MemberId,
        total_contributions: Money,
        total_loans: Money,
        total_payable: Money,
    },

    // contribution events
    ContributionRecorded {
        contribution_id: ContributionId,
        member_id: MemberId,
        amount: Money,
        month: Month,
        timestamp: DateTime<Utc>,
    },
    ContributionRemoved {
        contribution_id: ContributionId,
        member_id: MemberId,
        amount: Money,
        month: Month,
        timestamp: DateTime<Utc>,
    },

    // loan events
    LoanApproved {
        loan_id: LoanId,
        member_id: MemberId,
        principal: Money,
        total_payable: Money,
        available_before: Money,
        timestamp: DateTime<Utc>,
    },
    InterestCompounded {
        loan_id: LoanId,
        months: u32,
        old_balance: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
    LoanSettled {
        loan_id: LoanId,
        member_id: MemberId,
        timestamp: DateTime<Utc>,
    },
    LoanStatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentReceived {
        payment_id: PaymentId,
        loan_id: LoanId,
        member_id: MemberId,
        amount: Money,
        remaining_after: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentStatusChanged {
        payment_id: PaymentId,
        old_status: PaymentStatus,
        new_status: PaymentStatus,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
