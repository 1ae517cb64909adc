use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::FieldRules;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{LoanId, MemberId, PaymentId, PaymentKind, PaymentMethod, PaymentStatus};

/// a repayment applied against one loan's remaining balance
///
/// `remaining_after` snapshots the loan balance immediately after this
/// payment was applied; it is never recomputed, even if other records are
/// edited later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    pub member_id: MemberId,
    pub amount: Money,
    pub kind: PaymentKind,
    pub note: Option<String>,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub status: PaymentStatus,
    pub remaining_after: Money,
    pub recorded_at: DateTime<Utc>,
}

impl Payment {
    #[allow(clippy::too_many_arguments)]
    pub fn record(
        loan_id: LoanId,
        member_id: MemberId,
        amount: Money,
        kind: PaymentKind,
        note: Option<&str>,
        method: PaymentMethod,
        reference: Option<&str>,
        remaining_after: Money,
        now: DateTime<Utc>,
        rules: &FieldRules,
    ) -> Result<Self> {
        if !amount.is_positive() {
            return Err(LedgerError::validation(format!(
                "payment amount must be positive, got {amount}"
            )));
        }
        let note = match note.map(str::trim).filter(|n| !n.is_empty()) {
            Some(n) if n.len() > rules.note_max => {
                return Err(LedgerError::validation(format!(
                    "note cannot exceed {} characters",
                    rules.note_max
                )))
            }
            other => other.map(str::to_string),
        };
        let reference = match reference.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) if r.len() > rules.reference_max => {
                return Err(LedgerError::validation(format!(
                    "reference cannot exceed {} characters",
                    rules.reference_max
                )))
            }
            other => other.map(str::to_string),
        };

        Ok(Self {
            id: Uuid::new_v4(),
            loan_id,
            member_id,
            amount,
            kind,
            note,
            method,
            reference,
            status: PaymentStatus::default(),
            remaining_after,
            recorded_at: now,
        })
    }

    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }

    /// administrative status change; only a pending payment may move, so a
    /// completed payment's effect on its loan stays final
    pub fn set_status(&mut self, new_status: PaymentStatus) -> Result<PaymentStatus> {
        if self.status != PaymentStatus::Pending || new_status == PaymentStatus::Pending {
            return Err(LedgerError::validation(format!(
                "only pending payments can change status, this one is {}",
                self.status
            )));
        }
        let old = self.status;
        self.status = new_status;
        Ok(old)
    }
}
