use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{LoanStatus, Month};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: Uuid,
    },

    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("member {member_id} already contributed for {month}")]
    DuplicateMonth {
        member_id: Uuid,
        month: Month,
    },

    #[error("member with this name already exists: {name}")]
    DuplicateName {
        name: String,
    },

    #[error("loan not active: current status is {status}")]
    InvalidState {
        status: LoanStatus,
    },

    #[error("invalid payment amount: {amount} against remaining balance {remaining}")]
    InvalidAmount {
        amount: Money,
        remaining: Money,
    },

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds {
        available: Money,
        requested: Money,
    },
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
