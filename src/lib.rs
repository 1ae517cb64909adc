pub mod config;
pub mod decimal;
pub mod entities;
pub mod errors;
pub mod events;
pub mod funds;
pub mod interest;
pub mod ledger;
pub mod serialization;
pub mod store;
pub mod types;

// re-export key types
pub use config::{FieldRules, LedgerConfig, LoanLimits};
pub use decimal::{Money, Rate};
pub use entities::{Contribution, Loan, Member, MemberTotals, Payment};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use funds::{available_funds, FundsSummary};
pub use interest::{apply_compound_interest, whole_months_between, CompoundingOutcome};
pub use ledger::{
    CompoundSweep, DashboardStats, Ledger, MemberSummary, MonthlyContributionStat,
};
pub use serialization::LedgerSnapshot;
pub use store::{EntityLocks, MemoryStore};
pub use types::{
    ContributionId, LoanId, LoanStatus, MemberId, Month, PaymentId, PaymentKind, PaymentMethod,
    PaymentStatus,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
