pub mod contribution;
pub mod loan;
pub mod member;
pub mod payment;

pub use contribution::Contribution;
pub use loan::Loan;
pub use member::{Member, MemberTotals};
pub use payment::Payment;
