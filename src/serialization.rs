//! serialization support for the ledger

use serde::{Deserialize, Serialize};

use crate::entities::{Contribution, Loan, Member, Payment};
use crate::store::MemoryStore;

/// serializable view of the whole ledger, for export and restore
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub members: Vec<Member>,
    pub contributions: Vec<Contribution>,
    pub loans: Vec<Loan>,
    pub payments: Vec<Payment>,
}

impl LedgerSnapshot {
    pub fn from_store(store: &MemoryStore) -> Self {
        let mut snapshot = Self {
            members: store.members(),
            contributions: store.contributions(),
            loans: store.loans(),
            payments: store.payments(),
        };
        // deterministic output regardless of map iteration order
        snapshot.members.sort_by_key(|m| m.joined_at);
        snapshot.contributions.sort_by_key(|c| c.recorded_at);
        snapshot.loans.sort_by_key(|l| l.originated_at);
        snapshot.payments.sort_by_key(|p| p.recorded_at);
        snapshot
    }

    /// rebuild a store, re-running the unique-constraint checks
    pub fn restore(self) -> crate::errors::Result<MemoryStore> {
        let store = MemoryStore::new();
        for member in self.members {
            store.insert_member(member)?;
        }
        for contribution in self.contributions {
            store.insert_contribution(contribution)?;
        }
        for loan in self.loans {
            store.insert_loan(loan);
        }
        for payment in self.payments {
            store.insert_payment(payment);
        }
        Ok(store)
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
