// Entity Models - loan book records
//
// Every entity is a plain record loaded from its JSON dataset.
// Foreign keys (borrower_id, loan_id) are plain strings; resolution happens
// in the internal API layer, which reports "not found" instead of failing.

pub mod borrower;
pub mod collateral;
pub mod equipment;
pub mod loan;
pub mod payment;

pub use borrower::{Borrower, FarmType};
pub use collateral::Collateral;
pub use equipment::Equipment;
pub use loan::{Loan, LoanStatus};
pub use payment::{Payment, PaymentStatus};

/// Kind of entity an id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Borrower,
    Loan,
    Payment,
    Collateral,
    Equipment,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Borrower => "borrower",
            EntityKind::Loan => "loan",
            EntityKind::Payment => "payment",
            EntityKind::Collateral => "collateral",
            EntityKind::Equipment => "equipment",
        }
    }

    /// Capitalized label used in REST error bodies ("Borrower not found")
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Borrower => "Borrower",
            EntityKind::Loan => "Loan",
            EntityKind::Payment => "Payment",
            EntityKind::Collateral => "Collateral",
            EntityKind::Equipment => "Equipment",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
