// 💵 Loan Entity
//
// Identity: loan_id ("L001", ...). borrower_id is a foreign key into borrowers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Active,
    Closed,
    Default,
    Pending,
    #[serde(other)]
    Other,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "Active",
            LoanStatus::Closed => "Closed",
            LoanStatus::Default => "Default",
            LoanStatus::Pending => "Pending",
            LoanStatus::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: String,
    pub borrower_id: String,
    pub loan_amount: f64,
    /// Annual rate in percent (3.5 = 3.5%)
    pub interest_rate: f64,
    /// Term in months
    pub term_length: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub status: LoanStatus,
    #[serde(default)]
    pub loan_type: String,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }
}
