// Collateral Entity - loan_id is a foreign key into loans

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collateral {
    pub collateral_id: String,
    pub loan_id: String,
    pub description: String,
    /// Appraised value in USD
    pub value: f64,
}
