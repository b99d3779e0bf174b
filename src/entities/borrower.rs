// 🧑‍🌾 Borrower Entity
//
// Identity: borrower_id ("B001", "B002", ...)
// Contact fields are PII and are redacted before logging.

use serde::{Deserialize, Serialize};

// ============================================================================
// FARM TYPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FarmType {
    Crop,
    Livestock,
    Mixed,
    /// Anything the dataset carries that we don't model explicitly
    #[serde(other)]
    Other,
}

impl FarmType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FarmType::Crop => "Crop",
            FarmType::Livestock => "Livestock",
            FarmType::Mixed => "Mixed",
            FarmType::Other => "Other",
        }
    }
}

// ============================================================================
// BORROWER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrower {
    pub borrower_id: String,
    pub first_name: String,
    pub last_name: String,

    // Contact fields
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,

    // Underwriting inputs
    pub credit_score: u32,
    /// Annual income in USD
    pub income: f64,
    /// Farm size in acres
    pub farm_size: f64,
    pub farm_type: FarmType,
}

impl Borrower {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
