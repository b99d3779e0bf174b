// Payment Entity - loan_id is a foreign key into loans

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[serde(rename = "On Time")]
    OnTime,
    Late,
    Missed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: String,
    pub loan_id: String,
    pub payment_date: NaiveDate,
    pub amount: f64,
    pub status: PaymentStatus,
}

impl Payment {
    pub fn is_late(&self) -> bool {
        self.status == PaymentStatus::Late
    }

    pub fn is_on_time(&self) -> bool {
        self.status == PaymentStatus::OnTime
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_wire_names() {
        let payment: Payment = serde_json::from_value(serde_json::json!({
            "payment_id": "P001",
            "loan_id": "L001",
            "payment_date": "2024-03-15",
            "amount": 1250.0,
            "status": "On Time"
        }))
        .unwrap();

        assert!(payment.is_on_time());
        assert!(!payment.is_late());

        let value = serde_json::to_value(&payment).unwrap();
        assert_eq!(value["status"], "On Time");
        assert_eq!(value["payment_date"], "2024-03-15");
    }
}
