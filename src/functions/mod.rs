// 🧩 Function handlers
//
// One module per area. Every handler that takes an id verifies the entity
// first, then fetches the computed data, then adds a summary.

pub mod advisory;
pub mod borrowers;
pub mod forecast;
pub mod loans;
pub mod risk;

use crate::api::{ApiRequest, InternalApi};
use crate::error::DispatchError;
use crate::registry::FunctionDescriptor;
use serde_json::Value;

/// Every descriptor, in no particular order
pub fn all() -> Vec<FunctionDescriptor> {
    let mut descriptors = loans::descriptors();
    descriptors.extend(borrowers::descriptors());
    descriptors.extend(risk::descriptors());
    descriptors.extend(advisory::descriptors());
    descriptors.extend(forecast::descriptors());
    descriptors
}

/// Run one internal API call, attaching `entity_id` to upstream failures
pub(crate) fn fetch(api: &dyn InternalApi, request: ApiRequest, entity_id: Option<&str>) -> Result<Value, DispatchError> {
    api.call(&request)
        .map_err(|err| DispatchError::from_api(err, entity_id))
}

pub(crate) fn verify_borrower(api: &dyn InternalApi, borrower_id: &str) -> Result<Value, DispatchError> {
    fetch(
        api,
        ApiRequest::Borrower {
            id: borrower_id.to_string(),
        },
        Some(borrower_id),
    )
}

pub(crate) fn verify_loan(api: &dyn InternalApi, loan_id: &str) -> Result<Value, DispatchError> {
    fetch(
        api,
        ApiRequest::LoanStatus {
            id: loan_id.to_string(),
        },
        Some(loan_id),
    )
}

/// "First Last" from a borrower JSON object
pub(crate) fn borrower_name(borrower: &Value) -> String {
    format!(
        "{} {}",
        borrower["first_name"].as_str().unwrap_or_default(),
        borrower["last_name"].as_str().unwrap_or_default()
    )
    .trim()
    .to_string()
}

pub(crate) fn count(value: &Value) -> usize {
    value.as_array().map(Vec::len).unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for handler tests

    use crate::api::StoreApi;
    use crate::store::DataStore;
    use chrono::NaiveDate;

    pub fn seeded_api() -> StoreApi {
        StoreApi::new(DataStore::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data")))
            .with_as_of(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
    }
}
