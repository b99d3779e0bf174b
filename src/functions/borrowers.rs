// Borrower functions: profile and equipment

use super::{borrower_name, count, fetch, verify_borrower};
use crate::api::{ApiRequest, InternalApi};
use crate::error::DispatchError;
use crate::params::{ParamSpec, ParameterSchema};
use crate::registry::FunctionDescriptor;
use crate::response::FunctionResult;
use crate::validation::ValidatedArgs;
use serde_json::json;

pub fn descriptors() -> Vec<FunctionDescriptor> {
    vec![
        FunctionDescriptor::new(
            "getBorrowerDetails",
            "Get detailed information about a specific borrower",
            borrower_details,
        )
        .with_parameters(ParameterSchema::new().with_param(ParamSpec::borrower_id())),
        FunctionDescriptor::new(
            "getBorrowerEquipment",
            "Get the farm equipment owned by a specific borrower",
            borrower_equipment,
        )
        .with_parameters(ParameterSchema::new().with_param(ParamSpec::borrower_id())),
    ]
}

fn borrower_details(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let borrower_id = args.require_str("borrower_id")?;
    let borrower = verify_borrower(api, borrower_id)?;

    let credit = borrower["credit_score"].as_u64().unwrap_or(0);
    let summary = format!(
        "{} runs a {}-acre {} farm with a credit score of {}.",
        borrower_name(&borrower),
        borrower["farm_size"].as_f64().unwrap_or(0.0),
        borrower["farm_type"].as_str().unwrap_or("unspecified").to_lowercase(),
        credit,
    );

    Ok(FunctionResult::new(borrower)
        .with_summary(summary)
        .with_supplementary(json!({
            "credit_rating": credit_rating(credit),
        })))
}

fn credit_rating(score: u64) -> &'static str {
    match score {
        750.. => "excellent",
        700..=749 => "good",
        650..=699 => "fair",
        _ => "poor",
    }
}

fn borrower_equipment(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let borrower_id = args.require_str("borrower_id")?;
    let borrower = verify_borrower(api, borrower_id)?;
    let equipment = fetch(
        api,
        ApiRequest::BorrowerEquipment { id: borrower_id.to_string() },
        Some(borrower_id),
    )?;

    let n = count(&equipment);
    let total_value: f64 = equipment
        .as_array()
        .map(|items| items.iter().filter_map(|e| e["value"].as_f64()).sum())
        .unwrap_or(0.0);

    Ok(FunctionResult::new(json!({
        "borrower_id": borrower_id,
        "borrower_name": borrower_name(&borrower),
        "equipment": equipment,
        "count": n,
    }))
    .with_summary(format!(
        "{} has {} piece(s) of recorded equipment valued at ${:.2}.",
        borrower_name(&borrower),
        n,
        total_value
    ))
    .with_supplementary(json!({ "total_value": total_value })))
}
