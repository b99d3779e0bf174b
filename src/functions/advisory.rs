// Advisory functions: refinancing and restructuring options for a loan

use super::{fetch, verify_loan};
use crate::advisory::RestructuringGoal;
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
            "recommendRefinancingOptions",
            "Recommend refinancing options for a loan based on its rate, term and payment history",
            refinancing_options,
        )
        .with_parameters(ParameterSchema::new().with_param(ParamSpec::loan_id())),
        FunctionDescriptor::new(
            "recommendLoanRestructuring",
            "Recommend loan restructuring options that reduce default risk for the borrower",
            loan_restructuring,
        )
        .with_parameters(
            ParameterSchema::new().with_param(ParamSpec::loan_id()).with_param(
                ParamSpec::string("optimization_goal")
                    .with_description("Primary goal of the restructuring")
                    .with_enum(RestructuringGoal::SCHEMA_VALUES)
                    .with_default(json!("lower_payments")),
            ),
        ),
    ]
}

fn refinancing_options(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let loan_id = args.require_str("loan_id")?;

    verify_loan(api, loan_id)?;
    let result = fetch(
        api,
        ApiRequest::RefinanceOptions {
            loan_id: loan_id.to_string(),
        },
        Some(loan_id),
    )?;

    let options: Vec<&str> = result["options"]
        .as_array()
        .map(|o| o.iter().filter_map(|o| o["description"].as_str()).collect())
        .unwrap_or_default();

    let summary = if options.is_empty() {
        format!(
            "No refinancing options are recommended for loan {} at {}%.",
            loan_id, result["current_rate"]
        )
    } else {
        format!(
            "Loan {} at {}% has {} refinancing option(s): {}.",
            loan_id,
            result["current_rate"],
            options.len(),
            options.join(", ").to_lowercase()
        )
    };

    Ok(FunctionResult::new(result).with_summary(summary))
}

fn loan_restructuring(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let loan_id = args.require_str("loan_id")?;
    let goal = args
        .str("optimization_goal")
        .and_then(RestructuringGoal::parse)
        .unwrap_or_default();

    verify_loan(api, loan_id)?;
    let result = fetch(
        api,
        ApiRequest::Restructuring {
            loan_id: loan_id.to_string(),
            goal,
        },
        Some(loan_id),
    )?;

    let n = result["restructuring_options"].as_array().map(Vec::len).unwrap_or(0);
    let summary = format!(
        "Loan {} for {} has {} month(s) remaining with {} payment performance; {} restructuring option(s) for goal {}.",
        loan_id,
        result["borrower_name"].as_str().unwrap_or("unknown borrower"),
        result["remaining_term_months"],
        result["payment_performance"].as_str().unwrap_or("unknown"),
        n,
        goal.as_str(),
    );

    Ok(FunctionResult::new(result.clone())
        .with_summary(summary)
        .with_supplementary(json!({
            "current_balance": result["current_balance"],
            "recommendation_count": result["recommendations"].as_array().map(Vec::len).unwrap_or(0),
        })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::seeded_api;
    use crate::validation::Validator;
    use serde_json::Value;

    fn args(function: &str, value: Value) -> ValidatedArgs {
        let descriptor = descriptors().into_iter().find(|d| d.name == function).unwrap();
        Validator::validate(&descriptor.parameters, &value).unwrap()
    }

    #[test]
    fn test_refinancing_summary_lists_options() {
        let result = refinancing_options(&seeded_api(), &args("recommendRefinancingOptions", json!({"loan_id": "L001"}))).unwrap();

        assert_eq!(result.data["current_term_remaining"], 42);
        assert_eq!(result.data["refinancing_recommended"], true);
        assert_eq!(
            result.summary.unwrap(),
            "Loan L001 at 3.5% has 2 refinancing option(s): lower rate refinance, shorter term refinance."
        );
    }

    #[test]
    fn test_refinancing_unknown_loan() {
        let err = refinancing_options(&seeded_api(), &args("recommendRefinancingOptions", json!({"loanId": "L999"}))).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound { ref entity_id, .. } if entity_id == "L999"));
    }

    #[test]
    fn test_restructuring_poor_history() {
        let result = loan_restructuring(
            &seeded_api(),
            &args("recommendLoanRestructuring", json!({"loan_id": "L003", "optimizationGoal": "shorter_term"})),
        )
        .unwrap();

        assert_eq!(result.data["payment_performance"], "poor");
        assert_eq!(result.data["optimization_goal"], "shorter_term");
        assert_eq!(result.data["restructuring_options"][0]["option_id"], "RESTRUCTURE-1");
        assert_eq!(
            result.data["recommendations"][0],
            "Focus on payment history improvement before refinancing for better terms."
        );
        assert!(result.summary.unwrap().contains("27 month(s) remaining"));
    }

    #[test]
    fn test_restructuring_closed_loan() {
        let result = loan_restructuring(&seeded_api(), &args("recommendLoanRestructuring", json!({"loan_id": "L006"}))).unwrap();

        assert_eq!(result.data["remaining_term_months"], 0);
        assert_eq!(result.data["restructuring_options"], json!([]));
        assert_eq!(result.data["optimization_goal"], "lower_payments");
    }
}
