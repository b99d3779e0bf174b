// Loan functions: details, status, payments, collateral, active book,
// per-borrower loans, summary

use super::{borrower_name, count, fetch, verify_borrower, verify_loan};
use crate::api::{ApiRequest, InternalApi};
use crate::error::DispatchError;
use crate::params::{ParamSpec, ParameterSchema};
use crate::registry::FunctionDescriptor;
use crate::response::FunctionResult;
use crate::validation::ValidatedArgs;
use serde_json::{json, Value};

pub fn descriptors() -> Vec<FunctionDescriptor> {
    vec![
        FunctionDescriptor::new(
            "getLoanDetails",
            "Get detailed information about a specific loan including borrower, payments and collateral",
            loan_details,
        )
        .with_parameters(ParameterSchema::new().with_param(ParamSpec::loan_id())),
        FunctionDescriptor::new(
            "getLoanStatus",
            "Get the current status of a specific loan",
            loan_status,
        )
        .with_parameters(ParameterSchema::new().with_param(ParamSpec::loan_id())),
        FunctionDescriptor::new(
            "getLoanPayments",
            "Get the payment history for a specific loan",
            loan_payments,
        )
        .with_parameters(ParameterSchema::new().with_param(ParamSpec::loan_id())),
        FunctionDescriptor::new(
            "getLoanCollateral",
            "Get the collateral pledged against a specific loan",
            loan_collateral,
        )
        .with_parameters(ParameterSchema::new().with_param(ParamSpec::loan_id())),
        FunctionDescriptor::new(
            "getActiveLoans",
            "Get a list of all active loans in the portfolio",
            active_loans,
        ),
        FunctionDescriptor::new(
            "getLoansByBorrower",
            "Get all loans held by a specific borrower",
            loans_by_borrower,
        )
        .with_parameters(ParameterSchema::new().with_param(ParamSpec::borrower_id())),
        FunctionDescriptor::new(
            "getLoanSummary",
            "Get summary statistics for the loan portfolio: totals, active loans and delinquency rate",
            loan_summary,
        ),
    ]
}

fn loan_details(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let loan_id = args.require_str("loan_id")?;
    let details = fetch(api, ApiRequest::LoanDetails { id: loan_id.to_string() }, Some(loan_id))?;

    let payments = count(&details["payments"]);
    let late = details["payments"]
        .as_array()
        .map(|p| p.iter().filter(|p| p["status"] == "Late").count())
        .unwrap_or(0);
    let collateral_value: f64 = details["collateral"]
        .as_array()
        .map(|c| c.iter().filter_map(|c| c["value"].as_f64()).sum())
        .unwrap_or(0.0);

    let summary = format!(
        "Loan {} for {} is {}: ${:.2} at {}% over {} months.",
        loan_id,
        borrower_name(&details["borrower"]),
        details["status"].as_str().unwrap_or("unknown"),
        details["loan_amount"].as_f64().unwrap_or(0.0),
        details["interest_rate"],
        details["term_length"],
    );

    Ok(FunctionResult::new(details)
        .with_summary(summary)
        .with_supplementary(json!({
            "payment_count": payments,
            "late_payment_count": late,
            "collateral_value": collateral_value,
        })))
}

fn loan_status(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let loan_id = args.require_str("loan_id")?;
    let status = fetch(api, ApiRequest::LoanStatus { id: loan_id.to_string() }, Some(loan_id))?;

    let summary = format!(
        "Loan {} is currently {}.",
        loan_id,
        status["status"].as_str().unwrap_or("unknown")
    );
    Ok(FunctionResult::new(status).with_summary(summary))
}

fn loan_payments(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let loan_id = args.require_str("loan_id")?;
    verify_loan(api, loan_id)?;
    let payments = fetch(api, ApiRequest::LoanPayments { id: loan_id.to_string() }, Some(loan_id))?;

    let n = count(&payments);
    let late = payments
        .as_array()
        .map(|p| p.iter().filter(|p| p["status"] == "Late").count())
        .unwrap_or(0);
    let paid: f64 = payments
        .as_array()
        .map(|p| p.iter().filter_map(|p| p["amount"].as_f64()).sum())
        .unwrap_or(0.0);

    let summary = if n == 0 {
        format!("No payments have been recorded for loan {}.", loan_id)
    } else {
        format!(
            "Loan {} has {} payment(s) totalling ${:.2}, {} of them late.",
            loan_id, n, paid, late
        )
    };

    Ok(FunctionResult::new(json!({
        "loan_id": loan_id,
        "payments": payments,
        "count": n,
    }))
    .with_summary(summary)
    .with_supplementary(json!({ "late_payment_count": late, "total_paid": paid })))
}

fn loan_collateral(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let loan_id = args.require_str("loan_id")?;
    verify_loan(api, loan_id)?;
    let collateral = fetch(api, ApiRequest::LoanCollateral { id: loan_id.to_string() }, Some(loan_id))?;

    let n = count(&collateral);
    let value: f64 = collateral
        .as_array()
        .map(|c| c.iter().filter_map(|c| c["value"].as_f64()).sum())
        .unwrap_or(0.0);

    let summary = if n == 0 {
        format!("Loan {} has no recorded collateral.", loan_id)
    } else {
        format!("Loan {} is secured by {} item(s) worth ${:.2}.", loan_id, n, value)
    };

    Ok(FunctionResult::new(json!({
        "loan_id": loan_id,
        "collateral": collateral,
        "count": n,
    }))
    .with_summary(summary)
    .with_supplementary(json!({ "total_value": value })))
}

fn active_loans(api: &dyn InternalApi, _args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let loans = fetch(api, ApiRequest::ActiveLoans, None)?;

    let n = count(&loans);
    let total: f64 = loans
        .as_array()
        .map(|l| l.iter().filter_map(|l| l["loan_amount"].as_f64()).sum())
        .unwrap_or(0.0);

    Ok(FunctionResult::new(json!({ "loans": loans, "count": n }))
        .with_summary(format!("There are {} active loans totalling ${:.2}.", n, total))
        .with_supplementary(json!({ "total_active_amount": total })))
}

fn loans_by_borrower(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let borrower_id = args.require_str("borrower_id")?;
    let borrower = verify_borrower(api, borrower_id)?;
    let loans = fetch(
        api,
        ApiRequest::BorrowerLoans { id: borrower_id.to_string() },
        Some(borrower_id),
    )?;

    let n = count(&loans);
    let active = loans
        .as_array()
        .map(|l| l.iter().filter(|l| l["status"] == "Active").count())
        .unwrap_or(0);

    Ok(FunctionResult::new(json!({
        "borrower_id": borrower_id,
        "borrower_name": borrower_name(&borrower),
        "loans": loans,
        "count": n,
    }))
    .with_summary(format!(
        "{} has {} loan(s), {} of them active.",
        borrower_name(&borrower),
        n,
        active
    ))
    .with_supplementary(json!({ "active_count": active })))
}

fn loan_summary(api: &dyn InternalApi, _args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let summary = fetch(api, ApiRequest::LoanSummary, None)?;

    let rate = summary["delinquency_rate"].as_f64().unwrap_or(0.0);
    let text = format!(
        "The portfolio holds {} loans ({} active) worth ${:.2} in total, with a delinquency rate of {:.1}%.",
        summary["total_loans"],
        summary["active_loans"],
        summary["total_amount"].as_f64().unwrap_or(0.0),
        rate,
    );

    Ok(FunctionResult::new(summary)
        .with_summary(text)
        .with_supplementary(delinquency_context(rate)))
}

fn delinquency_context(rate: f64) -> Value {
    // Agricultural lenders typically run below 5% delinquency
    json!({
        "industry_benchmark": 5.0,
        "comparison": if rate > 5.0 { "above" } else { "below" },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::seeded_api;
    use crate::params::ParameterSchema;
    use crate::validation::Validator;

    fn args(schema: &ParameterSchema, value: Value) -> ValidatedArgs {
        Validator::validate(schema, &value).unwrap()
    }

    fn loan_args(id: &str) -> ValidatedArgs {
        args(&ParameterSchema::new().with_param(ParamSpec::loan_id()), json!({ "loan_id": id }))
    }

    #[test]
    fn test_loan_details_summary() {
        let result = loan_details(&seeded_api(), &loan_args("L001")).unwrap();

        assert_eq!(result.data["loan_id"], "L001");
        assert!(result.summary.unwrap().contains("John Doe"));
        assert_eq!(result.supplementary.unwrap()["collateral_value"], 80000.0);
    }

    #[test]
    fn test_loan_status_unknown_loan() {
        let err = loan_status(&seeded_api(), &loan_args("L999")).unwrap_err();
        assert_eq!(err.code(), "ENTITY_NOT_FOUND");
    }

    #[test]
    fn test_loan_payments_counts_late() {
        let result = loan_payments(&seeded_api(), &loan_args("L003")).unwrap();

        assert_eq!(result.data["count"], 6);
        assert_eq!(
            result.summary.unwrap(),
            "Loan L003 has 6 payment(s) totalling $21000.00, 2 of them late."
        );
        assert_eq!(result.supplementary.unwrap()["late_payment_count"], 2);
    }

    #[test]
    fn test_loan_payments_empty_history() {
        let result = loan_payments(&seeded_api(), &loan_args("L006")).unwrap();

        assert_eq!(result.data["count"], 0);
        assert_eq!(result.summary.unwrap(), "No payments have been recorded for loan L006.");
    }

    #[test]
    fn test_loan_collateral_unknown_loan() {
        let err = loan_collateral(&seeded_api(), &loan_args("L999")).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound { ref entity_id, .. } if entity_id == "L999"));
    }

    #[test]
    fn test_loan_collateral_total() {
        let result = loan_collateral(&seeded_api(), &loan_args("L001")).unwrap();

        assert!(result.data["count"].as_u64().unwrap() >= 1);
        assert_eq!(result.supplementary.unwrap()["total_value"], 80000.0);
    }

    #[test]
    fn test_active_loans_wrapped_with_count() {
        let result = active_loans(&seeded_api(), &ValidatedArgs::default()).unwrap();
        assert_eq!(result.data["count"], 5);
    }

    #[test]
    fn test_loans_by_borrower_verifies_first() {
        let schema = ParameterSchema::new().with_param(ParamSpec::borrower_id());

        let ok = loans_by_borrower(&seeded_api(), &args(&schema, json!({"borrowerId": "B001"}))).unwrap();
        assert_eq!(ok.data["count"], 2);

        let err = loans_by_borrower(&seeded_api(), &args(&schema, json!({"borrowerId": "B999"}))).unwrap_err();
        assert!(matches!(err, DispatchError::NotFound { ref entity_id, .. } if entity_id == "B999"));
    }

    #[test]
    fn test_loan_summary_benchmark() {
        let result = loan_summary(&seeded_api(), &ValidatedArgs::default()).unwrap();

        assert_eq!(result.data["total_loans"], 8);
        // L002, L003, L005 have late payments
        assert_eq!(result.data["delinquency_rate"], 37.5);
        assert_eq!(result.supplementary.unwrap()["comparison"], "above");
    }
}
