// Risk functions: collateral sufficiency, default and non-accrual risk,
// high-risk and at-risk farmer scans, payment patterns

use super::{fetch, verify_borrower, verify_loan};
use crate::analytics::AnalysisPeriod;
use crate::api::{ApiRequest, InternalApi};
use crate::error::DispatchError;
use crate::params::{ParamSpec, ParameterSchema};
use crate::registry::FunctionDescriptor;
use crate::response::FunctionResult;
use crate::risk::{MarketConditions, RiskLevel, Season, TimeHorizon, LTV_SUFFICIENCY_THRESHOLD};
use crate::validation::ValidatedArgs;
use serde_json::json;

pub fn descriptors() -> Vec<FunctionDescriptor> {
    vec![
        FunctionDescriptor::new(
            "evaluateCollateralSufficiency",
            "Evaluate whether a loan's collateral is sufficient given current market conditions",
            collateral_sufficiency,
        )
        .with_parameters(
            ParameterSchema::new().with_param(ParamSpec::loan_id()).with_param(
                ParamSpec::string("marketConditions")
                    .with_description("Current market conditions affecting collateral value")
                    .with_enum(MarketConditions::SCHEMA_VALUES)
                    .with_default(json!("stable")),
            ),
        ),
        FunctionDescriptor::new(
            "getBorrowerDefaultRisk",
            "Assess the risk that a borrower will default on their loans",
            default_risk,
        )
        .with_parameters(
            ParameterSchema::new().with_param(ParamSpec::borrower_id()).with_param(
                ParamSpec::string("timeHorizon")
                    .with_description("Time horizon for the assessment: 3m (short), 6m (medium) or 12m/1y (long)")
                    .with_enum(TimeHorizon::SCHEMA_VALUES)
                    .with_default(json!("6m")),
            ),
        ),
        FunctionDescriptor::new(
            "getBorrowerNonAccrualRisk",
            "Assess the risk that a borrower's loans will be placed on non-accrual status",
            non_accrual_risk,
        )
        .with_parameters(ParameterSchema::new().with_param(ParamSpec::borrower_id())),
        FunctionDescriptor::new(
            "getHighRiskFarmers",
            "Identify farmers in the portfolio with a high risk of default",
            high_risk_farmers,
        ),
        FunctionDescriptor::new(
            "findFarmersAtRisk",
            "Find farmers at risk of default, optionally filtered by crop type and adjusted for the season",
            farmers_at_risk,
        )
        .with_parameters(
            ParameterSchema::new()
                .with_param(
                    ParamSpec::string("crop_type")
                        .with_description("Crop or herd to filter by (e.g. corn, wheat, soybeans, livestock)"),
                )
                .with_param(
                    ParamSpec::string("season")
                        .with_description("Season to consider for the risk assessment")
                        .with_enum(Season::SCHEMA_VALUES),
                )
                .with_param(
                    ParamSpec::string("risk_level")
                        .with_description("Lowest risk level to include")
                        .with_enum(RiskLevel::SCHEMA_VALUES)
                        .with_default(json!("high")),
                ),
        ),
        FunctionDescriptor::new(
            "analyzePaymentPatterns",
            "Analyze a borrower's payment history for seasonality and consistency",
            payment_patterns,
        )
        .with_parameters(
            ParameterSchema::new().with_param(ParamSpec::borrower_id()).with_param(
                ParamSpec::string("period")
                    .with_description("Look-back window for the analysis")
                    .with_enum(AnalysisPeriod::SCHEMA_VALUES)
                    .with_default(json!("1y")),
            ),
        ),
    ]
}

fn collateral_sufficiency(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let loan_id = args.require_str("loan_id")?;
    let market = args
        .str("marketConditions")
        .and_then(MarketConditions::parse)
        .unwrap_or_default();

    verify_loan(api, loan_id)?;
    let result = fetch(
        api,
        ApiRequest::CollateralSufficiency {
            loan_id: loan_id.to_string(),
            market,
        },
        Some(loan_id),
    )?;

    let summary = match result["loan_to_value_ratio"].as_f64() {
        Some(ltv) => format!(
            "Loan {} has a loan-to-value ratio of {:.2} under {} market conditions; collateral is {}.",
            loan_id,
            ltv,
            market.as_str(),
            if result["is_sufficient"] == true { "sufficient" } else { "insufficient" },
        ),
        None => format!("Loan {} has no recorded collateral.", loan_id),
    };
    let comparison = match result["loan_to_value_ratio"].as_f64() {
        Some(ltv) if ltv < LTV_SUFFICIENCY_THRESHOLD => "below",
        _ => "above",
    };

    Ok(FunctionResult::new(result)
        .with_summary(summary)
        .with_supplementary(json!({
            "industry_standard": LTV_SUFFICIENCY_THRESHOLD,
            "comparison": comparison,
        })))
}

fn default_risk(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let borrower_id = args.require_str("borrower_id")?;
    let horizon = args
        .str("timeHorizon")
        .and_then(TimeHorizon::parse)
        .unwrap_or_default();

    verify_borrower(api, borrower_id)?;
    let result = fetch(
        api,
        ApiRequest::DefaultRisk {
            borrower_id: borrower_id.to_string(),
            horizon,
        },
        Some(borrower_id),
    )?;

    let score = result["risk_score"].as_u64().unwrap_or(0);
    let level = result["risk_level"].as_str().unwrap_or("unknown");
    let summary = format!(
        "{} has a {} default risk (score {}/100) over a {} horizon.",
        result["borrower_name"].as_str().unwrap_or(borrower_id),
        level,
        score,
        horizon.as_str(),
    );

    Ok(FunctionResult::new(result.clone())
        .with_summary(summary)
        .with_supplementary(json!({
            "risk_factor_count": result["risk_factors"].as_array().map(Vec::len).unwrap_or(0),
            "high_risk_threshold": 70,
            "comparison": if score > 70 { "above" } else { "below" },
        })))
}

fn non_accrual_risk(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let borrower_id = args.require_str("borrower_id")?;

    verify_borrower(api, borrower_id)?;
    let result = fetch(
        api,
        ApiRequest::NonAccrualRisk {
            borrower_id: borrower_id.to_string(),
        },
        Some(borrower_id),
    )?;

    let summary = format!(
        "{} has a {} risk of non-accrual (score {}/100).",
        result["borrower_name"].as_str().unwrap_or(borrower_id),
        result["non_accrual_risk"].as_str().unwrap_or("unknown"),
        result["risk_score"],
    );

    Ok(FunctionResult::new(result).with_summary(summary))
}

fn high_risk_farmers(api: &dyn InternalApi, _args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let result = fetch(api, ApiRequest::HighRiskFarmers, None)?;

    let names: Vec<&str> = result["farmers"]
        .as_array()
        .map(|farmers| farmers.iter().filter_map(|f| f["name"].as_str()).collect())
        .unwrap_or_default();

    let summary = if names.is_empty() {
        "No farmers are currently rated high risk.".to_string()
    } else {
        format!(
            "{} farmer(s) are rated high risk: {}.",
            names.len(),
            names.join(", ")
        )
    };

    Ok(FunctionResult::new(result).with_summary(summary))
}

fn farmers_at_risk(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let crop_type = args.str("crop_type");
    let season = args.str("season").and_then(Season::parse);
    let min_level = args
        .str("risk_level")
        .and_then(RiskLevel::parse)
        .unwrap_or(RiskLevel::High);

    let result = fetch(
        api,
        ApiRequest::FarmersAtRisk {
            crop_type: crop_type.map(str::to_string),
            season,
            min_level,
        },
        None,
    )?;

    let names: Vec<&str> = result["farmers"]
        .as_array()
        .map(|farmers| farmers.iter().filter_map(|f| f["name"].as_str()).collect())
        .unwrap_or_default();

    let mut scope = format!("{} risk or above", min_level.as_str());
    if let Some(crop) = crop_type {
        scope.push_str(&format!(", crop {}", crop));
    }
    if let Some(season) = season {
        scope.push_str(&format!(", {} season", season.as_str()));
    }

    let summary = if names.is_empty() {
        format!("No farmers match {}.", scope)
    } else {
        format!("{} farmer(s) match {}: {}.", names.len(), scope, names.join(", "))
    };

    Ok(FunctionResult::new(result).with_summary(summary))
}

fn payment_patterns(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let borrower_id = args.require_str("borrower_id")?;
    let period = args
        .str("period")
        .and_then(AnalysisPeriod::parse)
        .unwrap_or_default();

    verify_borrower(api, borrower_id)?;
    let result = fetch(
        api,
        ApiRequest::PaymentPatterns {
            borrower_id: borrower_id.to_string(),
            period,
        },
        Some(borrower_id),
    )?;

    let summary = format!(
        "Analyzed {} payment(s) for {} over {}: consistency {}, seasonality {}.",
        result["total_payments_analyzed"],
        result["borrower_name"].as_str().unwrap_or(borrower_id),
        period.as_str(),
        result["consistency_score"],
        result["seasonality_score"],
    );

    Ok(FunctionResult::new(result).with_summary(summary))
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
    fn test_default_risk_defaults_to_six_months() {
        let result = default_risk(&seeded_api(), &args("getBorrowerDefaultRisk", json!({"borrowerId": "B003"}))).unwrap();

        assert_eq!(result.data["borrower_id"], "B003");
        assert_eq!(result.data["risk_score"], 75);
        assert_eq!(result.data["time_horizon"], "6m");
        assert_eq!(result.supplementary.unwrap()["comparison"], "above");
    }

    #[test]
    fn test_default_risk_one_year_echoed() {
        let result = default_risk(
            &seeded_api(),
            &args("getBorrowerDefaultRisk", json!({"borrowerId": "B002", "timeHorizon": "1y"})),
        )
        .unwrap();

        assert_eq!(result.data["time_horizon"], "1y");
        assert!(result.summary.unwrap().ends_with("over a 1y horizon."));
    }

    #[test]
    fn test_collateral_declining_market() {
        let result = collateral_sufficiency(
            &seeded_api(),
            &args(
                "evaluateCollateralSufficiency",
                json!({"loan_id": "L001", "marketConditions": "declining"}),
            ),
        )
        .unwrap();

        assert_eq!(result.data["market_adjustment_factor"], 0.8);
        assert!(result.summary.unwrap().contains("declining"));
    }

    #[test]
    fn test_collateral_unknown_loan() {
        let err = collateral_sufficiency(
            &seeded_api(),
            &args("evaluateCollateralSufficiency", json!({"loan_id": "L999"})),
        )
        .unwrap_err();

        assert!(matches!(err, DispatchError::NotFound { ref entity_id, .. } if entity_id == "L999"));
    }

    #[test]
    fn test_non_accrual_summary() {
        let result = non_accrual_risk(&seeded_api(), &args("getBorrowerNonAccrualRisk", json!({"borrower_id": "B003"}))).unwrap();
        assert_eq!(result.summary.unwrap(), "Robert Johnson has a medium risk of non-accrual (score 55/100).");
    }

    #[test]
    fn test_high_risk_farmers_summary() {
        let result = high_risk_farmers(&seeded_api(), &ValidatedArgs::default()).unwrap();
        assert_eq!(result.data["count"], 2);
        assert!(result.summary.unwrap().contains("William Brown, Robert Johnson"));
    }

    #[test]
    fn test_farmers_at_risk_defaults_to_high() {
        let result = farmers_at_risk(&seeded_api(), &args("findFarmersAtRisk", json!({}))).unwrap();

        assert_eq!(result.data["count"], 2);
        assert_eq!(result.data["criteria"]["risk_level"], "high");
        assert_eq!(
            result.summary.unwrap(),
            "2 farmer(s) match high risk or above: William Brown, Robert Johnson."
        );
    }

    #[test]
    fn test_farmers_at_risk_filters() {
        let result = farmers_at_risk(
            &seeded_api(),
            &args(
                "findFarmersAtRisk",
                json!({"crop_type": "livestock", "season": "Summer", "risk_level": "medium"}),
            ),
        )
        .unwrap();

        assert_eq!(result.data["farmers"][0]["borrower_id"], "B002");
        assert_eq!(result.data["farmers"][0]["risk_score"], 55);
        assert_eq!(result.data["criteria"]["season"], "summer");
    }

    #[test]
    fn test_farmers_at_risk_rejects_unknown_season() {
        let descriptor = descriptors().into_iter().find(|d| d.name == "findFarmersAtRisk").unwrap();
        let errors = Validator::validate(&descriptor.parameters, &json!({"season": "monsoon"})).unwrap_err();
        assert_eq!(errors[0].field, "season");
    }

    #[test]
    fn test_payment_patterns_window() {
        let result = payment_patterns(
            &seeded_api(),
            &args("analyzePaymentPatterns", json!({"borrower_id": "B005", "period": "2y"})),
        )
        .unwrap();

        assert_eq!(result.data["period"], "2y");
        assert_eq!(result.data["total_payments_analyzed"], 5);
    }
}
