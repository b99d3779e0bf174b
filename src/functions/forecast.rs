// Forecast functions: equipment maintenance, crop yield risk, market price impact

use super::{fetch, verify_borrower};
use crate::api::{ApiRequest, InternalApi};
use crate::error::DispatchError;
use crate::forecast::{CropSeason, ForecastHorizon};
use crate::params::{ParamSpec, ParameterSchema};
use crate::registry::FunctionDescriptor;
use crate::response::FunctionResult;
use crate::validation::ValidatedArgs;
use serde_json::{json, Value};

pub fn descriptors() -> Vec<FunctionDescriptor> {
    vec![
        FunctionDescriptor::new(
            "forecastEquipmentMaintenance",
            "Forecast equipment maintenance costs for a borrower over a time horizon",
            equipment_maintenance,
        )
        .with_parameters(
            ParameterSchema::new().with_param(ParamSpec::borrower_id()).with_param(
                ParamSpec::string("time_horizon")
                    .with_description("Forecast horizon: 1y, 2y or 3y")
                    .with_enum(ForecastHorizon::SCHEMA_VALUES)
                    .with_default(json!("1y")),
            ),
        ),
        FunctionDescriptor::new(
            "assessCropYieldRisk",
            "Assess the risk of crop yields falling below break-even for a borrower's farm",
            crop_yield_risk,
        )
        .with_parameters(
            ParameterSchema::new()
                .with_param(ParamSpec::borrower_id())
                .with_param(
                    ParamSpec::string("crop_type")
                        .with_description("Crop to analyze (e.g. corn, soybeans, wheat); all crops when omitted"),
                )
                .with_param(
                    ParamSpec::string("season")
                        .with_description("Growing season to analyze")
                        .with_enum(CropSeason::SCHEMA_VALUES)
                        .with_default(json!("current")),
                ),
        ),
        FunctionDescriptor::new(
            "analyzeMarketPriceImpact",
            "Analyze how commodity price changes affect a borrower's income and repayment ability",
            market_price_impact,
        )
        .with_parameters(
            ParameterSchema::new().with_param(ParamSpec::borrower_id()).with_param(
                ParamSpec::string_list("commodity_types")
                    .with_description("Commodities to analyze (e.g. corn, soybeans); all relevant commodities when omitted"),
            ),
        ),
    ]
}

fn money(value: &Value) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

fn equipment_maintenance(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let borrower_id = args.require_str("borrower_id")?;
    let horizon = args
        .str("time_horizon")
        .and_then(ForecastHorizon::parse)
        .unwrap_or_default();

    verify_borrower(api, borrower_id)?;
    let result = fetch(
        api,
        ApiRequest::EquipmentForecast {
            borrower_id: borrower_id.to_string(),
            horizon,
        },
        Some(borrower_id),
    )?;

    let name = result["borrower_name"].as_str().unwrap_or(borrower_id);
    let summary = if result["equipment_count"] == 0 {
        format!("{} has no equipment on file to forecast.", name)
    } else {
        format!(
            "{} has {} equipment item(s): ${:.0} budgeted this year (${:.0} in major repairs), ${:.0} over {}.",
            name,
            result["equipment_count"],
            money(&result["total_annual_budget"]),
            money(&result["immediate_major_repairs_cost"]),
            money(&result["horizon_budget"]),
            horizon.as_str(),
        )
    };

    Ok(FunctionResult::new(result).with_summary(summary))
}

fn crop_yield_risk(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let borrower_id = args.require_str("borrower_id")?;
    let crop_type = args.str("crop_type");
    let season = args
        .str("season")
        .and_then(CropSeason::parse)
        .unwrap_or_default();

    verify_borrower(api, borrower_id)?;
    let result = fetch(
        api,
        ApiRequest::CropYieldRisk {
            borrower_id: borrower_id.to_string(),
            crop_type: crop_type.map(str::to_string),
            season,
        },
        Some(borrower_id),
    )?;

    let name = result["borrower_name"].as_str().unwrap_or(borrower_id);
    let crops = result["crop_risk_assessments"].as_array().map(Vec::len).unwrap_or(0);
    let summary = if crops == 0 {
        format!(
            "No {} crops to assess for {}.",
            crop_type.unwrap_or("matching"),
            name
        )
    } else {
        format!(
            "{} has {} crop yield risk for the {} season: {:.0}% acre-weighted chance of falling below break-even across {} crop(s).",
            name,
            result["overall_risk_level"].as_str().unwrap_or("unknown"),
            season.as_str(),
            money(&result["overall_break_even_risk"]) * 100.0,
            crops,
        )
    };

    Ok(FunctionResult::new(result).with_summary(summary))
}

fn market_price_impact(api: &dyn InternalApi, args: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
    let borrower_id = args.require_str("borrower_id")?;
    let commodities: Vec<String> = args.str_list("commodity_types").into_iter().map(str::to_string).collect();

    verify_borrower(api, borrower_id)?;
    let result = fetch(
        api,
        ApiRequest::MarketImpact {
            borrower_id: borrower_id.to_string(),
            commodities,
        },
        Some(borrower_id),
    )?;

    let summary = format!(
        "Projected prices change {}'s income by ${:.0} ({}%); a 20% price drop would cost ${:.0} ({}%), {} market risk.",
        result["borrower_name"].as_str().unwrap_or(borrower_id),
        money(&result["projected_income_change"]),
        result["projected_income_change_percent"],
        money(&result["worst_case_impact"]).abs(),
        result["worst_case_impact_percent"],
        result["market_risk_level"].as_str().unwrap_or("unknown"),
    );

    Ok(FunctionResult::new(result).with_summary(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::testing::seeded_api;
    use crate::validation::Validator;

    fn args(function: &str, value: Value) -> ValidatedArgs {
        let descriptor = descriptors().into_iter().find(|d| d.name == function).unwrap();
        Validator::validate(&descriptor.parameters, &value).unwrap()
    }

    #[test]
    fn test_equipment_forecast_summary() {
        let result = equipment_maintenance(
            &seeded_api(),
            &args("forecastEquipmentMaintenance", json!({"borrower_id": "B001", "time_horizon": "2y"})),
        )
        .unwrap();

        // routine 18,800 a year, twice, plus 21,000 in repairs
        assert_eq!(result.data["horizon_budget"], 58600.0);
        assert_eq!(
            result.summary.unwrap(),
            "John Doe has 2 equipment item(s): $39800 budgeted this year ($21000 in major repairs), $58600 over 2y."
        );
    }

    #[test]
    fn test_equipment_forecast_without_equipment() {
        let result = equipment_maintenance(&seeded_api(), &args("forecastEquipmentMaintenance", json!({"borrower_id": "B006"}))).unwrap();

        assert_eq!(result.data["equipment_count"], 0);
        assert_eq!(result.data["time_horizon"], "1y");
        assert_eq!(result.summary.unwrap(), "Linda Davis has no equipment on file to forecast.");
    }

    #[test]
    fn test_crop_yield_defaults_to_current_season() {
        let result = crop_yield_risk(&seeded_api(), &args("assessCropYieldRisk", json!({"borrower_id": "B001"}))).unwrap();

        assert_eq!(result.data["season"], "current");
        assert_eq!(result.data["overall_break_even_risk"], 0.14);
        assert_eq!(
            result.summary.unwrap(),
            "John Doe has low crop yield risk for the current season: 14% acre-weighted chance of falling below break-even across 2 crop(s)."
        );
    }

    #[test]
    fn test_crop_yield_unmatched_crop() {
        let result = crop_yield_risk(
            &seeded_api(),
            &args("assessCropYieldRisk", json!({"borrower_id": "B002", "cropType": "rice"})),
        )
        .unwrap();

        assert_eq!(result.summary.unwrap(), "No rice crops to assess for Jane Smith.");
    }

    #[test]
    fn test_market_impact_with_commodity_filter() {
        let result = market_price_impact(
            &seeded_api(),
            &args("analyzeMarketPriceImpact", json!({"borrower_id": "B001", "commodity_types": ["Corn"]})),
        )
        .unwrap();

        let impacts = result.data["commodity_impacts"].as_array().unwrap();
        assert_eq!(impacts.len(), 1);
        assert_eq!(impacts[0]["commodity"], "Corn");
        assert_eq!(result.data["projected_income_change"], -19600.0);
    }

    #[test]
    fn test_market_impact_all_commodities() {
        let result = market_price_impact(&seeded_api(), &args("analyzeMarketPriceImpact", json!({"borrowerId": "B001"}))).unwrap();

        assert_eq!(result.data["worst_case_impact"], -50744.0);
        assert_eq!(result.data["market_risk_level"], "high");
        assert!(result.summary.unwrap().ends_with("high market risk."));
    }
}
