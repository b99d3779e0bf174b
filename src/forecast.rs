// 🔮 Forecasts - equipment upkeep, crop yield and commodity price exposure
//
// Crop and commodity figures are regional planning defaults keyed by farm
// type, not borrower-reported production. Equipment forecasts use the
// borrower's equipment records.

use crate::entities::{Borrower, Equipment, FarmType};
use crate::risk::{round_to, RiskLevel};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

// ============================================================================
// EQUIPMENT MAINTENANCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForecastHorizon {
    #[default]
    OneYear,
    TwoYears,
    ThreeYears,
}

impl ForecastHorizon {
    pub const SCHEMA_VALUES: [&'static str; 3] = ["1y", "2y", "3y"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "1y" => Some(ForecastHorizon::OneYear),
            "2y" => Some(ForecastHorizon::TwoYears),
            "3y" => Some(ForecastHorizon::ThreeYears),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastHorizon::OneYear => "1y",
            ForecastHorizon::TwoYears => "2y",
            ForecastHorizon::ThreeYears => "3y",
        }
    }

    pub fn years(&self) -> u32 {
        match self {
            ForecastHorizon::OneYear => 1,
            ForecastHorizon::TwoYears => 2,
            ForecastHorizon::ThreeYears => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentMaintenance {
    pub equipment_id: String,
    #[serde(rename = "type")]
    pub equipment_type: String,
    pub description: String,
    pub age_years: u32,
    pub annual_maintenance_cost: f64,
    pub major_repair_needed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_repair_description: Option<String>,
    pub major_repair_cost: f64,
    pub total_annual_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceForecast {
    pub borrower_id: String,
    pub borrower_name: String,
    pub time_horizon: String,
    pub equipment_count: usize,
    pub equipment_details: Vec<EquipmentMaintenance>,
    /// Routine upkeep only
    pub annual_maintenance_budget: f64,
    pub immediate_major_repairs_cost: f64,
    /// Routine upkeep plus this year's major repairs
    pub total_annual_budget: f64,
    /// Routine upkeep for every year of the horizon plus this year's major repairs
    pub horizon_budget: f64,
    pub maintenance_recommendations: Vec<String>,
}

/// Equipment items older than this are replacement candidates
pub const REPLACEMENT_AGE_YEARS: u32 = 7;

fn age_in_years(item: &Equipment, today: NaiveDate) -> u32 {
    item.purchase_date
        .map(|d| u32::try_from(today.year() - d.year()).unwrap_or(0))
        .unwrap_or(0)
}

fn maintenance_for(item: &Equipment, today: NaiveDate) -> EquipmentMaintenance {
    let age = age_in_years(item, today);
    let hours = item.hours_used.unwrap_or(0.0);
    let value = item.value.unwrap_or(0.0);

    let mut rate = 0.02;
    if age > 5 {
        rate += 0.01 * f64::from(age - 5);
    }
    if hours / f64::from(age.max(1)) > 300.0 {
        rate += 0.01;
    }
    match item.condition.as_deref() {
        Some("Excellent") => rate *= 0.8,
        Some("Poor") => rate *= 1.5,
        _ => {}
    }
    let annual = (value * rate).round();

    let major = if age >= 3 && age % 3 == 0 {
        Some("Major service interval")
    } else if hours > 2000.0 && hours % 1000.0 < 200.0 {
        Some("Usage threshold service")
    } else {
        None
    };
    let major_cost = if major.is_some() { (value * 0.05).round() } else { 0.0 };

    EquipmentMaintenance {
        equipment_id: item.equipment_id.clone(),
        equipment_type: item.equipment_type.clone(),
        description: item.description.clone(),
        age_years: age,
        annual_maintenance_cost: annual,
        major_repair_needed: major.is_some(),
        major_repair_description: major.map(str::to_string),
        major_repair_cost: major_cost,
        total_annual_cost: annual + major_cost,
    }
}

/// Maintenance budget for the borrower's equipment as of `today`.
///
/// Rate starts at 2% of value, grows 1 point per year past five and 1 point
/// for heavy use (over 300 hours a year), then scales with condition.
pub fn maintenance_forecast(
    borrower: &Borrower,
    equipment: &[Equipment],
    horizon: ForecastHorizon,
    today: NaiveDate,
) -> MaintenanceForecast {
    let details: Vec<EquipmentMaintenance> = equipment
        .iter()
        .filter(|e| e.borrower_id == borrower.borrower_id)
        .map(|e| maintenance_for(e, today))
        .collect();

    let routine: f64 = details.iter().map(|d| d.annual_maintenance_cost).sum();
    let major: f64 = details.iter().map(|d| d.major_repair_cost).sum();

    let mut recommendations = Vec::new();
    if details.is_empty() {
        recommendations.push("No equipment on file for this borrower.".to_string());
    } else {
        if major > 0.0 {
            recommendations.push(format!("Budget ${:.0} for major repairs in the coming year.", major));
        }
        let old = details.iter().filter(|d| d.age_years > REPLACEMENT_AGE_YEARS).count();
        if old > 0 {
            recommendations.push(format!(
                "Consider replacing {} equipment items over {} years old to reduce maintenance costs.",
                old, REPLACEMENT_AGE_YEARS
            ));
        }
        recommendations.push("Schedule regular preventive maintenance to avoid unexpected repairs.".to_string());
    }

    MaintenanceForecast {
        borrower_id: borrower.borrower_id.clone(),
        borrower_name: borrower.full_name(),
        time_horizon: horizon.as_str().to_string(),
        equipment_count: details.len(),
        equipment_details: details,
        annual_maintenance_budget: routine,
        immediate_major_repairs_cost: major,
        total_annual_budget: routine + major,
        horizon_budget: routine * f64::from(horizon.years()) + major,
        maintenance_recommendations: recommendations,
    }
}

// ============================================================================
// CROP YIELD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropSeason {
    #[default]
    Current,
    Next,
}

impl CropSeason {
    pub const SCHEMA_VALUES: [&'static str; 2] = ["current", "next"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "current" => Some(CropSeason::Current),
            "next" => Some(CropSeason::Next),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CropSeason::Current => "current",
            CropSeason::Next => "next",
        }
    }
}

/// Planning defaults for one crop
struct CropProfile {
    crop: &'static str,
    share_of_farm: f64,
    yield_per_acre: f64,
    historical_yield_avg: f64,
    yield_variability: f64,
    cost_per_acre: f64,
    price_per_unit: f64,
}

const CORN: CropProfile = CropProfile {
    crop: "Corn",
    share_of_farm: 0.4,
    yield_per_acre: 175.0,
    historical_yield_avg: 165.0,
    yield_variability: 0.15,
    cost_per_acre: 750.0,
    price_per_unit: 5.60,
};

const SOYBEANS: CropProfile = CropProfile {
    crop: "Soybeans",
    share_of_farm: 0.3,
    yield_per_acre: 55.0,
    historical_yield_avg: 50.0,
    yield_variability: 0.12,
    cost_per_acre: 550.0,
    price_per_unit: 13.20,
};

const WHEAT: CropProfile = CropProfile {
    crop: "Wheat",
    share_of_farm: 0.15,
    yield_per_acre: 65.0,
    historical_yield_avg: 60.0,
    yield_variability: 0.10,
    cost_per_acre: 450.0,
    price_per_unit: 7.50,
};

/// Hay takes half a livestock operation but a small share of a mixed one
fn hay(share_of_farm: f64) -> CropProfile {
    CropProfile {
        crop: "Hay",
        share_of_farm,
        yield_per_acre: 4.5,
        historical_yield_avg: 4.2,
        yield_variability: 0.08,
        cost_per_acre: 400.0,
        price_per_unit: 180.0,
    }
}

fn crops_for(farm_type: &FarmType) -> Vec<CropProfile> {
    match farm_type {
        FarmType::Crop => vec![CORN, SOYBEANS],
        FarmType::Mixed => vec![CORN, SOYBEANS, WHEAT, hay(0.15)],
        FarmType::Livestock => vec![hay(0.5)],
        FarmType::Other => Vec::new(),
    }
}

/// Weather risk by calendar month; a flat 0.1 when looking ahead a season
fn weather_factor(season: CropSeason, today: NaiveDate) -> f64 {
    if season == CropSeason::Next {
        return 0.1;
    }
    match today.month() {
        3..=5 => 0.18,
        6..=8 => 0.22,
        9..=11 => 0.15,
        _ => 0.05,
    }
}

/// Probability of yield falling below break-even, from the yield margin
/// in standard deviations
fn below_break_even_probability(std_devs: f64) -> f64 {
    if std_devs < 0.0 {
        0.95
    } else if std_devs < 0.5 {
        0.7
    } else if std_devs < 1.0 {
        0.5
    } else if std_devs < 2.0 {
        0.2
    } else {
        0.05
    }
}

fn level_from_probability(probability: f64) -> RiskLevel {
    if probability > 0.7 {
        RiskLevel::High
    } else if probability > 0.3 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRisk {
    pub crop: String,
    pub acres: f64,
    pub expected_yield: f64,
    pub break_even_yield: f64,
    pub yield_risk_score: f64,
    pub below_break_even_probability: f64,
    pub risk_level: RiskLevel,
    pub estimated_profit_per_acre: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropYieldAssessment {
    pub borrower_id: String,
    pub borrower_name: String,
    pub season: String,
    pub farm_type: FarmType,
    pub total_acres: f64,
    pub crop_risk_assessments: Vec<CropRisk>,
    pub overall_risk_level: RiskLevel,
    /// Acre-weighted below-break-even probability
    pub overall_break_even_risk: f64,
    pub recommendations: Vec<String>,
}

fn assess_crop(profile: &CropProfile, farm_size: f64, weather: f64) -> CropRisk {
    let break_even = profile.cost_per_acre / profile.price_per_unit;
    let std_devs = (profile.yield_per_acre - break_even) / (profile.historical_yield_avg * profile.yield_variability);
    let probability = below_break_even_probability(std_devs);

    CropRisk {
        crop: profile.crop.to_string(),
        acres: (farm_size * profile.share_of_farm).round(),
        expected_yield: profile.yield_per_acre,
        break_even_yield: round_to(break_even, 2),
        yield_risk_score: round_to(profile.yield_variability + weather, 2),
        below_break_even_probability: probability,
        risk_level: level_from_probability(probability),
        estimated_profit_per_acre: round_to(
            profile.yield_per_acre * profile.price_per_unit - profile.cost_per_acre,
            2,
        ),
    }
}

/// Yield risk for the crops a farm of this type typically grows.
///
/// `crop_type` narrows the assessment to one crop (case-insensitive); an
/// unknown crop leaves nothing to assess.
pub fn crop_yield_risk(
    borrower: &Borrower,
    crop_type: Option<&str>,
    season: CropSeason,
    today: NaiveDate,
) -> CropYieldAssessment {
    let weather = weather_factor(season, today);

    let crops: Vec<CropRisk> = crops_for(&borrower.farm_type)
        .iter()
        .filter(|p| crop_type.map_or(true, |c| p.crop.eq_ignore_ascii_case(c.trim())))
        .map(|p| assess_crop(p, borrower.farm_size, weather))
        .collect();

    let total_acres: f64 = crops.iter().map(|c| c.acres).sum();
    let average = if total_acres > 0.0 {
        crops.iter().map(|c| c.below_break_even_probability * c.acres).sum::<f64>() / total_acres
    } else {
        0.0
    };

    let mut recommendations = Vec::new();
    let high: Vec<&str> = crops
        .iter()
        .filter(|c| c.risk_level == RiskLevel::High)
        .map(|c| c.crop.as_str())
        .collect();
    if !high.is_empty() {
        recommendations.push(format!(
            "Consider crop insurance for {} to mitigate high yield risk.",
            high.join(", ")
        ));
    }
    if crops.len() < 2 {
        recommendations.push("Consider diversifying crops to reduce overall yield risk.".to_string());
    }
    if season == CropSeason::Current {
        match today.month() {
            3..=5 => recommendations.push("Monitor spring planting conditions closely to adjust as needed.".to_string()),
            6..=8 => recommendations
                .push("Consider irrigation strategies to mitigate potential drought impacts.".to_string()),
            _ => {}
        }
    }

    CropYieldAssessment {
        borrower_id: borrower.borrower_id.clone(),
        borrower_name: borrower.full_name(),
        season: season.as_str().to_string(),
        farm_type: borrower.farm_type.clone(),
        total_acres: borrower.farm_size,
        crop_risk_assessments: crops,
        overall_risk_level: level_from_probability(average),
        overall_break_even_risk: round_to(average, 2),
        recommendations,
    }
}

// ============================================================================
// MARKET PRICE IMPACT
// ============================================================================

/// Planning defaults for one commodity
struct Commodity {
    name: &'static str,
    units_per_acre: f64,
    current_price: f64,
    price_trend: f64,
    volatility: f64,
    /// Correlation with borrower income; negative for inputs
    sensitivity: f64,
    is_input_cost: bool,
}

const CORN_MARKET: Commodity = Commodity {
    name: "Corn",
    units_per_acre: 0.4 * 175.0,
    current_price: 5.60,
    price_trend: -0.10,
    volatility: 0.22,
    sensitivity: 0.85,
    is_input_cost: false,
};

const SOYBEAN_MARKET: Commodity = Commodity {
    name: "Soybeans",
    units_per_acre: 0.3 * 55.0,
    current_price: 13.20,
    price_trend: 0.05,
    volatility: 0.19,
    sensitivity: 0.80,
    is_input_cost: false,
};

const CATTLE_MARKET: Commodity = Commodity {
    name: "Cattle",
    units_per_acre: 0.5,
    current_price: 1350.0,
    price_trend: 0.08,
    volatility: 0.15,
    sensitivity: 0.90,
    is_input_cost: false,
};

const FEED_MARKET: Commodity = Commodity {
    name: "Feed",
    units_per_acre: 2.0,
    current_price: 225.0,
    price_trend: 0.03,
    volatility: 0.18,
    sensitivity: -0.75,
    is_input_cost: true,
};

fn commodities_for(farm_type: &FarmType) -> Vec<Commodity> {
    match farm_type {
        FarmType::Crop => vec![CORN_MARKET, SOYBEAN_MARKET],
        FarmType::Livestock => vec![CATTLE_MARKET, FEED_MARKET],
        FarmType::Mixed => vec![CORN_MARKET, SOYBEAN_MARKET, CATTLE_MARKET, FEED_MARKET],
        FarmType::Other => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityImpact {
    pub commodity: String,
    pub is_input_cost: bool,
    pub current_price: f64,
    pub price_trend_percent: f64,
    pub projected_price: f64,
    pub current_value: f64,
    pub projected_value: f64,
    /// Income change at the projected price; input-cost increases count against income
    pub financial_impact: f64,
    pub income_impact_percent: f64,
    pub downside_risk_10percent: f64,
    pub downside_risk_20percent: f64,
    pub market_volatility: f64,
    pub price_risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketImpact {
    pub borrower_id: String,
    pub borrower_name: String,
    pub farm_type: FarmType,
    pub annual_income: f64,
    pub commodity_impacts: Vec<CommodityImpact>,
    pub projected_income_change: f64,
    pub projected_income_change_percent: f64,
    pub worst_case_impact: f64,
    pub worst_case_impact_percent: f64,
    pub market_risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

/// Percent of `income`; 0 when the borrower reports none
fn share_of_income(amount: f64, income: f64) -> f64 {
    if income > 0.0 {
        amount / income * 100.0
    } else {
        0.0
    }
}

fn impact_of(commodity: &Commodity, farm_size: f64, income: f64) -> CommodityImpact {
    let units = (farm_size * commodity.units_per_acre).round();
    let current_value = units * commodity.current_price;
    let projected_price = commodity.current_price * (1.0 + commodity.price_trend);
    let projected_value = units * projected_price;

    let direction = if commodity.is_input_cost { -1.0 } else { 1.0 };
    let financial_impact = (projected_value - current_value) * direction;
    let weight = commodity.sensitivity.abs();

    let price_risk_level = if commodity.volatility > 0.2 {
        RiskLevel::High
    } else if commodity.volatility > 0.1 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    CommodityImpact {
        commodity: commodity.name.to_string(),
        is_input_cost: commodity.is_input_cost,
        current_price: commodity.current_price,
        price_trend_percent: (commodity.price_trend * 100.0).round(),
        projected_price: round_to(projected_price, 2),
        current_value: current_value.round(),
        projected_value: projected_value.round(),
        financial_impact: financial_impact.round(),
        income_impact_percent: round_to(share_of_income(financial_impact * weight, income), 1),
        downside_risk_10percent: (-0.1 * current_value * weight).round(),
        downside_risk_20percent: (-0.2 * current_value * weight).round(),
        market_volatility: commodity.volatility,
        price_risk_level,
    }
}

/// Income exposure to projected commodity prices.
///
/// `only` names commodities to keep (case-insensitive); empty keeps every
/// commodity the farm type produces or buys.
pub fn market_price_impact(borrower: &Borrower, only: &[&str]) -> MarketImpact {
    let impacts: Vec<CommodityImpact> = commodities_for(&borrower.farm_type)
        .iter()
        .filter(|c| only.is_empty() || only.iter().any(|name| c.name.eq_ignore_ascii_case(name.trim())))
        .map(|c| impact_of(c, borrower.farm_size, borrower.income))
        .collect();

    let total: f64 = impacts.iter().map(|i| i.financial_impact).sum();
    let total_percent = share_of_income(total, borrower.income);
    let worst: f64 = impacts.iter().map(|i| i.downside_risk_20percent).sum();
    let worst_percent = share_of_income(worst, borrower.income);

    let market_risk_level = if worst_percent.abs() > 30.0 {
        RiskLevel::High
    } else if worst_percent.abs() > 15.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    let mut recommendations = Vec::new();
    let volatile: Vec<&str> = impacts
        .iter()
        .filter(|i| i.market_volatility > 0.2)
        .map(|i| i.commodity.as_str())
        .collect();
    if !volatile.is_empty() {
        recommendations.push(format!(
            "Consider price hedging strategies for {} due to high price volatility.",
            volatile.join(", ")
        ));
    }
    if worst_percent.abs() > 20.0 {
        recommendations.push("Develop contingency plan for market price drops to protect farm income.".to_string());
    }
    if total_percent < -5.0 {
        recommendations.push(
            "Current market trends suggest negative impact on income. Consider diversifying production.".to_string(),
        );
    } else if total_percent > 5.0 {
        recommendations.push(
            "Current market trends favorable. Consider locking in forward contracts at current prices.".to_string(),
        );
    }

    MarketImpact {
        borrower_id: borrower.borrower_id.clone(),
        borrower_name: borrower.full_name(),
        farm_type: borrower.farm_type.clone(),
        annual_income: borrower.income,
        commodity_impacts: impacts,
        projected_income_change: total.round(),
        projected_income_change_percent: round_to(total_percent, 1),
        worst_case_impact: worst.round(),
        worst_case_impact_percent: round_to(worst_percent, 1),
        market_risk_level,
        recommendations,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn borrower(id: &str, farm_type: FarmType, farm_size: f64, income: f64) -> Borrower {
        Borrower {
            borrower_id: id.to_string(),
            first_name: "Test".to_string(),
            last_name: id.to_string(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
            credit_score: 700,
            income,
            farm_size,
            farm_type,
        }
    }

    fn equipment(id: &str, bought: (i32, u32), condition: &str, value: f64, hours: f64) -> Equipment {
        Equipment {
            equipment_id: id.to_string(),
            borrower_id: "B001".to_string(),
            equipment_type: "Tractor".to_string(),
            description: String::new(),
            purchase_date: NaiveDate::from_ymd_opt(bought.0, bought.1, 1),
            condition: Some(condition.to_string()),
            value: Some(value),
            hours_used: Some(hours),
        }
    }

    fn mid_2024() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn test_maintenance_rates() {
        let b = borrower("B001", FarmType::Crop, 500.0, 100000.0);
        let items = vec![
            equipment("E001", (2020, 4), "Good", 310000.0, 1200.0),
            equipment("E002", (2019, 8), "Good", 420000.0, 2150.0),
        ];

        let forecast = maintenance_forecast(&b, &items, ForecastHorizon::OneYear, mid_2024());

        assert_eq!(forecast.equipment_count, 2);
        assert_eq!(forecast.equipment_details[0].annual_maintenance_cost, 6200.0);
        assert!(!forecast.equipment_details[0].major_repair_needed);

        // 430 hours a year adds a point; 2150 hours sits in a service window
        let combine = &forecast.equipment_details[1];
        assert_eq!(combine.annual_maintenance_cost, 12600.0);
        assert_eq!(combine.major_repair_description.as_deref(), Some("Usage threshold service"));
        assert_eq!(combine.major_repair_cost, 21000.0);

        assert_eq!(forecast.annual_maintenance_budget, 18800.0);
        assert_eq!(forecast.total_annual_budget, 39800.0);
        assert_eq!(forecast.horizon_budget, 39800.0);
        assert_eq!(forecast.maintenance_recommendations[0], "Budget $21000 for major repairs in the coming year.");
    }

    #[test]
    fn test_maintenance_old_poor_equipment() {
        let b = borrower("B001", FarmType::Crop, 35.0, 45000.0);
        let items = vec![equipment("E005", (2014, 3), "Poor", 22000.0, 5100.0)];

        let forecast = maintenance_forecast(&b, &items, ForecastHorizon::ThreeYears, mid_2024());

        // (2% + 5 years over + heavy use) * 1.5
        assert_eq!(forecast.equipment_details[0].annual_maintenance_cost, 2640.0);
        assert_eq!(forecast.immediate_major_repairs_cost, 1100.0);
        assert_eq!(forecast.horizon_budget, 2640.0 * 3.0 + 1100.0);
        assert!(forecast
            .maintenance_recommendations
            .iter()
            .any(|r| r == "Consider replacing 1 equipment items over 7 years old to reduce maintenance costs."));
    }

    #[test]
    fn test_major_service_interval() {
        let b = borrower("B001", FarmType::Crop, 500.0, 100000.0);
        let items = vec![equipment("E010", (2021, 1), "Excellent", 100000.0, 300.0)];

        let forecast = maintenance_forecast(&b, &items, ForecastHorizon::OneYear, mid_2024());
        let item = &forecast.equipment_details[0];

        assert_eq!(item.age_years, 3);
        assert_eq!(item.annual_maintenance_cost, 1600.0);
        assert_eq!(item.major_repair_description.as_deref(), Some("Major service interval"));
        assert_eq!(item.major_repair_cost, 5000.0);
    }

    #[test]
    fn test_maintenance_without_equipment() {
        let b = borrower("B006", FarmType::Livestock, 150.0, 55000.0);
        let forecast = maintenance_forecast(&b, &[], ForecastHorizon::TwoYears, mid_2024());

        assert_eq!(forecast.equipment_count, 0);
        assert_eq!(forecast.total_annual_budget, 0.0);
        assert_eq!(forecast.time_horizon, "2y");
        assert_eq!(forecast.maintenance_recommendations, vec!["No equipment on file for this borrower."]);
    }

    #[test]
    fn test_crop_yield_for_crop_farm() {
        let b = borrower("B001", FarmType::Crop, 500.0, 100000.0);
        let result = crop_yield_risk(&b, None, CropSeason::Current, mid_2024());

        let names: Vec<&str> = result.crop_risk_assessments.iter().map(|c| c.crop.as_str()).collect();
        assert_eq!(names, vec!["Corn", "Soybeans"]);

        let corn = &result.crop_risk_assessments[0];
        assert_eq!(corn.acres, 200.0);
        assert_eq!(corn.below_break_even_probability, 0.2);
        assert_eq!(corn.yield_risk_score, 0.37);
        assert_eq!(corn.estimated_profit_per_acre, 230.0);

        assert_eq!(result.overall_break_even_risk, 0.14);
        assert_eq!(result.overall_risk_level, RiskLevel::Low);
        assert_eq!(
            result.recommendations,
            vec!["Consider irrigation strategies to mitigate potential drought impacts."]
        );
    }

    #[test]
    fn test_crop_yield_filter_and_next_season() {
        let b = borrower("B004", FarmType::Mixed, 800.0, 90000.0);

        let wheat = crop_yield_risk(&b, Some("WHEAT"), CropSeason::Next, mid_2024());
        assert_eq!(wheat.crop_risk_assessments.len(), 1);
        let w = &wheat.crop_risk_assessments[0];
        assert_eq!(w.acres, 120.0);
        assert_eq!(w.below_break_even_probability, 0.5);
        assert_eq!(w.risk_level, RiskLevel::Medium);
        assert_eq!(w.yield_risk_score, 0.2);
        assert_eq!(wheat.season, "next");
        assert_eq!(
            wheat.recommendations,
            vec!["Consider diversifying crops to reduce overall yield risk."]
        );

        let all = crop_yield_risk(&b, None, CropSeason::Current, mid_2024());
        assert_eq!(all.crop_risk_assessments.len(), 4);
    }

    #[test]
    fn test_crop_yield_unknown_crop() {
        let b = borrower("B002", FarmType::Livestock, 300.0, 75000.0);
        let result = crop_yield_risk(&b, Some("rice"), CropSeason::Current, mid_2024());

        assert!(result.crop_risk_assessments.is_empty());
        assert_eq!(result.overall_break_even_risk, 0.0);
        assert_eq!(result.overall_risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_market_impact_crop_farm() {
        let b = borrower("B001", FarmType::Crop, 500.0, 100000.0);
        let result = market_price_impact(&b, &[]);

        let corn = &result.commodity_impacts[0];
        assert_eq!(corn.current_value, 196000.0);
        assert_eq!(corn.financial_impact, -19600.0);
        assert_eq!(corn.income_impact_percent, -16.7);
        assert_eq!(corn.downside_risk_20percent, -33320.0);
        assert_eq!(corn.price_risk_level, RiskLevel::High);

        let soy = &result.commodity_impacts[1];
        assert_eq!(soy.financial_impact, 5445.0);

        assert_eq!(result.projected_income_change, -14155.0);
        assert_eq!(result.worst_case_impact, -50744.0);
        assert_eq!(result.market_risk_level, RiskLevel::High);
        assert_eq!(result.recommendations.len(), 3);
        assert!(result.recommendations[0].contains("for Corn due to"));
    }

    #[test]
    fn test_market_impact_input_cost_and_filter() {
        let b = borrower("B002", FarmType::Livestock, 300.0, 75000.0);
        let result = market_price_impact(&b, &["feed"]);

        assert_eq!(result.commodity_impacts.len(), 1);
        let feed = &result.commodity_impacts[0];
        assert!(feed.is_input_cost);
        // 600 tons at 225, up 3%: costs more, so income drops
        assert_eq!(feed.financial_impact, -4050.0);
        assert_eq!(feed.price_risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_market_impact_without_income() {
        let b = borrower("B009", FarmType::Crop, 100.0, 0.0);
        let result = market_price_impact(&b, &["corn"]);

        assert_eq!(result.commodity_impacts[0].income_impact_percent, 0.0);
        assert_eq!(result.worst_case_impact_percent, 0.0);
        assert_eq!(result.market_risk_level, RiskLevel::Low);
    }
}
