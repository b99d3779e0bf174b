// 📉 Risk Engine - default, non-accrual and collateral assessments
//
// Pure functions over loaded records. The internal API layer loads the
// datasets and hands them in; nothing here touches the filesystem.
//
// Scores are clamped to 0..=100. Levels: high > 70, medium > 40, else low.

use crate::entities::{Borrower, Collateral, FarmType, Loan, Payment};
use serde::{Deserialize, Serialize};

// ============================================================================
// ENUMS
// ============================================================================

/// Ordered low < medium < high
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score > 70 {
            RiskLevel::High
        } else if score > 40 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub const SCHEMA_VALUES: [&'static str; 3] = ["low", "medium", "high"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Horizon for default-risk assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeHorizon {
    /// 3 months - "short term"
    ThreeMonths,
    /// 6 months - "medium term"
    #[default]
    SixMonths,
    /// 12 months - "long term"
    TwelveMonths,
    /// Same horizon as TwelveMonths, kept apart so "1y" echoes back as sent
    OneYear,
}

impl TimeHorizon {
    /// Values advertised to the chat model
    pub const SCHEMA_VALUES: [&'static str; 4] = ["3m", "6m", "12m", "1y"];

    /// Accepts the advertised values plus the REST aliases
    /// (short_term / medium_term / long_term).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "3m" | "short_term" => Some(TimeHorizon::ThreeMonths),
            "6m" | "medium_term" => Some(TimeHorizon::SixMonths),
            "12m" | "long_term" => Some(TimeHorizon::TwelveMonths),
            "1y" => Some(TimeHorizon::OneYear),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeHorizon::ThreeMonths => "3m",
            TimeHorizon::SixMonths => "6m",
            TimeHorizon::TwelveMonths => "12m",
            TimeHorizon::OneYear => "1y",
        }
    }

    pub fn is_long_term(&self) -> bool {
        matches!(self, TimeHorizon::TwelveMonths | TimeHorizon::OneYear)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketConditions {
    #[default]
    Stable,
    Volatile,
    Declining,
    Improving,
}

impl MarketConditions {
    pub const SCHEMA_VALUES: [&'static str; 4] = ["stable", "volatile", "declining", "improving"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "stable" => Some(MarketConditions::Stable),
            "volatile" => Some(MarketConditions::Volatile),
            "declining" => Some(MarketConditions::Declining),
            "improving" => Some(MarketConditions::Improving),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketConditions::Stable => "stable",
            MarketConditions::Volatile => "volatile",
            MarketConditions::Declining => "declining",
            MarketConditions::Improving => "improving",
        }
    }

    /// Multiplier applied to appraised collateral value
    pub fn adjustment_factor(&self) -> f64 {
        match self {
            MarketConditions::Declining => 0.8,
            MarketConditions::Improving => 1.1,
            MarketConditions::Stable | MarketConditions::Volatile => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    pub const SCHEMA_VALUES: [&'static str; 4] = ["spring", "summer", "fall", "winter"];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "spring" => Some(Season::Spring),
            "summer" => Some(Season::Summer),
            "fall" => Some(Season::Fall),
            "winter" => Some(Season::Winter),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }

    /// Points added to the default-risk score for this farm type
    pub fn score_adjustment(&self, farm_type: &FarmType) -> i32 {
        match (self, farm_type) {
            (Season::Winter, FarmType::Crop) => 15,
            (Season::Spring, FarmType::Crop) => 10,
            (Season::Summer, FarmType::Livestock) => 5,
            _ => 0,
        }
    }
}

/// Farm type a crop or herd name narrows the scan to; None means no filter
pub fn farm_type_for_crop(crop_type: &str) -> Option<FarmType> {
    match crop_type.trim().to_lowercase().as_str() {
        "corn" | "wheat" | "soybeans" => Some(FarmType::Crop),
        "livestock" => Some(FarmType::Livestock),
        _ => None,
    }
}

/// Loan-to-value ratio under which collateral counts as sufficient
pub const LTV_SUFFICIENCY_THRESHOLD: f64 = 0.8;

// ============================================================================
// ASSESSMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRiskAssessment {
    pub borrower_id: String,
    pub borrower_name: String,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub time_horizon: String,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonAccrualAssessment {
    pub borrower_id: String,
    pub borrower_name: String,
    pub non_accrual_risk: RiskLevel,
    pub risk_score: u32,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollateralItem {
    pub id: String,
    pub description: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollateralAssessment {
    pub loan_id: String,
    pub loan_type: String,
    pub is_sufficient: bool,
    pub industry_standard_threshold: f64,
    pub current_loan_balance: f64,
    /// Market-adjusted collateral value
    pub collateral_value: f64,
    /// None when the loan has no collateral
    pub collateral_margin_percentage: Option<f64>,
    /// None when the loan has no collateral (ratio would be infinite)
    pub loan_to_value_ratio: Option<f64>,
    pub market_conditions: String,
    pub market_adjustment_factor: f64,
    pub collateral_items: usize,
    pub collateral_details: Vec<CollateralItem>,
    pub assessment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerRiskProfile {
    pub borrower_id: String,
    pub name: String,
    pub farm_type: FarmType,
    pub farm_size: f64,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub risk_factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighRiskFarmers {
    pub count: usize,
    pub farmers: Vec<FarmerRiskProfile>,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtRiskCriteria {
    pub crop_type: Option<String>,
    pub season: Option<String>,
    /// Lowest level included
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmersAtRisk {
    pub count: usize,
    pub criteria: AtRiskCriteria,
    pub farmers: Vec<FarmerRiskProfile>,
}

// ============================================================================
// BORROWER HISTORY
// ============================================================================

/// A borrower's loans and every payment made against them
struct BorrowerHistory<'a> {
    loans: Vec<&'a Loan>,
    payments: Vec<&'a Payment>,
}

impl<'a> BorrowerHistory<'a> {
    fn collect(borrower_id: &str, loans: &'a [Loan], payments: &'a [Payment]) -> Self {
        let loans: Vec<&Loan> = loans.iter().filter(|l| l.borrower_id == borrower_id).collect();
        let payments = payments
            .iter()
            .filter(|p| loans.iter().any(|l| l.loan_id == p.loan_id))
            .collect();

        BorrowerHistory { loans, payments }
    }

    fn late_count(&self) -> usize {
        self.payments.iter().filter(|p| p.is_late()).count()
    }

    fn total_borrowed(&self) -> f64 {
        self.loans.iter().map(|l| l.loan_amount).sum()
    }
}

fn clamp_score(raw: i32) -> u32 {
    raw.clamp(0, 100) as u32
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// DEFAULT RISK
// ============================================================================

struct DefaultScore {
    score: u32,
    factors: Vec<String>,
}

/// `adjustment` is added before clamping
fn score_default(borrower: &Borrower, history: &BorrowerHistory, adjustment: i32) -> DefaultScore {
    let mut score: i32 = 50 + adjustment;

    score += match borrower.credit_score {
        750.. => -15,
        700..=749 => -10,
        650..=699 => -5,
        600..=649 => 0,
        _ => 20,
    };

    let late = history.late_count();
    if late > 3 {
        score += 25;
    } else {
        score += late as i32 * 5;
    }

    let loan_to_income = if borrower.income > 0.0 {
        history.total_borrowed() / borrower.income
    } else {
        f64::INFINITY
    };
    if loan_to_income > 5.0 {
        score += 25;
    } else if loan_to_income > 3.0 {
        score += 15;
    } else if loan_to_income > 2.0 {
        score += 5;
    }

    // Small farms often have less buffer
    if borrower.farm_size < 50.0 {
        score += 10;
    }

    let mut factors = Vec::new();
    if late > 0 {
        factors.push(format!("{} late payment(s) in history", late));
    }
    if loan_to_income.is_infinite() {
        factors.push("High loan-to-income ratio: no reported income".to_string());
    } else if loan_to_income > 2.0 {
        factors.push(format!("High loan-to-income ratio: {:.1}", loan_to_income));
    }
    if borrower.credit_score < 650 {
        factors.push(format!("Below average credit score: {}", borrower.credit_score));
    }
    if borrower.farm_size < 50.0 {
        factors.push("Small farm size may limit production capacity".to_string());
    }

    DefaultScore {
        score: clamp_score(score),
        factors,
    }
}

/// Default-risk assessment for one borrower.
///
/// `loans` and `payments` are the full datasets; the borrower's slice is
/// selected here.
pub fn default_risk(
    borrower: &Borrower,
    loans: &[Loan],
    payments: &[Payment],
    horizon: TimeHorizon,
) -> DefaultRiskAssessment {
    let history = BorrowerHistory::collect(&borrower.borrower_id, loans, payments);

    if history.loans.is_empty() {
        return DefaultRiskAssessment {
            borrower_id: borrower.borrower_id.clone(),
            borrower_name: borrower.full_name(),
            risk_score: 0,
            risk_level: RiskLevel::Low,
            time_horizon: horizon.as_str().to_string(),
            risk_factors: vec!["No loans found for this borrower".to_string()],
            recommendations: vec!["No action required".to_string()],
        };
    }

    let DefaultScore { score, factors } = score_default(borrower, &history, 0);

    let mut recommendations = Vec::new();
    if score > 70 {
        recommendations.push("Consider requiring additional collateral".to_string());
        recommendations.push("Implement more frequent payment monitoring".to_string());
    } else if score > 50 {
        recommendations.push("Monitor seasonal payment patterns closely".to_string());
        recommendations.push("Discuss risk mitigation strategies with borrower".to_string());
    } else {
        recommendations.push("Standard monitoring procedures are sufficient".to_string());
    }

    match horizon {
        TimeHorizon::ThreeMonths if score > 60 => {
            recommendations.push("Immediate review of payment schedule recommended".to_string());
        }
        h if h.is_long_term() && score > 40 => {
            recommendations
                .push("Consider loan restructuring to improve long-term viability".to_string());
        }
        _ => {}
    }

    DefaultRiskAssessment {
        borrower_id: borrower.borrower_id.clone(),
        borrower_name: borrower.full_name(),
        risk_score: score,
        risk_level: RiskLevel::from_score(score),
        time_horizon: horizon.as_str().to_string(),
        risk_factors: factors,
        recommendations,
    }
}

// ============================================================================
// NON-ACCRUAL RISK
// ============================================================================

pub fn non_accrual_risk(borrower: &Borrower, loans: &[Loan], payments: &[Payment]) -> NonAccrualAssessment {
    let history = BorrowerHistory::collect(&borrower.borrower_id, loans, payments);

    if history.loans.is_empty() {
        return NonAccrualAssessment {
            borrower_id: borrower.borrower_id.clone(),
            borrower_name: borrower.full_name(),
            non_accrual_risk: RiskLevel::Low,
            risk_score: 0,
            risk_factors: vec!["No loans found for this borrower".to_string()],
            recommendations: vec!["No action required".to_string()],
        };
    }

    let mut score: i32 = 30;

    let total = history.payments.len();
    let late = history.late_count();
    let late_share = if total > 0 { late as f64 / total as f64 } else { 0.0 };

    if late_share > 0.5 {
        score += 50;
    } else if late_share > 0.3 {
        score += 30;
    } else if late_share > 0.1 {
        score += 15;
    }

    if borrower.credit_score < 600 {
        score += 20;
    } else if borrower.credit_score < 650 {
        score += 10;
    }

    let score = clamp_score(score);
    let level = RiskLevel::from_score(score);

    let mut factors = Vec::new();
    if late > 0 {
        factors.push(format!("{} late payment(s) out of {} total payments", late, total));
    }
    if borrower.credit_score < 650 {
        factors.push(format!("Below average credit score: {}", borrower.credit_score));
    }

    let recommendations = match level {
        RiskLevel::High => vec![
            "Implement enhanced monitoring procedures".to_string(),
            "Consider restructuring loans to reduce default risk".to_string(),
        ],
        RiskLevel::Medium => vec![
            "Schedule review of payment patterns".to_string(),
            "Early intervention to prevent potential issues".to_string(),
        ],
        RiskLevel::Low => vec!["Standard monitoring procedures are sufficient".to_string()],
    };

    NonAccrualAssessment {
        borrower_id: borrower.borrower_id.clone(),
        borrower_name: borrower.full_name(),
        non_accrual_risk: level,
        risk_score: score,
        risk_factors: factors,
        recommendations,
    }
}

// ============================================================================
// COLLATERAL SUFFICIENCY
// ============================================================================

pub fn collateral_sufficiency(
    loan: &Loan,
    collateral: &[Collateral],
    market: MarketConditions,
) -> CollateralAssessment {
    let items: Vec<&Collateral> = collateral.iter().filter(|c| c.loan_id == loan.loan_id).collect();
    let details: Vec<CollateralItem> = items
        .iter()
        .map(|c| CollateralItem {
            id: c.collateral_id.clone(),
            description: c.description.clone(),
            value: c.value,
        })
        .collect();

    // Balance is the original principal; payments are not amortized here
    let balance = loan.loan_amount;
    let factor = market.adjustment_factor();
    let adjusted_value = items.iter().map(|c| c.value).sum::<f64>() * factor;

    if items.is_empty() || adjusted_value <= 0.0 {
        let assessment = if items.is_empty() {
            "No collateral found for this loan."
        } else {
            "Collateral has no recoverable value."
        };
        return CollateralAssessment {
            loan_id: loan.loan_id.clone(),
            loan_type: loan.loan_type.clone(),
            is_sufficient: false,
            industry_standard_threshold: LTV_SUFFICIENCY_THRESHOLD,
            current_loan_balance: balance,
            collateral_value: 0.0,
            collateral_margin_percentage: None,
            loan_to_value_ratio: None,
            market_conditions: market.as_str().to_string(),
            market_adjustment_factor: factor,
            collateral_items: details.len(),
            collateral_details: details,
            assessment: assessment.to_string(),
        };
    }

    let ltv = balance / adjusted_value;
    let assessment = if ltv < 0.5 {
        "Collateral is highly sufficient with significant equity buffer."
    } else if ltv < 0.7 {
        "Collateral is adequate with reasonable equity margin."
    } else if ltv < 0.8 {
        "Collateral is minimally sufficient. Consider monitoring valuations."
    } else if ltv < 1.0 {
        "Collateral is below recommended levels but still covers the loan. Consider requesting additional security."
    } else {
        "Insufficient collateral. Loan is under-secured based on current valuations."
    };

    let margin = if balance > 0.0 {
        Some(round_to((adjusted_value - balance) / balance * 100.0, 1))
    } else {
        None
    };

    CollateralAssessment {
        loan_id: loan.loan_id.clone(),
        loan_type: loan.loan_type.clone(),
        is_sufficient: ltv < LTV_SUFFICIENCY_THRESHOLD,
        industry_standard_threshold: LTV_SUFFICIENCY_THRESHOLD,
        current_loan_balance: balance,
        collateral_value: adjusted_value,
        collateral_margin_percentage: margin,
        loan_to_value_ratio: Some(round_to(ltv, 2)),
        market_conditions: market.as_str().to_string(),
        market_adjustment_factor: factor,
        collateral_items: details.len(),
        collateral_details: details,
        assessment: assessment.to_string(),
    }
}

// ============================================================================
// PORTFOLIO SCAN
// ============================================================================

pub fn farmer_profile(borrower: &Borrower, loans: &[Loan], payments: &[Payment]) -> FarmerRiskProfile {
    seasonal_profile(borrower, loans, payments, None)
}

fn seasonal_profile(
    borrower: &Borrower,
    loans: &[Loan],
    payments: &[Payment],
    season: Option<Season>,
) -> FarmerRiskProfile {
    let history = BorrowerHistory::collect(&borrower.borrower_id, loans, payments);

    let (score, factors) = if history.loans.is_empty() {
        (0, Vec::new())
    } else {
        let adjustment = season.map_or(0, |s| s.score_adjustment(&borrower.farm_type));
        let scored = score_default(borrower, &history, adjustment);
        (scored.score, scored.factors)
    };

    FarmerRiskProfile {
        borrower_id: borrower.borrower_id.clone(),
        name: borrower.full_name(),
        farm_type: borrower.farm_type.clone(),
        farm_size: borrower.farm_size,
        risk_score: score,
        risk_level: RiskLevel::from_score(score),
        risk_factors: factors,
    }
}

/// Every borrower scoring high on default risk, riskiest first
pub fn high_risk_farmers(borrowers: &[Borrower], loans: &[Loan], payments: &[Payment]) -> HighRiskFarmers {
    let mut farmers: Vec<FarmerRiskProfile> = borrowers
        .iter()
        .map(|b| farmer_profile(b, loans, payments))
        .filter(|p| p.risk_level == RiskLevel::High)
        .collect();

    farmers.sort_by(|a, b| {
        b.risk_score
            .cmp(&a.risk_score)
            .then_with(|| a.borrower_id.cmp(&b.borrower_id))
    });

    HighRiskFarmers {
        count: farmers.len(),
        farmers,
        risk_level: RiskLevel::High,
    }
}

/// Borrowers at or above `min_level`, optionally narrowed by crop and
/// scored with a seasonal adjustment. Riskiest first.
pub fn farmers_at_risk(
    borrowers: &[Borrower],
    loans: &[Loan],
    payments: &[Payment],
    crop_type: Option<&str>,
    season: Option<Season>,
    min_level: RiskLevel,
) -> FarmersAtRisk {
    let farm_type = crop_type.and_then(farm_type_for_crop);

    let mut farmers: Vec<FarmerRiskProfile> = borrowers
        .iter()
        .filter(|b| farm_type.as_ref().map_or(true, |t| &b.farm_type == t))
        .map(|b| seasonal_profile(b, loans, payments, season))
        .filter(|p| p.risk_level >= min_level)
        .collect();

    farmers.sort_by(|a, b| {
        b.risk_score
            .cmp(&a.risk_score)
            .then_with(|| a.borrower_id.cmp(&b.borrower_id))
    });

    FarmersAtRisk {
        count: farmers.len(),
        criteria: AtRiskCriteria {
            crop_type: crop_type.map(str::to_string),
            season: season.map(|s| s.as_str().to_string()),
            risk_level: min_level,
        },
        farmers,
    }
}

// ============================================================================
// TESTS
// ============================================================================
