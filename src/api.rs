// 🔌 Internal API Layer
//
// Scans, filters and joins over the DataStore plus the computed risk
// metrics. The HTTP routes call the typed StoreApi methods directly; the
// dispatcher goes through the InternalApi trait so handlers can be
// exercised against a mock.

use crate::advisory::{self, RefinanceOptions, RestructuringGoal, RestructuringPlan};
use crate::analytics::{self, AnalysisPeriod, LoanSummary, PaymentPatterns};
use crate::entities::{Borrower, Collateral, EntityKind, Equipment, Loan, LoanStatus, Payment};
use crate::error::ApiError;
use crate::forecast::{
    self, CropSeason, CropYieldAssessment, ForecastHorizon, MaintenanceForecast, MarketImpact,
};
use crate::risk::{
    self, CollateralAssessment, DefaultRiskAssessment, FarmersAtRisk, HighRiskFarmers,
    MarketConditions, NonAccrualAssessment, RiskLevel, Season, TimeHorizon,
};
use crate::store::DataStore;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

// ============================================================================
// REQUESTS
// ============================================================================

/// One internal API call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiRequest {
    Borrowers,
    Borrower { id: String },
    BorrowerLoans { id: String },
    BorrowerEquipment { id: String },
    Loans,
    LoanDetails { id: String },
    LoanStatus { id: String },
    LoanPayments { id: String },
    LoanCollateral { id: String },
    ActiveLoans,
    LoanSummary,
    DefaultRisk { borrower_id: String, horizon: TimeHorizon },
    NonAccrualRisk { borrower_id: String },
    CollateralSufficiency { loan_id: String, market: MarketConditions },
    HighRiskFarmers,
    FarmersAtRisk { crop_type: Option<String>, season: Option<Season>, min_level: RiskLevel },
    PaymentPatterns { borrower_id: String, period: AnalysisPeriod },
    RefinanceOptions { loan_id: String },
    Restructuring { loan_id: String, goal: RestructuringGoal },
    EquipmentForecast { borrower_id: String, horizon: ForecastHorizon },
    CropYieldRisk { borrower_id: String, crop_type: Option<String>, season: CropSeason },
    MarketImpact { borrower_id: String, commodities: Vec<String> },
}

impl ApiRequest {
    /// REST path serving the same data, for logs
    pub fn path(&self) -> String {
        let enc = |id: &str| urlencoding::encode(id).into_owned();
        match self {
            ApiRequest::Borrowers => "/api/borrowers".to_string(),
            ApiRequest::Borrower { id } => format!("/api/borrowers/{}", enc(id)),
            ApiRequest::BorrowerLoans { id } => format!("/api/borrowers/{}/loans", enc(id)),
            ApiRequest::BorrowerEquipment { id } => format!("/api/borrowers/{}/equipment", enc(id)),
            ApiRequest::Loans => "/api/loans".to_string(),
            ApiRequest::LoanDetails { id } => format!("/api/loans/{}", enc(id)),
            ApiRequest::LoanStatus { id } => format!("/api/loans/{}/status", enc(id)),
            ApiRequest::LoanPayments { id } => format!("/api/loans/{}/payments", enc(id)),
            ApiRequest::LoanCollateral { id } => format!("/api/loans/{}/collateral", enc(id)),
            ApiRequest::ActiveLoans => "/api/loans/active".to_string(),
            ApiRequest::LoanSummary => "/api/loans/summary".to_string(),
            ApiRequest::DefaultRisk { borrower_id, horizon } => format!(
                "/api/risk/default/{}?time_horizon={}",
                enc(borrower_id),
                horizon.as_str()
            ),
            ApiRequest::NonAccrualRisk { borrower_id } => {
                format!("/api/risk/non-accrual/{}", enc(borrower_id))
            }
            ApiRequest::CollateralSufficiency { loan_id, market } => format!(
                "/api/risk/collateral/{}?market_conditions={}",
                enc(loan_id),
                market.as_str()
            ),
            ApiRequest::HighRiskFarmers => "/api/risk/high-risk-farmers".to_string(),
            ApiRequest::FarmersAtRisk { crop_type, season, min_level } => {
                let mut path = format!("/api/risk/farmers-at-risk?risk_level={}", min_level.as_str());
                if let Some(crop) = crop_type {
                    path.push_str(&format!("&crop_type={}", enc(crop)));
                }
                if let Some(season) = season {
                    path.push_str(&format!("&season={}", season.as_str()));
                }
                path
            }
            ApiRequest::PaymentPatterns { borrower_id, period } => format!(
                "/api/analytics/payment-patterns/{}?period={}",
                enc(borrower_id),
                period.as_str()
            ),
            ApiRequest::RefinanceOptions { loan_id } => {
                format!("/api/analytics/recommendations/refinance/{}", enc(loan_id))
            }
            ApiRequest::Restructuring { loan_id, goal } => format!(
                "/api/analytics/restructure/{}?goal={}",
                enc(loan_id),
                goal.as_str()
            ),
            ApiRequest::EquipmentForecast { borrower_id, horizon } => format!(
                "/api/analytics/equipment/forecast/{}?time_horizon={}",
                enc(borrower_id),
                horizon.as_str()
            ),
            ApiRequest::CropYieldRisk { borrower_id, crop_type, season } => {
                let mut path = format!(
                    "/api/analytics/crop-yield/{}?season={}",
                    enc(borrower_id),
                    season.as_str()
                );
                if let Some(crop) = crop_type {
                    path.push_str(&format!("&crop_type={}", enc(crop)));
                }
                path
            }
            ApiRequest::MarketImpact { borrower_id, commodities } => {
                let mut path = format!("/api/analytics/market-impact/{}", enc(borrower_id));
                if !commodities.is_empty() {
                    path.push_str(&format!("?commodities={}", enc(&commodities.join(","))));
                }
                path
            }
        }
    }
}

/// Seam between function handlers and the data they read
pub trait InternalApi: Send + Sync {
    fn call(&self, request: &ApiRequest) -> Result<Value, ApiError>;
}

// ============================================================================
// VIEWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub borrower: Option<Borrower>,
    pub payments: Vec<Payment>,
    pub collateral: Vec<Collateral>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanStatusView {
    pub loan_id: String,
    pub status: LoanStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveLoan {
    #[serde(flatten)]
    pub loan: Loan,
    /// Borrower full name, "Unknown" when the borrower record is missing
    pub borrower: String,
    pub borrower_details: Option<Borrower>,
}

// ============================================================================
// STORE-BACKED API
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoreApi {
    store: DataStore,
    as_of: Option<NaiveDate>,
}

impl StoreApi {
    pub fn new(store: DataStore) -> Self {
        StoreApi { store, as_of: None }
    }

    /// Pin "today" for payment-pattern windows
    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Local::now().date_naive())
    }

    // ------------------------------------------------------------------
    // Borrowers
    // ------------------------------------------------------------------

    pub fn borrowers(&self) -> Result<Vec<Borrower>, ApiError> {
        Ok(self.store.borrowers()?)
    }

    pub fn borrower(&self, id: &str) -> Result<Borrower, ApiError> {
        self.store
            .borrowers()?
            .into_iter()
            .find(|b| b.borrower_id == id)
            .ok_or_else(|| ApiError::not_found(EntityKind::Borrower, id))
    }

    pub fn borrower_loans(&self, id: &str) -> Result<Vec<Loan>, ApiError> {
        Ok(self
            .store
            .loans()?
            .into_iter()
            .filter(|l| l.borrower_id == id)
            .collect())
    }

    pub fn borrower_equipment(&self, id: &str) -> Result<Vec<Equipment>, ApiError> {
        Ok(self
            .store
            .equipment()?
            .into_iter()
            .filter(|e| e.borrower_id == id)
            .collect())
    }

    // ------------------------------------------------------------------
    // Loans
    // ------------------------------------------------------------------

    pub fn loans(&self) -> Result<Vec<Loan>, ApiError> {
        Ok(self.store.loans()?)
    }

    pub fn loan(&self, id: &str) -> Result<Loan, ApiError> {
        self.store
            .loans()?
            .into_iter()
            .find(|l| l.loan_id == id)
            .ok_or_else(|| ApiError::not_found(EntityKind::Loan, id))
    }

    pub fn loan_details(&self, id: &str) -> Result<LoanDetails, ApiError> {
        let loan = self.loan(id)?;
        let borrower = self
            .store
            .borrowers()?
            .into_iter()
            .find(|b| b.borrower_id == loan.borrower_id);

        Ok(LoanDetails {
            borrower,
            payments: self.loan_payments(id)?,
            collateral: self.loan_collateral(id)?,
            loan,
        })
    }

    pub fn loan_status(&self, id: &str) -> Result<LoanStatusView, ApiError> {
        let loan = self.loan(id)?;
        Ok(LoanStatusView {
            loan_id: loan.loan_id,
            status: loan.status,
        })
    }

    pub fn loan_payments(&self, id: &str) -> Result<Vec<Payment>, ApiError> {
        Ok(self
            .store
            .payments()?
            .into_iter()
            .filter(|p| p.loan_id == id)
            .collect())
    }

    pub fn loan_collateral(&self, id: &str) -> Result<Vec<Collateral>, ApiError> {
        Ok(self
            .store
            .collateral()?
            .into_iter()
            .filter(|c| c.loan_id == id)
            .collect())
    }

    pub fn active_loans(&self) -> Result<Vec<ActiveLoan>, ApiError> {
        let borrowers = self.store.borrowers()?;

        Ok(self
            .store
            .loans()?
            .into_iter()
            .filter(Loan::is_active)
            .map(|loan| {
                let details = borrowers
                    .iter()
                    .find(|b| b.borrower_id == loan.borrower_id)
                    .cloned();
                ActiveLoan {
                    borrower: details
                        .as_ref()
                        .map(Borrower::full_name)
                        .unwrap_or_else(|| "Unknown".to_string()),
                    borrower_details: details,
                    loan,
                }
            })
            .collect())
    }

    pub fn loan_summary(&self) -> Result<LoanSummary, ApiError> {
        Ok(analytics::loan_summary(&self.store.loans()?, &self.store.payments()?))
    }

    // ------------------------------------------------------------------
    // Risk & analytics
    // ------------------------------------------------------------------

    pub fn default_risk(&self, borrower_id: &str, horizon: TimeHorizon) -> Result<DefaultRiskAssessment, ApiError> {
        let borrower = self.borrower(borrower_id)?;
        Ok(risk::default_risk(
            &borrower,
            &self.store.loans()?,
            &self.store.payments()?,
            horizon,
        ))
    }

    pub fn non_accrual_risk(&self, borrower_id: &str) -> Result<NonAccrualAssessment, ApiError> {
        let borrower = self.borrower(borrower_id)?;
        Ok(risk::non_accrual_risk(
            &borrower,
            &self.store.loans()?,
            &self.store.payments()?,
        ))
    }

    pub fn collateral_sufficiency(
        &self,
        loan_id: &str,
        market: MarketConditions,
    ) -> Result<CollateralAssessment, ApiError> {
        let loan = self.loan(loan_id)?;
        Ok(risk::collateral_sufficiency(&loan, &self.store.collateral()?, market))
    }

    pub fn high_risk_farmers(&self) -> Result<HighRiskFarmers, ApiError> {
        Ok(risk::high_risk_farmers(
            &self.store.borrowers()?,
            &self.store.loans()?,
            &self.store.payments()?,
        ))
    }

    pub fn farmers_at_risk(
        &self,
        crop_type: Option<&str>,
        season: Option<Season>,
        min_level: RiskLevel,
    ) -> Result<FarmersAtRisk, ApiError> {
        Ok(risk::farmers_at_risk(
            &self.store.borrowers()?,
            &self.store.loans()?,
            &self.store.payments()?,
            crop_type,
            season,
            min_level,
        ))
    }

    pub fn payment_patterns(&self, borrower_id: &str, period: AnalysisPeriod) -> Result<PaymentPatterns, ApiError> {
        let borrower = self.borrower(borrower_id)?;
        Ok(analytics::payment_patterns(
            &borrower,
            &self.store.loans()?,
            &self.store.payments()?,
            period,
            self.today(),
        ))
    }

    // ------------------------------------------------------------------
    // Advisory & forecasts
    // ------------------------------------------------------------------

    pub fn refinance_options(&self, loan_id: &str) -> Result<RefinanceOptions, ApiError> {
        let loan = self.loan(loan_id)?;
        Ok(advisory::refinance_options(&loan, &self.store.payments()?))
    }

    pub fn restructuring_options(&self, loan_id: &str, goal: RestructuringGoal) -> Result<RestructuringPlan, ApiError> {
        let loan = self.loan(loan_id)?;
        let borrower = self.borrower(&loan.borrower_id)?;
        Ok(advisory::restructuring_options(
            &loan,
            &borrower,
            &self.store.payments()?,
            goal,
            self.today(),
        ))
    }

    pub fn equipment_forecast(&self, borrower_id: &str, horizon: ForecastHorizon) -> Result<MaintenanceForecast, ApiError> {
        let borrower = self.borrower(borrower_id)?;
        Ok(forecast::maintenance_forecast(
            &borrower,
            &self.store.equipment()?,
            horizon,
            self.today(),
        ))
    }

    pub fn crop_yield_risk(
        &self,
        borrower_id: &str,
        crop_type: Option<&str>,
        season: CropSeason,
    ) -> Result<CropYieldAssessment, ApiError> {
        let borrower = self.borrower(borrower_id)?;
        Ok(forecast::crop_yield_risk(&borrower, crop_type, season, self.today()))
    }

    pub fn market_impact(&self, borrower_id: &str, commodities: &[&str]) -> Result<MarketImpact, ApiError> {
        let borrower = self.borrower(borrower_id)?;
        Ok(forecast::market_price_impact(&borrower, commodities))
    }
}

impl InternalApi for StoreApi {
    fn call(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        debug!(path = %request.path(), "internal api call");

        let value = match request {
            ApiRequest::Borrowers => serde_json::to_value(self.borrowers()?)?,
            ApiRequest::Borrower { id } => serde_json::to_value(self.borrower(id)?)?,
            ApiRequest::BorrowerLoans { id } => serde_json::to_value(self.borrower_loans(id)?)?,
            ApiRequest::BorrowerEquipment { id } => serde_json::to_value(self.borrower_equipment(id)?)?,
            ApiRequest::Loans => serde_json::to_value(self.loans()?)?,
            ApiRequest::LoanDetails { id } => serde_json::to_value(self.loan_details(id)?)?,
            ApiRequest::LoanStatus { id } => serde_json::to_value(self.loan_status(id)?)?,
            ApiRequest::LoanPayments { id } => serde_json::to_value(self.loan_payments(id)?)?,
            ApiRequest::LoanCollateral { id } => serde_json::to_value(self.loan_collateral(id)?)?,
            ApiRequest::ActiveLoans => serde_json::to_value(self.active_loans()?)?,
            ApiRequest::LoanSummary => serde_json::to_value(self.loan_summary()?)?,
            ApiRequest::DefaultRisk { borrower_id, horizon } => {
                serde_json::to_value(self.default_risk(borrower_id, *horizon)?)?
            }
            ApiRequest::NonAccrualRisk { borrower_id } => {
                serde_json::to_value(self.non_accrual_risk(borrower_id)?)?
            }
            ApiRequest::CollateralSufficiency { loan_id, market } => {
                serde_json::to_value(self.collateral_sufficiency(loan_id, *market)?)?
            }
            ApiRequest::HighRiskFarmers => serde_json::to_value(self.high_risk_farmers()?)?,
            ApiRequest::FarmersAtRisk { crop_type, season, min_level } => {
                serde_json::to_value(self.farmers_at_risk(crop_type.as_deref(), *season, *min_level)?)?
            }
            ApiRequest::PaymentPatterns { borrower_id, period } => {
                serde_json::to_value(self.payment_patterns(borrower_id, *period)?)?
            }
            ApiRequest::RefinanceOptions { loan_id } => serde_json::to_value(self.refinance_options(loan_id)?)?,
            ApiRequest::Restructuring { loan_id, goal } => {
                serde_json::to_value(self.restructuring_options(loan_id, *goal)?)?
            }
            ApiRequest::EquipmentForecast { borrower_id, horizon } => {
                serde_json::to_value(self.equipment_forecast(borrower_id, *horizon)?)?
            }
            ApiRequest::CropYieldRisk { borrower_id, crop_type, season } => {
                serde_json::to_value(self.crop_yield_risk(borrower_id, crop_type.as_deref(), *season)?)?
            }
            ApiRequest::MarketImpact { borrower_id, commodities } => {
                let names: Vec<&str> = commodities.iter().map(String::as_str).collect();
                serde_json::to_value(self.market_impact(borrower_id, &names)?)?
            }
        };

        Ok(value)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::RiskLevel;

    fn seeded() -> StoreApi {
        StoreApi::new(DataStore::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data")))
            .with_as_of(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
    }

    #[test]
    fn test_unknown_borrower_is_not_found() {
        let err = seeded().borrower("B999").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Borrower not found");
    }

    #[test]
    fn test_seeded_default_risk_scores() {
        let api = seeded();

        let b003 = api.default_risk("B003", TimeHorizon::SixMonths).unwrap();
        assert_eq!(b003.risk_score, 75);
        assert_eq!(b003.risk_level, RiskLevel::High);

        assert_eq!(api.default_risk("B001", TimeHorizon::SixMonths).unwrap().risk_score, 35);
        assert_eq!(api.default_risk("B005", TimeHorizon::SixMonths).unwrap().risk_score, 100);
        assert_eq!(api.default_risk("B006", TimeHorizon::SixMonths).unwrap().risk_score, 0);
    }

    #[test]
    fn test_seeded_non_accrual() {
        let b003 = seeded().non_accrual_risk("B003").unwrap();
        assert_eq!(b003.risk_score, 55);
        assert_eq!(b003.non_accrual_risk, RiskLevel::Medium);
    }

    #[test]
    fn test_seeded_collateral() {
        let api = seeded();

        let l001 = api.collateral_sufficiency("L001", MarketConditions::Stable).unwrap();
        assert!(l001.is_sufficient);

        let l003 = api.collateral_sufficiency("L003", MarketConditions::Stable).unwrap();
        assert_eq!(l003.loan_to_value_ratio, Some(1.25));
        assert!(!l003.is_sufficient);
    }

    #[test]
    fn test_active_loans_join_borrower_name() {
        let active = seeded().active_loans().unwrap();

        assert!(active.iter().all(|l| l.loan.is_active()));
        let l001 = active.iter().find(|l| l.loan.loan_id == "L001").unwrap();
        assert_eq!(l001.borrower, "John Doe");
    }

    #[test]
    fn test_loan_details_include_children() {
        let details = seeded().loan_details("L001").unwrap();

        assert_eq!(details.borrower.unwrap().borrower_id, "B001");
        assert!(!details.payments.is_empty());
        assert!(details.payments.iter().all(|p| p.loan_id == "L001"));
    }

    #[test]
    fn test_call_serializes_flattened_loan() {
        let value = seeded()
            .call(&ApiRequest::LoanDetails { id: "L001".to_string() })
            .unwrap();

        assert_eq!(value["loan_id"], "L001");
        assert!(value["collateral"].is_array());
    }

    #[test]
    fn test_high_risk_farmers_seeded() {
        let result = seeded().high_risk_farmers().unwrap();
        let ids: Vec<&str> = result.farmers.iter().map(|f| f.borrower_id.as_str()).collect();
        assert_eq!(ids, vec!["B005", "B003"]);
    }

    #[test]
    fn test_seeded_farmers_at_risk() {
        let api = seeded();

        let high = api.farmers_at_risk(None, None, RiskLevel::High).unwrap();
        let ids: Vec<&str> = high.farmers.iter().map(|f| f.borrower_id.as_str()).collect();
        assert_eq!(ids, vec!["B005", "B003"]);

        let herds = api.farmers_at_risk(Some("livestock"), None, RiskLevel::Medium).unwrap();
        let ids: Vec<&str> = herds.farmers.iter().map(|f| f.borrower_id.as_str()).collect();
        assert_eq!(ids, vec!["B002"]);

        let winter = api.farmers_at_risk(None, Some(Season::Winter), RiskLevel::High).unwrap();
        let b003 = winter.farmers.iter().find(|f| f.borrower_id == "B003").unwrap();
        assert_eq!(b003.risk_score, 90);
    }

    #[test]
    fn test_seeded_restructuring_uses_as_of() {
        let plan = seeded()
            .restructuring_options("L001", RestructuringGoal::LowerPayments)
            .unwrap();

        assert_eq!(plan.remaining_term_months, 43);
        assert_eq!(plan.borrower_name, "John Doe");
        assert_eq!(plan.restructuring_options.len(), 3);
    }

    #[test]
    fn test_seeded_equipment_forecast() {
        let forecast = seeded().equipment_forecast("B001", ForecastHorizon::OneYear).unwrap();

        assert_eq!(forecast.equipment_count, 2);
        assert_eq!(forecast.total_annual_budget, 39800.0);
        assert_eq!(forecast.immediate_major_repairs_cost, 21000.0);

        let err = seeded().equipment_forecast("B999", ForecastHorizon::OneYear).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_request_paths() {
        let req = ApiRequest::DefaultRisk {
            borrower_id: "B003".to_string(),
            horizon: TimeHorizon::ThreeMonths,
        };
        assert_eq!(req.path(), "/api/risk/default/B003?time_horizon=3m");
        assert_eq!(ApiRequest::ActiveLoans.path(), "/api/loans/active");

        let odd = ApiRequest::LoanStatus {
            id: "L 1/2".to_string(),
        };
        assert_eq!(odd.path(), "/api/loans/L%201%2F2/status");

        let market = ApiRequest::MarketImpact {
            borrower_id: "B001".to_string(),
            commodities: vec!["corn".to_string(), "soybeans".to_string()],
        };
        assert_eq!(market.path(), "/api/analytics/market-impact/B001?commodities=corn%2Csoybeans");

        let scan = ApiRequest::FarmersAtRisk {
            crop_type: Some("corn".to_string()),
            season: Some(Season::Winter),
            min_level: RiskLevel::Medium,
        };
        assert_eq!(
            scan.path(),
            "/api/risk/farmers-at-risk?risk_level=medium&crop_type=corn&season=winter"
        );
    }
}
