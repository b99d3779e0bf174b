// LoanOfficerAI - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod entities;
pub mod error;
pub mod store;

pub mod params;      // Parameter schemas for callable functions
pub mod validation;  // Argument validation ahead of any data access
pub mod risk;        // Default, non-accrual and collateral risk
pub mod analytics;   // Payment patterns and portfolio summary
pub mod advisory;    // Refinancing and restructuring options
pub mod forecast;    // Equipment, crop yield and commodity price forecasts
pub mod api;         // Internal API over the data store
pub mod response;
pub mod registry;
pub mod functions;
pub mod context;
pub mod redact;
pub mod dispatcher;
pub mod integrity;   // Referential checks over the JSON files

pub mod config;
pub mod logging;

#[cfg(feature = "server")]
pub mod chat;
#[cfg(feature = "server")]
pub mod http;

// Re-export commonly used types
pub use entities::{
    Borrower, Collateral, EntityKind, Equipment, FarmType,
    Loan, LoanStatus, Payment, PaymentStatus,
};
pub use error::{ApiError, DispatchError, StoreError};
pub use store::{DataStore, Dataset};
pub use params::{IdFormat, ParamSpec, ParamType, ParameterSchema};
pub use validation::{ValidatedArgs, ValidationError, Validator};
pub use risk::{
    CollateralAssessment, DefaultRiskAssessment, FarmersAtRisk, HighRiskFarmers,
    MarketConditions, NonAccrualAssessment, RiskLevel, Season, TimeHorizon,
};
pub use analytics::{AnalysisPeriod, LoanSummary, PaymentPatterns};
pub use advisory::{RefinanceOptions, RestructuringGoal, RestructuringPlan};
pub use forecast::{
    CropSeason, CropYieldAssessment, ForecastHorizon, MaintenanceForecast, MarketImpact,
};
pub use api::{ApiRequest, InternalApi, StoreApi};
pub use response::FunctionResult;
pub use registry::{FunctionDescriptor, FunctionRegistry, Handler};
pub use context::RequestContext;
pub use dispatcher::Dispatcher;
pub use integrity::{check_integrity, IntegrityIssue, IntegrityReport, Severity};
pub use config::{AppConfig, ConfigError, LogFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
