// 📚 Function Registry
//
// Static table of the operations the chat model may call. Each entry holds
// the advertised description, its ParameterSchema and a plain fn handler.
// Built once at startup, read-only afterwards.

use crate::api::InternalApi;
use crate::error::DispatchError;
use crate::functions;
use crate::params::ParameterSchema;
use crate::response::FunctionResult;
use crate::validation::ValidatedArgs;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Handler: runs one or more internal API calls for validated arguments
pub type Handler = fn(&dyn InternalApi, &ValidatedArgs) -> Result<FunctionResult, DispatchError>;

// ============================================================================
// DESCRIPTOR
// ============================================================================

#[derive(Clone)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
    pub handler: Handler,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, handler: Handler) -> Self {
        FunctionDescriptor {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::new(),
            handler,
        }
    }

    pub fn with_parameters(mut self, parameters: ParameterSchema) -> Self {
        self.parameters = parameters;
        self
    }

    /// OpenAI function format: `{name, description, parameters}`
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters.to_json(),
        })
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, FunctionDescriptor>,
}

impl FunctionRegistry {
    /// Empty registry
    pub fn empty() -> Self {
        FunctionRegistry {
            functions: BTreeMap::new(),
        }
    }

    /// Registry with every loan, borrower and risk function
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for descriptor in functions::all() {
            registry.register(descriptor);
        }
        registry
    }

    /// Add or replace a function
    pub fn register(&mut self, descriptor: FunctionDescriptor) {
        self.functions.insert(descriptor.name.clone(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    pub fn list(&self) -> Vec<&FunctionDescriptor> {
        self.functions.values().collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    /// Descriptor list handed to the chat model
    pub fn schemas(&self) -> Vec<Value> {
        self.functions.values().map(FunctionDescriptor::to_json).collect()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: [&str; 20] = [
        "analyzeMarketPriceImpact",
        "analyzePaymentPatterns",
        "assessCropYieldRisk",
        "evaluateCollateralSufficiency",
        "findFarmersAtRisk",
        "forecastEquipmentMaintenance",
        "getActiveLoans",
        "getBorrowerDefaultRisk",
        "getBorrowerDetails",
        "getBorrowerEquipment",
        "getBorrowerNonAccrualRisk",
        "getHighRiskFarmers",
        "getLoanCollateral",
        "getLoanDetails",
        "getLoanPayments",
        "getLoanStatus",
        "getLoanSummary",
        "getLoansByBorrower",
        "recommendLoanRestructuring",
        "recommendRefinancingOptions",
    ];

    #[test]
    fn test_all_functions_registered() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.names(), EXPECTED.to_vec());
    }

    #[test]
    fn test_required_is_subset_of_properties() {
        let registry = FunctionRegistry::new();

        for name in EXPECTED {
            let schema = registry.get(name).unwrap().to_json();
            let properties = schema["parameters"]["properties"].as_object().unwrap();
            for required in schema["parameters"]["required"].as_array().unwrap() {
                let key = required.as_str().unwrap();
                assert!(properties.contains_key(key), "{} requires undeclared {}", name, key);
            }
        }
    }

    #[test]
    fn test_unknown_name_is_none() {
        assert!(FunctionRegistry::new().get("deleteEverything").is_none());
    }

    #[test]
    fn test_schemas_have_descriptions() {
        for schema in FunctionRegistry::new().schemas() {
            assert!(!schema["description"].as_str().unwrap().is_empty());
            assert_eq!(schema["parameters"]["type"], "object");
        }
    }

    #[test]
    fn test_register_replaces_entry() {
        fn noop(_: &dyn InternalApi, _: &ValidatedArgs) -> Result<FunctionResult, DispatchError> {
            Ok(FunctionResult::new(json!({})))
        }

        let mut registry = FunctionRegistry::empty();
        registry.register(FunctionDescriptor::new("ping", "first", noop));
        registry.register(FunctionDescriptor::new("ping", "second", noop));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("ping").unwrap().description, "second");
    }
}
