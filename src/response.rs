// 📦 Function results
//
// Handlers return the raw API data plus an optional human-readable summary
// and supplementary context. The dispatcher folds them into one payload:
//
//   { ...data, summary?, supplementary_data?, _metadata: {success, function} }
//
// No timestamps: identical calls on unchanged data give identical payloads.

use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionResult {
    pub data: Value,
    pub summary: Option<String>,
    pub supplementary: Option<Value>,
}

impl FunctionResult {
    pub fn new(data: Value) -> Self {
        FunctionResult {
            data,
            summary: None,
            supplementary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_supplementary(mut self, data: Value) -> Self {
        self.supplementary = Some(data);
        self
    }

    /// Final success payload for `function`
    pub fn into_payload(self, function: &str) -> Value {
        let mut object = match self.data {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("result".to_string(), other);
                map
            }
        };

        if let Some(summary) = self.summary {
            object.insert("summary".to_string(), Value::String(summary));
        }
        if let Some(supplementary) = self.supplementary {
            object.insert("supplementary_data".to_string(), supplementary);
        }
        object.insert(
            "_metadata".to_string(),
            json!({ "success": true, "function": function }),
        );

        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_merges_enrichment() {
        let payload = FunctionResult::new(json!({"borrower_id": "B003", "risk_score": 75}))
            .with_summary("high risk")
            .with_supplementary(json!({"comparison": "above"}))
            .into_payload("getBorrowerDefaultRisk");

        assert_eq!(payload["borrower_id"], "B003");
        assert_eq!(payload["summary"], "high risk");
        assert_eq!(payload["supplementary_data"]["comparison"], "above");
        assert_eq!(payload["_metadata"], json!({"success": true, "function": "getBorrowerDefaultRisk"}));
    }

    #[test]
    fn test_non_object_data_is_wrapped() {
        let payload = FunctionResult::new(json!([1, 2])).into_payload("f");
        assert_eq!(payload["result"], json!([1, 2]));
        assert!(payload.get("summary").is_none());
    }
}
