// 🔒 PII redaction for log output
//
// Values under sensitive keys are replaced with "[REDACTED]" at any depth.
// A key is sensitive when it names a known PII field or carries a
// credential fragment anywhere in it (api_key, access_token, ...).
// Only applied to copies destined for logs; payloads returned to callers
// are untouched.

use serde_json::Value;

pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEYS: [&str; 24] = [
    "ssn",
    "social_security_number",
    "socialSecurityNumber",
    "phone",
    "phone_number",
    "phoneNumber",
    "email",
    "email_address",
    "emailAddress",
    "address",
    "street_address",
    "streetAddress",
    "dob",
    "date_of_birth",
    "dateOfBirth",
    "bank_account",
    "bankAccount",
    "account_number",
    "accountNumber",
    "routing_number",
    "routingNumber",
    "credit_card",
    "creditCard",
    "card_number",
];

// Matched anywhere in the lowercased key
const SENSITIVE_FRAGMENTS: [&str; 6] = ["password", "token", "secret", "key", "ssn", "social"];

pub fn is_sensitive(key: &str) -> bool {
    if SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key)) {
        return true;
    }
    let lower = key.to_ascii_lowercase();
    SENSITIVE_FRAGMENTS.iter().any(|f| lower.contains(f))
}

/// Redacted copy of `value`
pub fn redact_pii(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| {
                    let v = if is_sensitive(key) && !v.is_null() {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_pii(v)
                    };
                    (key.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_pii).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redacts_nested_fields() {
        let input = json!({
            "borrower_id": "B001",
            "email": "john@example.com",
            "borrower_details": {
                "phone": "555-1234",
                "address": "123 Farm Rd",
                "credit_score": 750
            },
            "payments": [{"accountNumber": "99887766", "amount": 10}]
        });

        let out = redact_pii(&input);

        assert_eq!(out["borrower_id"], "B001");
        assert_eq!(out["email"], REDACTED);
        assert_eq!(out["borrower_details"]["phone"], REDACTED);
        assert_eq!(out["borrower_details"]["address"], REDACTED);
        assert_eq!(out["borrower_details"]["credit_score"], 750);
        assert_eq!(out["payments"][0]["accountNumber"], REDACTED);
        assert_eq!(out["payments"][0]["amount"], 10);
    }

    #[test]
    fn test_case_insensitive_keys_and_nulls() {
        let out = redact_pii(&json!({"SSN": "123-45-6789", "dob": null}));

        assert_eq!(out["SSN"], REDACTED);
        assert!(out["dob"].is_null());
    }

    #[test]
    fn test_credentials_and_address_variants() {
        let out = redact_pii(&json!({
            "password": "hunter2",
            "api_key": "sk-live",
            "access_token": "tok",
            "clientSecret": "s3",
            "email_address": "a@b.c",
            "streetAddress": "1 Main St",
            "borrower_ssn_last4": "6789",
            "loan_id": "L001",
            "business_name": "Doe Farms"
        }));

        for key in [
            "password",
            "api_key",
            "access_token",
            "clientSecret",
            "email_address",
            "streetAddress",
            "borrower_ssn_last4",
        ] {
            assert_eq!(out[key], REDACTED, "{} should be redacted", key);
        }
        assert_eq!(out["loan_id"], "L001");
        assert_eq!(out["business_name"], "Doe Farms");
    }

    #[test]
    fn test_input_is_not_modified() {
        let input = json!({"email": "a@b.c"});
        let _ = redact_pii(&input);
        assert_eq!(input["email"], "a@b.c");
    }
}
