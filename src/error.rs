// ⚠️ Error types
//
// StoreError    - the JSON data files could not be read or parsed
// ApiError      - an internal API call failed (entity missing or store failure)
// DispatchError - the four failure kinds a function call can end in
//
// Every DispatchError renders to a structured JSON payload so the chat model
// can phrase a graceful answer; nothing here is fatal to the process.

use crate::entities::EntityKind;
use crate::validation::ValidationError;
use serde_json::{json, Value};
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// DATA STORE
// ============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// INTERNAL API
// ============================================================================

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{} not found", .entity.label())]
    NotFound { entity: EntityKind, id: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

// ============================================================================
// DISPATCH
// ============================================================================

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("Invalid arguments: {}", join_messages(.errors))]
    Validation { errors: Vec<ValidationError> },

    #[error("{entity} with ID '{entity_id}' not found")]
    NotFound {
        entity: EntityKind,
        entity_id: String,
    },

    /// `cause` goes to the logs only; callers get [`UPSTREAM_DETAILS`]
    #[error("Operation failed: {cause}")]
    Upstream {
        entity_id: Option<String>,
        cause: String,
    },
}

/// Caller-facing text for store and encoding failures
pub const UPSTREAM_DETAILS: &str = "The data service could not complete the request.";

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DispatchError {
    /// Convert an internal API failure, attaching the id the handler was working on
    pub fn from_api(err: ApiError, entity_id: Option<&str>) -> Self {
        match err {
            ApiError::NotFound { entity, id } => DispatchError::NotFound {
                entity,
                entity_id: id,
            },
            other => DispatchError::Upstream {
                entity_id: entity_id.map(str::to_string),
                cause: other.to_string(),
            },
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::UnknownFunction { .. } => "UNKNOWN_FUNCTION",
            DispatchError::Validation { .. } => "VALIDATION_ERROR",
            DispatchError::NotFound { .. } => "ENTITY_NOT_FOUND",
            DispatchError::Upstream { .. } => "UPSTREAM_FAILURE",
        }
    }

    /// Structured payload handed back to the caller / chat model
    pub fn to_payload(&self, function: &str) -> Value {
        match self {
            DispatchError::UnknownFunction { name } => json!({
                "error": "Unknown function",
                "code": self.code(),
                "function": name,
                "details": format!("Unknown function: {}", name),
            }),
            DispatchError::Validation { errors } => {
                let first = errors.first();
                json!({
                    "error": "Invalid arguments",
                    "code": self.code(),
                    "function": function,
                    "field": first.map(|e| e.field.as_str()),
                    "details": join_messages(errors),
                    "validation_errors": errors,
                })
            }
            DispatchError::NotFound { entity, entity_id } => json!({
                "error": "Entity not found",
                "code": self.code(),
                "function": function,
                "entity_type": entity.as_str(),
                "entity_id": entity_id,
                "details": format!("Unable to verify {} with ID {}", entity, entity_id),
            }),
            DispatchError::Upstream { entity_id, .. } => {
                let mut payload = json!({
                    "error": "Operation failed",
                    "code": self.code(),
                    "function": function,
                    "details": UPSTREAM_DETAILS,
                });
                if let Some(id) = entity_id {
                    payload["entity_id"] = json!(id);
                }
                payload
            }
        }
    }
}
