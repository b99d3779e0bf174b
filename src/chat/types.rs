// Chat wire types (OpenAI chat-completions, legacy `functions` flavour)

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

/// Function call as emitted by the model; `arguments` is a raw JSON string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    /// Function name, only on `function`-role messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: Some(content.into()),
            name: None,
            function_call: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant turn that requested a function
    pub fn assistant_call(call: FunctionCall) -> Self {
        ChatMessage {
            role: Role::Assistant,
            content: None,
            name: None,
            function_call: Some(call),
        }
    }

    /// Result of a function call, fed back to the model
    pub fn function_result(name: impl Into<String>, payload: &Value) -> Self {
        ChatMessage {
            role: Role::Function,
            content: Some(payload.to_string()),
            name: Some(name.into()),
            function_call: None,
        }
    }
}

/// What a single completion produced
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Message(String),
    FunctionCall(FunctionCall),
}

/// A function the orchestrator executed during a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedCall {
    pub name: String,
    pub arguments: Value,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub message: ChatMessage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<ExecutedCall>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_function_message_wire_shape() {
        let msg = ChatMessage::function_result("getLoanStatus", &json!({"status": "Active"}));
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["role"], "function");
        assert_eq!(value["name"], "getLoanStatus");
        assert_eq!(value["content"], r#"{"status":"Active"}"#);
        assert!(value.get("function_call").is_none());
    }

    #[test]
    fn test_assistant_call_keeps_null_content() {
        let msg = ChatMessage::assistant_call(FunctionCall {
            name: "getActiveLoans".to_string(),
            arguments: "{}".to_string(),
        });
        let value = serde_json::to_value(&msg).unwrap();

        assert!(value["content"].is_null());
        assert_eq!(value["function_call"]["name"], "getActiveLoans");
    }
}
