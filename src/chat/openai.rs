// OpenAI chat-completions client

use super::{ChatError, ChatMessage, ChatModel, FunctionCall, ModelReply};
use crate::config::OpenAiConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://api.openai.com/v1", model)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        OpenAiClient {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &OpenAiConfig) -> Result<Self, ChatError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ChatError::NotConfigured)?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(OpenAiClient {
            client,
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    functions: Option<&'a [Value]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<&'static str>,
}

impl<'a> CompletionRequest<'a> {
    fn new(model: &'a str, messages: &'a [ChatMessage], functions: Option<&'a [Value]>) -> Self {
        // An empty function list is rejected by the API
        let functions = functions.filter(|f| !f.is_empty());
        CompletionRequest {
            model,
            messages,
            function_call: functions.map(|_| "auto"),
            functions,
        }
    }

    fn function_count(&self) -> usize {
        self.functions.map_or(0, |f| f.len())
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    function_call: Option<FunctionCall>,
}

fn parse_reply(body: &str) -> Result<ModelReply, ChatError> {
    let response: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        ChatError::Decode(format!(
            "{} - Response: {}",
            e,
            body.chars().take(200).collect::<String>()
        ))
    })?;

    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or(ChatError::EmptyResponse)?
        .message;

    Ok(match message.function_call {
        Some(call) => ModelReply::FunctionCall(call),
        None => ModelReply::Message(message.content.unwrap_or_default()),
    })
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, messages: &[ChatMessage], functions: Option<&[Value]>) -> Result<ModelReply, ChatError> {
        let request = CompletionRequest::new(&self.model, messages, functions);
        debug!(
            model = %self.model,
            messages = messages.len(),
            functions = request.function_count(),
            "sending chat completion"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "chat completion rejected");
            return Err(ChatError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_includes_functions_with_auto() {
        let messages = vec![ChatMessage::user("Who is high risk?")];
        let functions = vec![json!({"name": "getHighRiskFarmers"})];

        let value = serde_json::to_value(CompletionRequest::new("gpt-4o", &messages, Some(functions.as_slice()))).unwrap();

        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["function_call"], "auto");
        assert_eq!(value["functions"][0]["name"], "getHighRiskFarmers");
        assert_eq!(value["messages"][0]["role"], "user");
    }

    #[test]
    fn test_request_without_functions() {
        let messages = vec![ChatMessage::user("hi")];

        let value = serde_json::to_value(CompletionRequest::new("gpt-4o", &messages, Some(&[][..]))).unwrap();

        assert!(value.get("functions").is_none());
        assert!(value.get("function_call").is_none());
    }

    #[test]
    fn test_function_count() {
        let messages = vec![ChatMessage::user("hi")];
        let functions = vec![json!({"name": "getLoanStatus"}), json!({"name": "getLoanSummary"})];

        assert_eq!(CompletionRequest::new("gpt-4o", &messages, Some(functions.as_slice())).function_count(), 2);
        assert_eq!(CompletionRequest::new("gpt-4o", &messages, Some(&[][..])).function_count(), 0);
        assert_eq!(CompletionRequest::new("gpt-4o", &messages, None).function_count(), 0);
    }

    #[test]
    fn test_parse_function_call_reply() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "function_call": {"name": "getBorrowerDefaultRisk", "arguments": "{\"borrowerId\":\"B003\"}"}
                }
            }]
        })
        .to_string();

        match parse_reply(&body).unwrap() {
            ModelReply::FunctionCall(call) => {
                assert_eq!(call.name, "getBorrowerDefaultRisk");
                assert!(call.arguments.contains("B003"));
            }
            other => panic!("expected function call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_text_and_empty_replies() {
        let text = json!({"choices": [{"message": {"role": "assistant", "content": "Hello"}}]}).to_string();
        assert_eq!(parse_reply(&text).unwrap(), ModelReply::Message("Hello".to_string()));

        let empty = json!({"choices": []}).to_string();
        assert!(matches!(parse_reply(&empty), Err(ChatError::EmptyResponse)));

        assert!(matches!(parse_reply("<html>"), Err(ChatError::Decode(_))));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = OpenAiConfig::default();
        assert!(matches!(OpenAiClient::from_config(&config), Err(ChatError::NotConfigured)));
    }
}
