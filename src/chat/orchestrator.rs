// Chat turn orchestration

use super::{ChatError, ChatMessage, ChatModel, ChatReply, ExecutedCall, FunctionCall, ModelReply, Role};
use crate::context::RequestContext;
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::validation::ValidationError;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are LoanOfficerAI, an assistant for agricultural loan officers. \
Use the available functions to look up borrowers, loans, collateral and risk metrics. \
Never invent figures: if a function reports an error, explain it plainly to the user.";

/// Reply used when the follow-up completion asks for another function
const FOLLOW_UP_FALLBACK: &str = "I retrieved the requested data but could not summarize it. Please try rephrasing the question.";

pub struct ChatOrchestrator {
    model: Arc<dyn ChatModel>,
    dispatcher: Dispatcher,
    system_prompt: String,
}

impl ChatOrchestrator {
    pub fn new(model: Arc<dyn ChatModel>, dispatcher: Dispatcher) -> Self {
        ChatOrchestrator {
            model,
            dispatcher,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Run one chat turn over `conversation`.
    ///
    /// A system prompt is prepended when the conversation has none. Dispatch
    /// failures are handed to the model as payloads, so only transport-level
    /// problems surface as ChatError.
    pub async fn respond(&self, ctx: &RequestContext, conversation: Vec<ChatMessage>) -> Result<ChatReply, ChatError> {
        let mut messages = Vec::with_capacity(conversation.len() + 3);
        if !conversation.iter().any(|m| m.role == Role::System) {
            messages.push(ChatMessage::system(&self.system_prompt));
        }
        messages.extend(conversation);

        let schemas = self.dispatcher.registry().schemas();
        let call = match self.model.complete(&messages, Some(schemas.as_slice())).await? {
            ModelReply::Message(text) => {
                info!(request_id = %ctx.request_id, "model answered without a function call");
                return Ok(ChatReply {
                    message: ChatMessage::assistant(text),
                    function_call: None,
                });
            }
            ModelReply::FunctionCall(call) => call,
        };

        info!(request_id = %ctx.request_id, function = %call.name, "model requested function");
        let executed = self.execute(ctx, &call).await;

        messages.push(ChatMessage::assistant_call(call));
        messages.push(ChatMessage::function_result(&executed.name, &executed.payload));

        let text = match self.model.complete(&messages, None).await? {
            ModelReply::Message(text) => text,
            ModelReply::FunctionCall(extra) => {
                warn!(function = %extra.name, "follow-up completion requested another function, ignoring");
                FOLLOW_UP_FALLBACK.to_string()
            }
        };

        Ok(ChatReply {
            message: ChatMessage::assistant(text),
            function_call: Some(executed),
        })
    }

    async fn execute(&self, ctx: &RequestContext, call: &FunctionCall) -> ExecutedCall {
        let raw = call.arguments.trim();
        let parsed = if raw.is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(raw)
        };

        match parsed {
            Ok(arguments) => ExecutedCall {
                payload: self
                    .dispatcher
                    .dispatch_payload_blocking(ctx, &call.name, &arguments)
                    .await,
                name: call.name.clone(),
                arguments,
            },
            Err(err) => {
                warn!(function = %call.name, error = %err, "malformed function arguments from model");
                let failure = DispatchError::Validation {
                    errors: vec![ValidationError::new(
                        "arguments",
                        format!("Malformed JSON arguments: {}", err),
                    )],
                };
                ExecutedCall {
                    payload: failure.to_payload(&call.name),
                    name: call.name.clone(),
                    arguments: Value::String(call.arguments.clone()),
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InternalApi;
    use crate::functions::testing::seeded_api;
    use crate::registry::FunctionRegistry;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted replies and records every request
    struct ScriptedModel {
        replies: Mutex<VecDeque<ModelReply>>,
        requests: Mutex<Vec<(Vec<ChatMessage>, bool)>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<ModelReply>) -> Arc<Self> {
            Arc::new(ScriptedModel {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<(Vec<ChatMessage>, bool)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: &[ChatMessage], functions: Option<&[Value]>) -> Result<ModelReply, ChatError> {
            self.requests
                .lock()
                .unwrap()
                .push((messages.to_vec(), functions.is_some()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or(ChatError::EmptyResponse)
        }
    }

    fn orchestrator(model: Arc<ScriptedModel>) -> ChatOrchestrator {
        let api: Arc<dyn InternalApi> = Arc::new(seeded_api());
        let dispatcher = Dispatcher::new(Arc::new(FunctionRegistry::new()), api);
        ChatOrchestrator::new(model, dispatcher)
    }

    fn call(name: &str, arguments: &str) -> ModelReply {
        ModelReply::FunctionCall(FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        })
    }

    #[tokio::test]
    async fn test_function_call_round_trip() {
        let model = ScriptedModel::new(vec![
            call("getBorrowerDefaultRisk", r#"{"borrowerId":"B003"}"#),
            ModelReply::Message("Robert Johnson is high risk.".to_string()),
        ]);
        let reply = orchestrator(model.clone())
            .respond(&RequestContext::new("officer"), vec![ChatMessage::user("Is B003 risky?")])
            .await
            .unwrap();

        assert_eq!(reply.message.content.as_deref(), Some("Robert Johnson is high risk."));
        let executed = reply.function_call.unwrap();
        assert_eq!(executed.payload["risk_score"], 75);

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].1, "first completion carries functions");
        assert!(!requests[1].1, "second completion has none");

        let second = &requests[1].0;
        assert_eq!(second[0].role, Role::System);
        assert_eq!(second[second.len() - 2].role, Role::Assistant);
        let result = &second[second.len() - 1];
        assert_eq!(result.role, Role::Function);
        assert_eq!(result.name.as_deref(), Some("getBorrowerDefaultRisk"));
    }

    #[tokio::test]
    async fn test_plain_answer_skips_dispatch() {
        let model = ScriptedModel::new(vec![ModelReply::Message("Hello!".to_string())]);
        let reply = orchestrator(model.clone())
            .respond(&RequestContext::system(), vec![ChatMessage::user("hi")])
            .await
            .unwrap();

        assert!(reply.function_call.is_none());
        assert_eq!(model.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_arguments_become_payload() {
        let model = ScriptedModel::new(vec![
            call("getLoanStatus", "{loan_id: L001"),
            ModelReply::Message("Sorry, I could not read that loan id.".to_string()),
        ]);
        let reply = orchestrator(model)
            .respond(&RequestContext::system(), vec![ChatMessage::user("status of L001?")])
            .await
            .unwrap();

        let executed = reply.function_call.unwrap();
        assert_eq!(executed.payload["error"], "Invalid arguments");
        assert_eq!(executed.payload["field"], "arguments");
        assert!(reply.message.content.is_some());
    }

    #[tokio::test]
    async fn test_dispatch_error_is_phrased_by_model() {
        let model = ScriptedModel::new(vec![
            call("getBorrowerDefaultRisk", r#"{"borrowerId":"B999"}"#),
            ModelReply::Message("I couldn't find borrower B999.".to_string()),
        ]);
        let reply = orchestrator(model.clone())
            .respond(&RequestContext::system(), vec![ChatMessage::user("B999?")])
            .await
            .unwrap();

        assert_eq!(reply.function_call.unwrap().payload["error"], "Entity not found");
        let fed_back = model.requests()[1].0.last().unwrap().content.clone().unwrap();
        assert!(fed_back.contains("B999"));
    }

    #[tokio::test]
    async fn test_existing_system_prompt_kept() {
        let model = ScriptedModel::new(vec![ModelReply::Message("ok".to_string())]);
        orchestrator(model.clone())
            .respond(
                &RequestContext::system(),
                vec![ChatMessage::system("custom"), ChatMessage::user("hi")],
            )
            .await
            .unwrap();

        let first = &model.requests()[0].0;
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].content.as_deref(), Some("custom"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = ScriptedModel::new(vec![]);
        let err = orchestrator(model)
            .respond(&RequestContext::system(), vec![ChatMessage::user("hi")])
            .await
            .unwrap_err();

        assert!(matches!(err, ChatError::EmptyResponse));
    }
}
