// 🚦 Dispatcher - validate, execute, normalize
//
// 1. look up the function        -> UnknownFunction
// 2. validate the arguments      -> Validation (no API call made)
// 3. run the handler             -> NotFound / Upstream
// 4. fold the result into a payload with summary and _metadata
//
// Every stage logs inside one `dispatch` span carrying request_id, user_id
// and function. Arguments and results are PII-redacted before logging.

use crate::api::InternalApi;
use crate::context::RequestContext;
use crate::error::DispatchError;
use crate::redact::redact_pii;
use crate::registry::FunctionRegistry;
use crate::validation::Validator;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<FunctionRegistry>,
    api: Arc<dyn InternalApi>,
}

impl Dispatcher {
    pub fn new(registry: Arc<FunctionRegistry>, api: Arc<dyn InternalApi>) -> Self {
        Dispatcher { registry, api }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Execute `name` with caller-supplied `args`.
    ///
    /// Ok holds the enriched success payload. Err holds the failure; use
    /// [`Dispatcher::dispatch_payload`] to get it rendered as JSON.
    #[instrument(
        name = "dispatch",
        skip(self, ctx, name, args),
        fields(request_id = %ctx.request_id, user_id = %ctx.user_id, function = %name)
    )]
    pub fn dispatch(&self, ctx: &RequestContext, name: &str, args: &Value) -> Result<Value, DispatchError> {
        let started = Instant::now();
        info!(args = %redact_pii(args), "function call started");

        let Some(descriptor) = self.registry.get(name) else {
            warn!("unknown function requested");
            return Err(DispatchError::UnknownFunction {
                name: name.to_string(),
            });
        };

        let validated = match Validator::validate(&descriptor.parameters, args) {
            Ok(validated) => {
                debug!(args = %redact_pii(&validated.to_value()), "arguments valid");
                validated
            }
            Err(errors) => {
                warn!(errors = ?errors, "argument validation failed");
                return Err(DispatchError::Validation { errors });
            }
        };

        let outcome = (descriptor.handler)(self.api.as_ref(), &validated);
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                debug!(result = %redact_pii(&result.data), "internal api result");
                info!(duration_ms, "function call succeeded");
                Ok(result.into_payload(name))
            }
            Err(err @ DispatchError::NotFound { .. }) => {
                warn!(duration_ms, code = err.code(), error = %err, "function call failed");
                Err(err)
            }
            Err(err) => {
                error!(duration_ms, code = err.code(), error = %err, "function call failed");
                Err(err)
            }
        }
    }

    /// Like [`Dispatcher::dispatch`] but always yields a JSON payload:
    /// the success payload or the structured error payload.
    pub fn dispatch_payload(&self, ctx: &RequestContext, name: &str, args: &Value) -> Value {
        match self.dispatch(ctx, name, args) {
            Ok(payload) => payload,
            Err(err) => err.to_payload(name),
        }
    }
}

#[cfg(feature = "server")]
impl Dispatcher {
    /// [`Dispatcher::dispatch`] on tokio's blocking pool.
    ///
    /// Handlers read the JSON files synchronously, so async callers go
    /// through here to keep the runtime workers free.
    pub async fn dispatch_blocking(&self, ctx: &RequestContext, name: &str, args: &Value) -> Result<Value, DispatchError> {
        let dispatcher = self.clone();
        let (ctx, owned_name, args) = (ctx.clone(), name.to_string(), args.clone());

        tokio::task::spawn_blocking(move || dispatcher.dispatch(&ctx, &owned_name, &args))
            .await
            .unwrap_or_else(|join_err| {
                error!(function = %name, error = %join_err, "dispatch task aborted");
                Err(DispatchError::Upstream {
                    entity_id: None,
                    cause: format!("dispatch task aborted: {}", join_err),
                })
            })
    }

    pub async fn dispatch_payload_blocking(&self, ctx: &RequestContext, name: &str, args: &Value) -> Value {
        match self.dispatch_blocking(ctx, name, args).await {
            Ok(payload) => payload,
            Err(err) => err.to_payload(name),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiRequest, StoreApi};
    use crate::error::{ApiError, StoreError};
    use crate::functions::testing::seeded_api;
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls, then delegates or fails
    struct CountingApi {
        inner: Option<StoreApi>,
        calls: AtomicUsize,
    }

    impl CountingApi {
        fn seeded() -> Self {
            CountingApi {
                inner: Some(seeded_api()),
                calls: AtomicUsize::new(0),
            }
        }

        fn broken() -> Self {
            CountingApi {
                inner: None,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl InternalApi for CountingApi {
        fn call(&self, request: &ApiRequest) -> Result<Value, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.inner {
                Some(api) => api.call(request),
                None => Err(ApiError::Store(StoreError::Parse {
                    path: PathBuf::from("data/borrowers.json"),
                    source: serde_json::from_str::<Value>("[{").unwrap_err(),
                })),
            }
        }
    }

    fn dispatcher(api: Arc<CountingApi>) -> Dispatcher {
        Dispatcher::new(Arc::new(FunctionRegistry::new()), api)
    }

    #[test]
    fn test_default_risk_scenario() {
        let d = dispatcher(Arc::new(CountingApi::seeded()));
        let payload = d
            .dispatch(&RequestContext::system(), "getBorrowerDefaultRisk", &json!({"borrowerId": "B003"}))
            .unwrap();

        assert_eq!(payload["borrower_id"], "B003");
        assert!(payload["risk_score"].is_number());
        assert!(payload["summary"].is_string());
        assert_eq!(payload["_metadata"]["success"], true);
        assert_eq!(payload["_metadata"]["function"], "getBorrowerDefaultRisk");
    }

    #[test]
    fn test_unknown_borrower_payload() {
        let d = dispatcher(Arc::new(CountingApi::seeded()));
        let payload = d.dispatch_payload(
            &RequestContext::system(),
            "getBorrowerDefaultRisk",
            &json!({"borrowerId": "B999"}),
        );

        assert_eq!(payload["error"], "Entity not found");
        assert_eq!(payload["entity_id"], "B999");
        assert!(payload["details"].is_string());
    }

    #[test]
    fn test_missing_required_never_reaches_api() {
        let api = Arc::new(CountingApi::seeded());
        let d = dispatcher(api.clone());

        let err = d
            .dispatch(&RequestContext::system(), "getBorrowerDefaultRisk", &json!({}))
            .unwrap_err();

        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(api.calls(), 0);
    }

    #[test]
    fn test_bad_id_format_never_reaches_api() {
        let api = Arc::new(CountingApi::seeded());
        let d = dispatcher(api.clone());

        let payload = d.dispatch_payload(
            &RequestContext::system(),
            "getBorrowerNonAccrualRisk",
            &json!({"borrowerId": "XYZ123"}),
        );

        assert_eq!(payload["error"], "Invalid arguments");
        assert_eq!(payload["field"], "borrower_id");
        assert_eq!(api.calls(), 0);
    }

    #[test]
    fn test_unknown_function_never_reaches_api() {
        let api = Arc::new(CountingApi::seeded());
        let d = dispatcher(api.clone());

        let payload = d.dispatch_payload(&RequestContext::system(), "deleteEverything", &json!({}));

        assert_eq!(payload["error"], "Unknown function");
        assert_eq!(payload["code"], "UNKNOWN_FUNCTION");
        assert_eq!(api.calls(), 0);
    }

    #[test]
    fn test_identical_calls_identical_payloads() {
        let d = dispatcher(Arc::new(CountingApi::seeded()));
        let args = json!({"loan_id": "L003", "marketConditions": "volatile"});

        let first = d.dispatch_payload(&RequestContext::new("a"), "evaluateCollateralSufficiency", &args);
        let second = d.dispatch_payload(&RequestContext::new("b"), "evaluateCollateralSufficiency", &args);

        assert_eq!(first, second);
    }

    #[test]
    fn test_store_failure_is_upstream_error() {
        let api = Arc::new(CountingApi::broken());
        let d = dispatcher(api.clone());

        let payload = d.dispatch_payload(
            &RequestContext::system(),
            "getBorrowerDetails",
            &json!({"borrower_id": "B001"}),
        );

        assert_eq!(payload["error"], "Operation failed");
        assert_eq!(payload["code"], "UPSTREAM_FAILURE");
        assert_eq!(payload["entity_id"], "B001");
        assert_eq!(payload["details"], crate::error::UPSTREAM_DETAILS);
        assert!(!payload.to_string().contains("borrowers.json"));
        assert_eq!(api.calls(), 1);
    }

    /// Sleeps before every call
    #[cfg(feature = "server")]
    struct SlowApi(std::time::Duration);

    #[cfg(feature = "server")]
    impl InternalApi for SlowApi {
        fn call(&self, request: &ApiRequest) -> Result<Value, ApiError> {
            std::thread::sleep(self.0);
            seeded_api().call(request)
        }
    }

    #[cfg(feature = "server")]
    #[tokio::test(flavor = "current_thread")]
    async fn test_blocking_dispatch_leaves_runtime_free() {
        use std::time::Duration;

        let d = Dispatcher::new(
            Arc::new(FunctionRegistry::new()),
            Arc::new(SlowApi(Duration::from_millis(150))),
        );
        let ticker = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Instant::now()
        });

        let payload = d
            .dispatch_blocking(&RequestContext::system(), "getBorrowerDetails", &json!({"borrower_id": "B001"}))
            .await
            .unwrap();
        let finished = Instant::now();
        let ticked = ticker.await.unwrap();

        assert_eq!(payload["borrower_id"], "B001");
        assert!(ticked < finished, "timer should fire while the dispatch is running");
    }

    #[cfg(feature = "server")]
    #[tokio::test]
    async fn test_blocking_payload_matches_sync() {
        let d = dispatcher(Arc::new(CountingApi::seeded()));
        let args = json!({"borrowerId": "B999"});

        let sync = d.dispatch_payload(&RequestContext::system(), "getBorrowerDefaultRisk", &args);
        let pooled = d
            .dispatch_payload_blocking(&RequestContext::system(), "getBorrowerDefaultRisk", &args)
            .await;

        assert_eq!(sync, pooled);
    }

    #[test]
    fn test_every_function_answers_on_seeded_data() {
        let d = dispatcher(Arc::new(CountingApi::seeded()));
        let ctx = RequestContext::system();

        for name in d.registry().names() {
            let args = json!({"borrower_id": "B001", "loan_id": "L001"});
            let payload = d.dispatch_payload(&ctx, name, &args);
            assert_eq!(payload["_metadata"]["success"], true, "{} failed: {}", name, payload);
        }
    }
}
