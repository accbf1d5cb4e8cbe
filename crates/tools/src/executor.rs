//! Tool executor — the boundary where every tool fault becomes data.
//!
//! `execute` never returns an error and never panics: unknown tools, bad
//! arguments, timeouts, capability errors, capability panics and
//! cancellation all come back as a failed [`ToolOutcome`] the reasoning
//! capability can read on its next turn.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use conductor_core::error::ToolError;
use conductor_core::tool::{ToolCallRequest, ToolContext, ToolOutcome, ToolOutput, ToolRegistry};

use crate::validation::validate_arguments;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs one tool call at a time against a shared, read-only registry.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Execute `request` under the executor's configured timeout.
    pub async fn execute(&self, request: &ToolCallRequest, ctx: &ToolContext) -> ToolOutcome {
        self.execute_with_timeout(request, self.timeout, ctx).await
    }

    /// Execute `request` under an explicit timeout.
    pub async fn execute_with_timeout(
        &self,
        request: &ToolCallRequest,
        timeout: Duration,
        ctx: &ToolContext,
    ) -> ToolOutcome {
        let start = Instant::now();
        let result = self.try_execute(request, timeout, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(output) => {
                debug!(
                    tool = %request.tool_name,
                    call_id = %request.id,
                    duration_ms,
                    citations = output.citations.len(),
                    "Tool call succeeded"
                );
                ToolOutcome::success(output)
            }
            Err(e) => {
                warn!(
                    tool = %request.tool_name,
                    call_id = %request.id,
                    duration_ms,
                    error = %e,
                    "Tool call failed"
                );
                ToolOutcome::failure(e)
            }
        }
    }

    async fn try_execute(
        &self,
        request: &ToolCallRequest,
        timeout: Duration,
        ctx: &ToolContext,
    ) -> Result<ToolOutput, ToolError> {
        let name = request.tool_name.as_str();
        let definition = self
            .registry
            .definition(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let capability = self
            .registry
            .lookup(name)
            .map_err(|_| ToolError::NotFound(name.to_string()))?;

        let arguments = validate_arguments(definition, &request.arguments)?;

        if ctx.cancel.is_cancelled() {
            return Err(ToolError::Cancelled);
        }

        let call = AssertUnwindSafe(capability.invoke(arguments, ctx)).catch_unwind();

        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => Err(ToolError::Cancelled),
            result = tokio::time::timeout(timeout, call) => match result {
                Err(_) => Err(ToolError::Timeout {
                    tool_name: name.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
                Ok(Err(panic)) => Err(ToolError::failed(name, panic_message(panic.as_ref()))),
                Ok(Ok(result)) => result,
            },
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("tool panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("tool panicked: {s}")
    } else {
        "tool panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conductor_core::tool::{
        Arguments, ParamType, ParameterSpec, ToolCapability, ToolDefinition,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ToolCapability for Echo {
        async fn invoke(&self, arguments: Arguments, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let text = arguments["text"].as_str().unwrap_or_default().to_string();
            Ok(ToolOutput::text(text).with_data(json!({ "times": arguments["times"] })))
        }
    }

    struct Failing;

    #[async_trait]
    impl ToolCapability for Failing {
        async fn invoke(&self, _arguments: Arguments, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
            Err(ToolError::failed("failing", "backend exploded"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl ToolCapability for Panicking {
        async fn invoke(&self, _arguments: Arguments, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
            panic!("index out of bounds");
        }
    }

    struct Slow;

    #[async_trait]
    impl ToolCapability for Slow {
        async fn invoke(&self, _arguments: Arguments, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(ToolOutput::text("finally"))
        }
    }

    fn executor() -> (ToolExecutor, Arc<Echo>) {
        let echo = Arc::new(Echo {
            calls: AtomicUsize::new(0),
        });
        let mut registry = ToolRegistry::new();
        registry
            .register(
                ToolDefinition::new("echo", "Echo text")
                    .param(ParameterSpec::required("text", ParamType::String))
                    .param(ParameterSpec::optional("times", ParamType::Integer).with_default(json!(1))),
                echo.clone(),
            )
            .unwrap();
        registry
            .register(ToolDefinition::new("failing", "Always fails"), Arc::new(Failing))
            .unwrap();
        registry
            .register(ToolDefinition::new("panicking", "Always panics"), Arc::new(Panicking))
            .unwrap();
        registry
            .register(ToolDefinition::new("slow", "Never finishes in time"), Arc::new(Slow))
            .unwrap();
        (ToolExecutor::new(Arc::new(registry)), echo)
    }

    fn call(name: &str, args: serde_json::Value) -> ToolCallRequest {
        ToolCallRequest::new("call_1", name, args.as_object().cloned().unwrap_or_default())
    }

    #[tokio::test]
    async fn success_wraps_content_and_data() {
        let (executor, echo) = executor();
        let outcome = executor
            .execute(&call("echo", json!({"text": "hi"})), &ToolContext::default())
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.content, "hi");
        assert_eq!(outcome.structured_data, Some(json!({"times": 1})));
        assert!(outcome.error.is_none());
        assert_eq!(echo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_failure() {
        let (executor, _) = executor();
        let outcome = executor
            .execute(&call("nope", json!({})), &ToolContext::default())
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("unknown tool"));
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_capability() {
        let (executor, echo) = executor();
        let outcome = executor
            .execute(&call("echo", json!({"text": 42})), &ToolContext::default())
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("string"));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn capability_error_is_failure() {
        let (executor, _) = executor();
        let outcome = executor
            .execute(&call("failing", json!({})), &ToolContext::default())
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("backend exploded"));
        assert_eq!(outcome.prompt_text(), "Error: backend exploded");
    }

    #[tokio::test]
    async fn panic_is_captured() {
        let (executor, _) = executor();
        let outcome = executor
            .execute(&call("panicking", json!({})), &ToolContext::default())
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("index out of bounds"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_failure() {
        let (executor, _) = executor();
        let outcome = executor
            .execute_with_timeout(
                &call("slow", json!({})),
                Duration::from_millis(250),
                &ToolContext::default(),
            )
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("timeout after 250ms"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_call() {
        let (executor, _) = executor();
        let ctx = ToolContext::default();
        let cancel = ctx.cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });

        let outcome = executor.execute(&call("slow", json!({})), &ctx).await;
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn already_cancelled_skips_invocation() {
        let (executor, echo) = executor();
        let ctx = ToolContext::default();
        ctx.cancel.cancel();

        let outcome = executor
            .execute(&call("echo", json!({"text": "hi"})), &ctx)
            .await;
        assert_eq!(outcome.error.as_deref(), Some("cancelled"));
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }
}
