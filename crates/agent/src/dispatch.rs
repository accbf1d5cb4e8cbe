//! Running one batch of tool calls.

use futures::StreamExt;
use std::time::{Duration, Instant};

use conductor_core::agent::TenantScope;
use conductor_core::tool::{ToolCallRequest, ToolContext, ToolOutcome};
use conductor_core::CancellationToken;
use conductor_tools::ToolExecutor;

/// A call together with its outcome and how long it took.
#[derive(Debug, Clone)]
pub struct ExecutedCall {
    pub request: ToolCallRequest,
    pub outcome: ToolOutcome,
    pub duration: Duration,
}

/// Execute every call in `batch` and return the outcomes in request order.
///
/// Serial mode runs calls one at a time in issue order. Parallel mode runs
/// the whole batch at once (concurrency = batch size) and buffers results so
/// completion order never leaks into the returned order. A failing call never
/// affects its siblings.
pub async fn dispatch_batch(
    executor: &ToolExecutor,
    batch: Vec<ToolCallRequest>,
    parallel: bool,
    tenant: &TenantScope,
    cancel: &CancellationToken,
) -> Vec<ExecutedCall> {
    if parallel && batch.len() > 1 {
        let limit = batch.len();
        futures::stream::iter(batch)
            .map(|request| execute_one(executor, request, tenant, cancel))
            .buffered(limit)
            .collect()
            .await
    } else {
        let mut executed = Vec::with_capacity(batch.len());
        for request in batch {
            executed.push(execute_one(executor, request, tenant, cancel).await);
        }
        executed
    }
}

async fn execute_one(
    executor: &ToolExecutor,
    request: ToolCallRequest,
    tenant: &TenantScope,
    cancel: &CancellationToken,
) -> ExecutedCall {
    let ctx = ToolContext {
        tenant: tenant.clone(),
        cancel: cancel.child_token(),
    };
    let start = Instant::now();
    let outcome = executor.execute(&request, &ctx).await;
    ExecutedCall {
        request,
        outcome,
        duration: start.elapsed(),
    }
}
