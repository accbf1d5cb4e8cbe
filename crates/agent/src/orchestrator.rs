//! The orchestration loop.
//!
//! One invocation walks an explicit state machine:
//!
//! ```text
//! Init → Deciding → Answering ─────────────→ Done
//!            ↑   └→ Dispatching ─┬→ Deciding
//!            └───────────────────┘└→ Exhausted → Done
//! ```
//!
//! Every tool fault is data (a failed outcome the reasoning capability sees
//! on its next turn). Only a failed reasoning call or cancellation ends an
//! invocation with an error.

use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use conductor_core::agent::{AgentConfig, TenantScope};
use conductor_core::chat::{ChatCapability, ChatReply, ChatRequest};
use conductor_core::error::{Error, Result};
use conductor_core::event::{DomainEvent, EventBus};
use conductor_core::message::{Conversation, Message};
use conductor_core::tool::{Arguments, Citation, ToolCallRequest, ToolRegistry};
use conductor_core::CancellationToken;
use conductor_telemetry::{MetricsAggregator, PricingTable};
use conductor_tools::ToolExecutor;

use crate::citations;
use crate::decision::{self, Decision};
use crate::dispatch::{ExecutedCall, dispatch_batch};
use crate::prompt;
use crate::result::{AgentResult, Termination, ToolCallRecord};

/// Tool used for the retrieval pre-fetch unless configured otherwise.
pub const DEFAULT_RETRIEVAL_TOOL: &str = "document_search";

/// Drives conversations between a reasoning capability and the registered
/// tools. Holds no per-invocation state: one instance serves any number of
/// concurrent invocations.
pub struct Orchestrator {
    chat: Arc<dyn ChatCapability>,
    executor: ToolExecutor,
    pricing: Arc<PricingTable>,
    /// Model charged when a reply does not name one
    default_model: Option<String>,
    event_bus: Arc<EventBus>,
    retrieval_tool: String,
}

enum Phase {
    Init,
    Deciding,
    Dispatching(Vec<ToolCallRequest>),
    Answering(String),
    Exhausted,
}

/// State owned by exactly one invocation.
struct Run<'a> {
    config: &'a AgentConfig,
    conversation_id: String,
    query: String,
    tenant: TenantScope,
    cancel: CancellationToken,
    system_prompt: String,
    conversation: Conversation,
    metrics: MetricsAggregator,
    executed: Vec<ToolCallRecord>,
    citations: Vec<Citation>,
}

impl Orchestrator {
    pub fn new(chat: Arc<dyn ChatCapability>, executor: ToolExecutor) -> Self {
        Self {
            chat,
            executor,
            pricing: Arc::new(PricingTable::with_defaults()),
            default_model: None,
            event_bus: Arc::new(EventBus::default()),
            retrieval_tool: DEFAULT_RETRIEVAL_TOOL.to_string(),
        }
    }

    pub fn with_pricing(mut self, pricing: Arc<PricingTable>) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Publish run events to a shared bus.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Tool used when `use_retrieval_context` is set.
    pub fn with_retrieval_tool(mut self, tool: impl Into<String>) -> Self {
        self.retrieval_tool = tool.into();
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.executor.registry()
    }

    /// Turn `message` into an answer.
    ///
    /// `history` seeds the conversation and must itself respect call/result
    /// ordering. Returns a complete [`AgentResult`] or a single error:
    /// [`Error::ReasoningUnavailable`] when the reasoning capability fails,
    /// [`Error::Cancelled`] when `cancel` fires, [`Error::Config`] for an
    /// invalid `config`.
    pub async fn run(
        &self,
        message: &str,
        history: Vec<Message>,
        config: &AgentConfig,
        tenant: TenantScope,
        cancel: CancellationToken,
    ) -> Result<AgentResult> {
        config.validate()?;

        let mut conversation = Conversation::from_history(history)?;
        conversation.push(Message::user(message))?;
        let conversation_id = conversation.id.to_string();

        let mut metrics = MetricsAggregator::new(self.pricing.clone());
        if let Some(model) = &self.default_model {
            metrics = metrics.with_default_model(model.clone());
        }

        info!(
            conversation_id = %conversation_id,
            tenant = %tenant,
            chat = self.chat.name(),
            max_tool_calls = config.max_tool_calls,
            parallel = config.allow_parallel_tool_calls,
            "Starting orchestration"
        );
        self.event_bus.publish(DomainEvent::RunStarted {
            conversation_id: conversation_id.clone(),
            tenant: tenant.to_string(),
            timestamp: Utc::now(),
        });

        let mut run = Run {
            config,
            conversation_id,
            query: message.to_string(),
            tenant,
            cancel,
            system_prompt: prompt::system_prompt(config.system_prompt.as_deref()),
            conversation,
            metrics,
            executed: Vec::new(),
            citations: Vec::new(),
        };

        match self.drive(&mut run).await {
            Ok((final_answer, termination)) => {
                let iterations = run.metrics.iteration_count();
                let Run {
                    conversation_id,
                    conversation,
                    metrics,
                    executed,
                    citations: cited,
                    ..
                } = run;
                let metrics = metrics.finish();

                info!(
                    conversation_id = %conversation_id,
                    iterations,
                    tool_calls = executed.len(),
                    duration_ms = metrics.total_duration.as_millis() as u64,
                    cost_usd = metrics.estimated_cost_usd,
                    ?termination,
                    "Orchestration finished"
                );
                self.event_bus.publish(DomainEvent::RunFinished {
                    conversation_id,
                    iterations,
                    exhausted: termination == Termination::Exhausted,
                    error: None,
                    timestamp: Utc::now(),
                });

                Ok(AgentResult {
                    final_answer,
                    tool_calls_executed: executed,
                    citations: citations::dedup(cited),
                    metrics,
                    termination,
                    conversation,
                })
            }
            Err(e) => {
                warn!(conversation_id = %run.conversation_id, error = %e, "Orchestration failed");
                self.event_bus.publish(DomainEvent::RunFinished {
                    conversation_id: run.conversation_id.clone(),
                    iterations: run.metrics.iteration_count(),
                    exhausted: false,
                    error: Some(e.to_string()),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn drive(&self, run: &mut Run<'_>) -> Result<(String, Termination)> {
        let mut phase = Phase::Init;
        loop {
            phase = match phase {
                Phase::Init => {
                    if run.config.use_retrieval_context {
                        self.prefetch(run).await?;
                    }
                    Phase::Deciding
                }
                Phase::Deciding => self.decide(run).await?,
                Phase::Dispatching(batch) => self.dispatch(run, batch).await?,
                Phase::Answering(answer) => {
                    run.conversation.push(Message::assistant(answer.clone()))?;
                    return Ok((answer, Termination::Answered));
                }
                Phase::Exhausted => {
                    let answer = self.wrap_up(run).await?;
                    run.conversation.push(Message::assistant(answer.clone()))?;
                    return Ok((answer, Termination::Exhausted));
                }
            };
        }
    }

    /// Run the retrieval tool once on the user's message and inject its
    /// result before the first reasoning call. Not a dispatched batch: the
    /// iteration count is untouched.
    async fn prefetch(&self, run: &mut Run<'_>) -> Result<()> {
        if self.registry().definition(&self.retrieval_tool).is_none() {
            warn!(
                conversation_id = %run.conversation_id,
                tool = %self.retrieval_tool,
                "Retrieval context requested but the tool is not registered"
            );
            return Ok(());
        }

        let mut arguments = Arguments::new();
        arguments.insert("query".into(), json!(run.query));
        arguments.insert("top_k".into(), json!(run.config.top_k));
        arguments.insert("min_score".into(), json!(run.config.min_relevance_score));

        let id = decision::assign_id(0, 0, &run.conversation, &HashSet::new());
        let mut request = ToolCallRequest::new(id, self.retrieval_tool.clone(), arguments);
        request.reasoning_trace = Some("retrieval context pre-fetch".into());

        debug!(conversation_id = %run.conversation_id, tool = %self.retrieval_tool, "Pre-fetching retrieval context");
        let executed = dispatch_batch(&self.executor, vec![request], false, &run.tenant, &run.cancel).await;
        self.absorb(run, executed, 0)
    }

    async fn decide(&self, run: &mut Run<'_>) -> Result<Phase> {
        let request = ChatRequest {
            system_prompt: run.system_prompt.clone(),
            messages: run.conversation.messages().to_vec(),
            tools: self.registry().list().to_vec(),
        };
        let reply = self.ask(run, request).await?;

        let next_iteration = run.metrics.iteration_count() + 1;
        Ok(match decision::interpret(&reply, next_iteration, &run.conversation) {
            Decision::Answer(answer) => {
                debug!(conversation_id = %run.conversation_id, "Reasoning produced a final answer");
                Phase::Answering(answer)
            }
            Decision::Dispatch(batch) => {
                debug!(conversation_id = %run.conversation_id, calls = batch.len(), "Reasoning requested tools");
                Phase::Dispatching(batch)
            }
            Decision::Malformed { raw, reason } => {
                warn!(
                    conversation_id = %run.conversation_id,
                    reason = %reason,
                    "Malformed reasoning reply, using raw text as the answer"
                );
                let text = raw.trim();
                Phase::Answering(if text.is_empty() {
                    prompt::EMPTY_REPLY_NOTICE.to_string()
                } else {
                    text.to_string()
                })
            }
        })
    }

    async fn dispatch(&self, run: &mut Run<'_>, batch: Vec<ToolCallRequest>) -> Result<Phase> {
        let iteration = run.metrics.record_iteration();
        info!(
            conversation_id = %run.conversation_id,
            iteration,
            calls = batch.len(),
            parallel = run.config.allow_parallel_tool_calls,
            "Dispatching tool calls"
        );

        let executed = dispatch_batch(
            &self.executor,
            batch,
            run.config.allow_parallel_tool_calls,
            &run.tenant,
            &run.cancel,
        )
        .await;
        self.absorb(run, executed, iteration)?;

        // The ceiling is checked only here, once the whole batch is in.
        if iteration >= run.config.max_tool_calls {
            info!(
                conversation_id = %run.conversation_id,
                iteration,
                max_tool_calls = run.config.max_tool_calls,
                "Tool-call ceiling reached"
            );
            Ok(Phase::Exhausted)
        } else {
            Ok(Phase::Deciding)
        }
    }

    /// One last reasoning call with no tools offered. Falls back to a
    /// synthesized answer when that call fails or returns no text.
    async fn wrap_up(&self, run: &mut Run<'_>) -> Result<String> {
        let request = ChatRequest {
            system_prompt: prompt::wrap_up_prompt(&run.system_prompt),
            messages: run.conversation.messages().to_vec(),
            tools: Vec::new(),
        };

        match self.ask(run, request).await {
            Ok(reply) => {
                let text = reply.content.trim();
                if !text.is_empty() {
                    return Ok(text.to_string());
                }
                debug!(conversation_id = %run.conversation_id, "Wrap-up reply had no text");
            }
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                warn!(conversation_id = %run.conversation_id, error = %e, "Wrap-up call failed");
            }
        }
        Ok(prompt::synthesize_partial_answer(&run.executed))
    }

    /// Invoke the reasoning capability once, racing it against cancellation.
    async fn ask(&self, run: &mut Run<'_>, request: ChatRequest) -> Result<ChatReply> {
        if run.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let reply: Result<ChatReply> = tokio::select! {
            biased;
            _ = run.cancel.cancelled() => Err(Error::Cancelled),
            reply = self.chat.decide(request) => reply.map_err(Error::from),
        };
        let reply = reply?;

        let tokens_used = match reply.usage {
            Some(usage) => {
                run.metrics
                    .record_chat(reply.model.as_deref(), usage.prompt_tokens, usage.completion_tokens);
                usage.total_tokens()
            }
            None => {
                run.metrics.record_unmetered_chat();
                0
            }
        };

        self.event_bus.publish(DomainEvent::DecisionMade {
            conversation_id: run.conversation_id.clone(),
            iteration: run.metrics.iteration_count(),
            tool_calls: reply.tool_calls.len(),
            tokens_used,
            timestamp: Utc::now(),
        });
        Ok(reply)
    }

    /// Fold a finished batch into the run: one issued/result pair per call,
    /// in request order. After cancellation outcomes only reach telemetry.
    fn absorb(&self, run: &mut Run<'_>, executed: Vec<ExecutedCall>, iteration: u32) -> Result<()> {
        let cancelled = run.cancel.is_cancelled();

        for call in executed {
            self.event_bus.publish(DomainEvent::ToolExecuted {
                conversation_id: run.conversation_id.clone(),
                tool_name: call.request.tool_name.clone(),
                success: call.outcome.success,
                duration_ms: call.duration.as_millis() as u64,
                after_cancellation: cancelled,
                timestamp: Utc::now(),
            });
            if cancelled {
                continue;
            }

            run.metrics.record_tool(&call.request.tool_name, call.outcome.success);
            if call.outcome.success {
                run.metrics.record_documents(call.outcome.citations.len());
                let min_score = run.config.min_relevance_score;
                run.citations.extend(
                    call.outcome
                        .citations
                        .iter()
                        .filter(|c| c.score >= min_score)
                        .cloned(),
                );
            }

            run.conversation.push(Message::ToolCallIssued {
                request: call.request.clone(),
            })?;
            run.conversation.push(Message::ToolResultReceived {
                request: call.request.clone(),
                outcome: call.outcome.clone(),
            })?;
            run.executed.push(ToolCallRecord {
                request: call.request,
                outcome: call.outcome,
                iteration,
            });
        }

        if cancelled {
            info!(conversation_id = %run.conversation_id, iteration, "Cancelled during tool dispatch");
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}
