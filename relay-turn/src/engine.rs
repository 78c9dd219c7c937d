//! The Turn Engine itself: the normative agentic loop (§4.5).

use std::collections::HashMap;
use std::path::Path;

use futures::StreamExt;
use relay_context::{prepare_messages_for_generation, CompressionStrategy, SlidingWindowStrategy, TokenCounter};
use relay_tool::{
    AllowAllPolicy, AutoApprove, ConfirmationCache, ConfirmationHandler, InMemoryConfirmationCache,
    PermissionPolicy, ToolRegistry, ToolScheduler,
};
use relay_types::{CallId, CompletionRequest, Message, Part, Provider, Role, ToolCallRequest, ToolChoice};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::config::TurnConfig;
use crate::event::TurnEvent;
use crate::state::TurnState;

/// No fallback decider is registered for the turn-level retry call; the
/// Retry Engine still auto-accepts its own configured fallback model on
/// repeated quota errors (see `relay_retry::retry`'s "no callback" rule).
type NoFallback = fn(&str, &str) -> std::future::Ready<bool>;

/// Everything a [`Turn::run`] call produced.
#[derive(Debug)]
pub struct TurnOutcome {
    /// Events in emission order.
    pub events: Vec<TurnEvent>,
    /// Final state the turn ended in.
    pub state: TurnState,
    /// History after this turn: the history the caller passed in, the user
    /// message, and everything the loop appended (and, if compression ran,
    /// with older messages dropped/summarized in place).
    pub history: Vec<Message>,
}

/// One user message's worth of stream → execute-tools → re-stream cycles.
///
/// Generic over the concrete [`Provider`]; tools, permission policy,
/// confirmation handling, the always-approved cache, and the compression
/// strategy are all swappable via the `with_*` builders.
pub struct Turn<P: Provider> {
    provider: P,
    tools: ToolRegistry,
    permission: Box<dyn PermissionPolicy>,
    confirmation: Box<dyn ConfirmationHandler>,
    cache: Box<dyn ConfirmationCache>,
    compression: Box<dyn CompressionStrategy>,
    counter: TokenCounter,
    config: TurnConfig,
}

impl<P: Provider> Turn<P> {
    #[must_use]
    pub fn new(provider: P, tools: ToolRegistry, config: TurnConfig) -> Self {
        Self {
            provider,
            tools,
            permission: Box::new(AllowAllPolicy),
            confirmation: Box::new(AutoApprove),
            cache: Box::new(InMemoryConfirmationCache::new()),
            compression: Box::new(SlidingWindowStrategy),
            counter: TokenCounter::new(),
            config,
        }
    }

    #[must_use]
    pub fn with_permission(mut self, permission: impl PermissionPolicy + 'static) -> Self {
        self.permission = Box::new(permission);
        self
    }

    #[must_use]
    pub fn with_confirmation(mut self, confirmation: impl ConfirmationHandler + 'static) -> Self {
        self.confirmation = Box::new(confirmation);
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: impl ConfirmationCache + 'static) -> Self {
        self.cache = Box::new(cache);
        self
    }

    #[must_use]
    pub fn with_compression(mut self, strategy: impl CompressionStrategy + 'static) -> Self {
        self.compression = Box::new(strategy);
        self
    }

    /// Override this turn's system prompt (subagent routing, §4.5, or
    /// per-message reassembly by an owning Orchestrator).
    pub fn set_system(&mut self, system: Option<relay_types::SystemPrompt>) {
        self.config.system = system;
    }

    /// Run the agentic loop for `user_message`, against `history`
    /// (typically the session's history so far).
    pub async fn run(
        &self,
        history: &[Message],
        user_message: Message,
        abort: &CancellationToken,
        cwd: &Path,
        session_id: &str,
        environment: &HashMap<String, String>,
    ) -> TurnOutcome {
        let mut local_history = history.to_vec();
        local_history.push(user_message);
        let mut events = Vec::new();
        let mut iterations = 0usize;
        let mut last_calls: Option<Vec<(String, Map<String, Value>)>> = None;
        let mut repeat_count = 0usize;
        // Mutable across iterations: a fallback triggered by the Retry Engine
        // in one iteration carries over to the next (§4.2 point 6).
        let mut model = self.config.model.clone();

        loop {
            if abort.is_cancelled() {
                events.push(TurnEvent::UserCancelled { reason: "aborted before provider call".to_string() });
                return TurnOutcome { events, state: TurnState::Cancelled, history: local_history };
            }

            iterations += 1;
            if iterations > self.config.max_iterations {
                events.push(TurnEvent::MaxSessionTurns { iterations });
                return TurnOutcome { events, state: TurnState::Completed, history: local_history };
            }

            let prepared = match prepare_messages_for_generation(
                &local_history,
                &self.config.model,
                self.config.max_output_tokens,
                self.config.auto_compress,
                self.config.compress_threshold,
                self.compression.as_ref(),
                &self.counter,
            ) {
                Ok((messages, diagnostic)) => {
                    if diagnostic.compression_performed {
                        events.push(TurnEvent::ChatCompressed {
                            original_tokens: diagnostic.original_tokens,
                            compressed_tokens: diagnostic.compressed_tokens,
                        });
                        local_history = messages.clone();
                    }
                    messages
                }
                Err(err) => {
                    events.push(TurnEvent::Error(err.to_string()));
                    return TurnOutcome { events, state: TurnState::Failed, history: local_history };
                }
            };

            let tools = self.tools.definitions();
            let tool_choice = if tools.is_empty() { None } else { Some(ToolChoice::Auto) };
            let request_template = CompletionRequest {
                model: model.clone(),
                messages: prepared,
                system: self.config.system.clone(),
                tools,
                tool_choice,
                max_tokens: self.config.max_output_tokens,
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                top_k: self.config.top_k,
                stop_sequences: self.config.stop_sequences.clone(),
                stream: true,
            };

            // Every provider call is routed through the Retry Engine (§4.2
            // / §4.5's pseudocode): backoff, jitter, `Retry-After` honoring,
            // and model fallback on repeated quota errors all happen here,
            // transparently to the loop above and below.
            let stream_result = relay_retry::retry::<_, _, _, NoFallback>(
                &self.config.retry,
                &mut model,
                |attempt_model| {
                    let mut request = request_template.clone();
                    request.model = attempt_model;
                    self.provider.generate_content_stream(request)
                },
                None,
            )
            .await;

            let stream_handle = match stream_result {
                Ok((handle, _stats)) => handle,
                Err(err) => {
                    events.push(TurnEvent::Error(err.to_string()));
                    return TurnOutcome { events, state: TurnState::Failed, history: local_history };
                }
            };

            let mut chunks = stream_handle.chunks;
            let mut calls_this_turn: Vec<Part> = Vec::new();
            let mut text_parts: Vec<Part> = Vec::new();
            let mut stream_finished = false;

            while let Some(item) = chunks.next().await {
                if abort.is_cancelled() {
                    events.push(TurnEvent::UserCancelled { reason: "aborted mid-stream".to_string() });
                    return TurnOutcome { events, state: TurnState::Cancelled, history: local_history };
                }
                match item {
                    Err(err) => {
                        events.push(TurnEvent::Error(err.to_string()));
                        return TurnOutcome { events, state: TurnState::Failed, history: local_history };
                    }
                    Ok(response) => {
                        if let Some(candidate) = response.candidates.first() {
                            for part in &candidate.content.parts {
                                match part {
                                    Part::Text(text) if !text.is_empty() => {
                                        events.push(TurnEvent::Content(text.clone()));
                                        text_parts.push(part.clone());
                                    }
                                    Part::FunctionCall { .. } => {
                                        calls_this_turn.push(part.clone());
                                        events.push(TurnEvent::ToolCallRequest(to_request(part, session_id, iterations)));
                                    }
                                    _ => {}
                                }
                            }
                            if candidate.finish_reason.is_some() {
                                stream_finished = true;
                            }
                        }
                    }
                }
                if stream_finished {
                    break;
                }
            }

            if calls_this_turn.is_empty() {
                local_history.push(Message::new(Role::Model, text_parts));
                events.push(TurnEvent::Finished { iterations });
                return TurnOutcome { events, state: TurnState::Completed, history: local_history };
            }

            let current_calls: Vec<(String, Map<String, Value>)> = calls_this_turn
                .iter()
                .filter_map(|part| match part {
                    Part::FunctionCall { name, args, .. } => Some((name.clone(), args.clone())),
                    _ => None,
                })
                .collect();
            if last_calls.as_ref() == Some(&current_calls) {
                repeat_count += 1;
            } else {
                repeat_count = 0;
                last_calls = Some(current_calls);
            }
            if repeat_count + 1 >= self.config.loop_detection_window {
                let tool_name = calls_this_turn
                    .first()
                    .and_then(|part| match part {
                        Part::FunctionCall { name, .. } => Some(name.clone()),
                        _ => None,
                    })
                    .unwrap_or_default();
                events.push(TurnEvent::LoopDetected { tool_name });
                return TurnOutcome { events, state: TurnState::Failed, history: local_history };
            }

            // CRITICAL: the model's own function-call message is recorded
            // before the matching tool-response message (§4.5 ordering rule).
            local_history.push(Message::new(Role::Model, calls_this_turn.clone()));

            let requests: Vec<ToolCallRequest> = calls_this_turn
                .iter()
                .filter_map(|part| match part {
                    Part::FunctionCall { id, name, args } => Some(ToolCallRequest {
                        id: id.clone(),
                        name: name.clone(),
                        args: args.clone(),
                        prompt_id: format!("{session_id}-{iterations}"),
                    }),
                    _ => None,
                })
                .collect();

            let scheduler = ToolScheduler::new(&self.tools, self.permission.as_ref(), self.confirmation.as_ref(), self.cache.as_ref());
            let result_parts = scheduler.schedule_and_wait(requests, cwd, session_id, environment, abort).await;

            for part in &result_parts {
                events.push(TurnEvent::ToolCallResponse(part.clone()));
            }
            local_history.push(Message::new(Role::User, result_parts));

            if abort.is_cancelled() {
                events.push(TurnEvent::UserCancelled { reason: "aborted during tool execution".to_string() });
                return TurnOutcome { events, state: TurnState::Cancelled, history: local_history };
            }
        }
    }
}

fn to_request(part: &Part, session_id: &str, iteration: usize) -> ToolCallRequest {
    match part {
        Part::FunctionCall { id, name, args } => ToolCallRequest {
            id: id.clone(),
            name: name.clone(),
            args: args.clone(),
            prompt_id: format!("{session_id}-{iteration}"),
        },
        _ => ToolCallRequest {
            id: CallId::from("unknown"),
            name: String::new(),
            args: Map::new(),
            prompt_id: format!("{session_id}-{iteration}"),
        },
    }
}
