//! The Orchestrator itself: owns one [`Session`] (§4.6).

use std::collections::HashMap;
use std::path::PathBuf;

use relay_context::{SlidingWindowStrategy, SummarizeMiddleStrategy, TruncateOldestStrategy};
use relay_tool::{AllowedToolsPolicy, ToolRegistry};
use relay_types::{Message, Part, Provider, SystemPrompt};
use relay_turn::{Turn, TurnConfig, TurnEvent};
use tokio_util::sync::CancellationToken;

use crate::confirmation::AlwaysApprove;
use crate::config::{CompressionStrategyKind, RelayConfig};
use crate::stats::SessionStats;
use crate::subagent::SubagentRegistry;

/// Owns the session history and budgets, and drives one [`Turn`] per
/// `send_message` call.
pub struct Session<P: Provider> {
    turn: Turn<P>,
    config: RelayConfig,
    history: Vec<Message>,
    stats: SessionStats,
    subagents: SubagentRegistry,
    cwd: PathBuf,
    session_id: String,
    environment: HashMap<String, String>,
}

impl<P: Provider> Session<P> {
    #[must_use]
    pub fn new(
        provider: P,
        tools: ToolRegistry,
        config: RelayConfig,
        cwd: PathBuf,
        session_id: impl Into<String>,
        environment: HashMap<String, String>,
    ) -> Self {
        let turn_config = build_turn_config(&config, None);
        let mut turn = Turn::new(provider, tools, turn_config);
        turn = match config.compression_strategy {
            CompressionStrategyKind::TruncateOldest => {
                turn.with_compression(TruncateOldestStrategy { preserve_recent: 5 })
            }
            CompressionStrategyKind::SlidingWindow => turn.with_compression(SlidingWindowStrategy),
            CompressionStrategyKind::SummarizeMiddle => turn.with_compression(SummarizeMiddleStrategy {
                keep_first: 4,
                keep_last: 10,
            }),
        };
        if config.auto_confirm {
            turn = turn.with_confirmation(AlwaysApprove);
        }
        if !config.allowed_tools.is_empty() {
            turn = turn.with_permission(AllowedToolsPolicy::new(config.allowed_tools.clone()));
        }
        Self {
            turn,
            config,
            history: Vec::new(),
            stats: SessionStats::default(),
            subagents: SubagentRegistry::new(),
            cwd,
            session_id: session_id.into(),
            environment,
        }
    }

    #[must_use]
    pub fn with_subagents(mut self, subagents: SubagentRegistry) -> Self {
        self.subagents = subagents;
        self
    }

    /// Send `text` as a new user message and run it through one [`Turn`].
    ///
    /// Returns the turn's events; `Session::history`/`Session::stats`
    /// reflect the updated state afterward.
    pub async fn send_message(&mut self, text: impl Into<String>, abort: &CancellationToken) -> Vec<TurnEvent> {
        if let Some(max) = self.config.max_session_turns
            && self.stats.turns >= max
        {
            return vec![TurnEvent::MaxSessionTurns { iterations: self.stats.turns }];
        }

        self.enforce_max_conversation_length();

        let text = text.into();
        let system = self
            .subagents
            .resolve(&text)
            .map(|profile| SystemPrompt::Text(profile.system_prompt.clone()))
            .or_else(|| system_prompt_for(&self.config));
        self.turn.set_system(system);

        let outcome = self
            .turn
            .run(&self.history, Message::user(text), abort, &self.cwd, &self.session_id, &self.environment)
            .await;

        self.history = outcome.history;
        self.stats.turns += 1;
        for event in &outcome.events {
            match event {
                TurnEvent::ToolCallRequest(_) => self.stats.tool_calls += 1,
                TurnEvent::ToolCallResponse(Part::FunctionResponse { response, .. }) => {
                    if !response.contains_key("error") {
                        self.stats.successful_calls += 1;
                    }
                }
                _ => {}
            }
        }

        outcome.events
    }

    #[must_use]
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// `max_conversation_length` is a hard cap independent of token budget
    /// (the turn's own auto-compression handles the token-budget case);
    /// enforced by dropping the oldest messages before the next turn runs.
    fn enforce_max_conversation_length(&mut self) {
        if let Some(max_len) = self.config.max_conversation_length
            && self.history.len() > max_len
        {
            let excess = self.history.len() - max_len;
            self.history.drain(0..excess);
        }
    }
}

fn build_turn_config(config: &RelayConfig, system_override: Option<SystemPrompt>) -> TurnConfig {
    let mut turn_config = TurnConfig::new(config.model.clone());
    turn_config.system = system_override.or_else(|| system_prompt_for(config));
    turn_config.auto_compress = true;
    turn_config.compress_threshold = config.auto_compress_threshold;
    turn_config.retry = config.retry.clone();
    turn_config
}

fn system_prompt_for(config: &RelayConfig) -> Option<SystemPrompt> {
    if config.system_prompt_template.is_empty() {
        None
    } else {
        Some(SystemPrompt::Text(config.system_prompt_template.clone()))
    }
}
