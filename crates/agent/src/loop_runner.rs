//! The counselling agent loop.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use unipath_config::AppConfig;
use unipath_core::domain::{ChatTurn, Profile};
use unipath_core::error::{Error, ToolError};
use unipath_core::event::{DomainEvent, EventBus};
use unipath_core::message::{Conversation, Message, MessageToolCall};
use unipath_core::provider::{Provider, ProviderRequest};
use unipath_core::store::CounselStore;
use unipath_core::tool::{ToolCall, ToolRegistry};

use crate::history::{HISTORY_LIMIT, truncate_history};
use crate::prompt::assemble_system_prompt;

/// Model rounds per turn before the loop gives up.
pub const DEFAULT_MAX_ITERATIONS: usize = 8;

/// Returned when the model keeps requesting tools past the iteration cap.
pub const ITERATION_LIMIT_REPLY: &str = "I wasn't able to finish that request in one go. \
Could you tell me a bit more precisely what you'd like me to do?";

/// What happened during one turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    /// Model calls made
    pub iterations: usize,
    /// Tool names in the order they were executed
    pub tools_executed: Vec<String>,
}

/// Runs one chat turn: profile → prompt → model/tool cycle → reply.
pub struct CounselAgent {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    store: Arc<dyn CounselStore>,
    event_bus: Arc<EventBus>,
    max_iterations: usize,
    history_limit: usize,
}

impl CounselAgent {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
        store: Arc<dyn CounselStore>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            tools,
            store,
            event_bus,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            history_limit: HISTORY_LIMIT,
        }
    }

    /// Wire an agent from configuration: default provider, the counselling
    /// tool registry over `store`, and the configured limits.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn CounselStore>,
        event_bus: Arc<EventBus>,
    ) -> Result<Self, Error> {
        Self::from_config_with_provider(config, None, store, event_bus)
    }

    /// Like [`from_config`](Self::from_config), but answers through the named
    /// provider. A `[providers.<name>]` `default_model` replaces the global
    /// model when a non-default provider is chosen.
    pub fn from_config_with_provider(
        config: &AppConfig,
        provider_name: Option<&str>,
        store: Arc<dyn CounselStore>,
        event_bus: Arc<EventBus>,
    ) -> Result<Self, Error> {
        let router = unipath_providers::build_from_config(config);
        let name = provider_name.unwrap_or(router.default_name());
        let provider = router.get(name).ok_or_else(|| Error::Config {
            message: format!(
                "provider '{name}' is not configured (available: {})",
                router.list().join(", ")
            ),
        })?;

        let model = if name == config.default_provider {
            config.default_model.clone()
        } else {
            config
                .providers
                .get(name)
                .and_then(|p| p.default_model.clone())
                .unwrap_or_else(|| config.default_model.clone())
        };

        let tools = Arc::new(unipath_tools::counsel_registry(
            store.clone(),
            config.agent.search_limit,
        ));

        Ok(Self::new(
            provider,
            model,
            config.default_temperature,
            tools,
            store,
            event_bus,
        )
        .with_max_tokens(config.default_max_tokens)
        .with_max_iterations(config.agent.max_iterations)
        .with_history_limit(config.agent.history_limit))
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Answer the latest turn and return the reply text.
    pub async fn respond(&self, user_id: &str, turns: &[ChatTurn]) -> Result<String, Error> {
        Ok(self.respond_detailed(user_id, turns).await?.reply)
    }

    pub async fn respond_detailed(
        &self,
        user_id: &str,
        turns: &[ChatTurn],
    ) -> Result<TurnOutcome, Error> {
        let profile = self.load_profile(user_id).await;
        let system_prompt = assemble_system_prompt(&profile);
        let history = truncate_history(turns, self.history_limit);

        info!(
            user_id,
            turns = turns.len(),
            kept = history.len(),
            "Processing chat turn"
        );

        let mut conversation = Conversation::seeded(system_prompt, history);
        let tool_definitions = self.tools.definitions();
        let mut tools_executed = Vec::new();
        let mut iteration = 0;

        loop {
            iteration += 1;

            if iteration > self.max_iterations {
                warn!(
                    user_id,
                    iterations = self.max_iterations,
                    "Max tool iterations reached, giving up on this turn"
                );
                return Ok(TurnOutcome {
                    reply: ITERATION_LIMIT_REPLY.to_string(),
                    iterations: self.max_iterations,
                    tools_executed,
                });
            }

            debug!(user_id, iteration, "Agent loop iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: conversation.messages.clone(),
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                tools: tool_definitions.clone(),
            };

            let response = match self.provider.complete(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(user_id, provider = self.provider.name(), error = %e, "Model call failed");
                    self.event_bus.publish(DomainEvent::TurnFailed {
                        user_id: user_id.to_string(),
                        error_message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    return Err(e.into());
                }
            };

            if let Some(usage) = &response.usage {
                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    user_id: user_id.to_string(),
                    model: response.model.clone(),
                    tokens_used: usage.total_tokens,
                    timestamp: Utc::now(),
                });
            }

            if !response.wants_tools() {
                return Ok(TurnOutcome {
                    reply: response.message.content,
                    iterations: iteration,
                    tools_executed,
                });
            }

            debug!(
                tool_count = response.message.tool_calls.len(),
                "Executing tool calls"
            );

            let tool_calls = response.message.tool_calls.clone();
            conversation.push(response.message);

            // Sequential, in the order the model asked for them.
            for tc in &tool_calls {
                let output = self.run_tool(user_id, tc).await;
                tools_executed.push(tc.name.clone());
                conversation.push(Message::tool_result(&tc.id, output));
            }
        }
    }

    /// A missing profile (or one the store cannot read) becomes an empty one,
    /// so every context field falls back to its sentinel.
    async fn load_profile(&self, user_id: &str) -> Profile {
        match self.store.get_profile(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                debug!(user_id, "No profile found, using empty context");
                Profile::new(user_id)
            }
            Err(e) => {
                warn!(user_id, error = %e, "Failed to load profile, using empty context");
                Profile::new(user_id)
            }
        }
    }

    /// Execute one tool call and return the text the model sees. Failures are
    /// reported back as text rather than aborting the turn.
    async fn run_tool(&self, user_id: &str, tc: &MessageToolCall) -> String {
        let start = Instant::now();

        let result = match parse_call_arguments(tc) {
            Ok(call) => self.tools.execute(&call).await,
            Err(e) => Err(e),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, output) = match result {
            Ok(tool_result) => {
                debug!(tool = %tc.name, success = tool_result.success, duration_ms, "Tool executed");
                (tool_result.success, tool_result.output)
            }
            Err(e) => {
                warn!(tool = %tc.name, error = %e, "Tool execution failed");
                (false, format!("Error: {e}"))
            }
        };

        self.event_bus.publish(DomainEvent::ToolExecuted {
            user_id: user_id.to_string(),
            tool_name: tc.name.clone(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });

        output
    }
}

/// Decode the model's argument string. An empty string means no arguments.
fn parse_call_arguments(tc: &MessageToolCall) -> Result<ToolCall, ToolError> {
    let arguments = if tc.arguments.trim().is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(&tc.arguments).map_err(|e| {
            ToolError::InvalidArguments(format!("{}: arguments are not valid JSON: {e}", tc.name))
        })?
    };

    Ok(ToolCall {
        id: tc.id.clone(),
        name: tc.name.clone(),
        arguments,
    })
}
