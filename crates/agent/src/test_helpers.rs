//! Shared test helpers: a scripted provider and response builders.

use std::sync::Mutex;
use unipath_core::error::ProviderError;
use unipath_core::message::{Message, MessageToolCall};
use unipath_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};

/// A mock provider that replays scripted responses in order and records every
/// request it receives.
///
/// Panics if more calls are made than responses provided, unless built with
/// [`ScriptedProvider::repeating`].
pub struct ScriptedProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    repeat_last: bool,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect(), false)
    }

    /// Returns `response` on every call.
    pub fn repeating(response: ProviderResponse) -> Self {
        Self::with_results(vec![Ok(response)], true)
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::with_results(vec![Err(error)], true)
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn tool_then_answer(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![
            make_tool_call_response(tool_calls, ""),
            make_text_response(answer),
        ])
    }

    fn with_results(
        responses: Vec<Result<ProviderResponse, ProviderError>>,
        repeat_last: bool,
    ) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
            repeat_last,
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };

        let responses = self.responses.lock().unwrap();
        let idx = if self.repeat_last {
            call.min(responses.len() - 1)
        } else {
            call
        };
        match responses.get(idx) {
            Some(response) => response.clone(),
            None => panic!(
                "ScriptedProvider: no more responses (call #{call}, have {})",
                responses.len()
            ),
        }
    }
}

/// A text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A response requesting `tool_calls`, with optional accompanying text.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, text: &str) -> ProviderResponse {
    let mut message = Message::assistant(text);
    message.tool_calls = tool_calls;
    ProviderResponse {
        message,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}
