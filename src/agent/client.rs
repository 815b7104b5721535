// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chat completion client.
//!
//! Messages and tool calls use the OpenAI chat-completions wire shape,
//! which OpenRouter accepts unchanged.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::ChatSettings;
use crate::storage::StoreError;

/// Request timeout for a single completion.
pub const COMPLETION_TIMEOUT: Duration = Duration::from_secs(60);

/// Referer header OpenRouter uses to attribute traffic.
const HTTP_REFERER: &str = "http://localhost:3000";
const X_TITLE: &str = "Aurora Task Agent";

/// Maximum number of response-body characters kept in an error.
const ERROR_BODY_MAX_CHARS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Chat assistant is not configured")]
    NotConfigured,

    #[error("Request to chat model failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Chat model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected chat model response: {0}")]
    InvalidResponse(String),

    #[error("Tool execution failed: {0}")]
    Tool(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, as produced by the model.
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// One entry of the prompt sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum PromptMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

/// The model's reply to one completion request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistantReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl AssistantReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync + 'static {
    /// Run one completion. `tools` is the function schema array; when
    /// present the model may answer with tool calls.
    async fn complete(
        &self,
        messages: &[PromptMessage],
        tools: Option<&Value>,
    ) -> Result<AssistantReply, AgentError>;
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

fn parse_completion(body: &str) -> Result<AssistantReply, AgentError> {
    let response: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| AgentError::InvalidResponse(format!("malformed JSON: {e}")))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AgentError::InvalidResponse("no choices returned".to_string()))?;
    Ok(AssistantReply {
        content: choice.message.content,
        tool_calls: choice.message.tool_calls.unwrap_or_default(),
    })
}

/// OpenRouter chat-completions client.
pub struct OpenRouterClient {
    http: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenRouterClient {
    /// Returns `None` when no API key is configured.
    pub fn from_settings(settings: &ChatSettings) -> Result<Option<Self>, AgentError> {
        let Some(api_key) = settings.api_key.clone() else {
            return Ok(None);
        };

        let mut headers = header::HeaderMap::new();
        headers.insert("HTTP-Referer", header::HeaderValue::from_static(HTTP_REFERER));
        headers.insert("X-Title", header::HeaderValue::from_static(X_TITLE));

        let http = Client::builder()
            .timeout(COMPLETION_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Some(Self {
            http,
            api_key,
            model: settings.model.clone(),
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
        }))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, messages: &[PromptMessage], tools: Option<&Value>) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if let Some(tools) = tools {
            body["tools"] = tools.clone();
            body["tool_choice"] = json!("auto");
        }
        body
    }
}

#[async_trait]
impl ChatModel for OpenRouterClient {
    async fn complete(
        &self,
        messages: &[PromptMessage],
        tools: Option<&Value>,
    ) -> Result<AssistantReply, AgentError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages, tools))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AgentError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_MAX_CHARS).collect(),
            });
        }

        parse_completion(&text)
    }
}
