// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Task Assistant
//!
//! One chat turn: build the prompt from recent history, let the model call
//! task tools, and produce the final reply.
//!
//! ## Turn
//!
//! 1. Prompt = system prompt (with today's date) + recent user/assistant turns
//! 2. First completion with the tool schema and `tool_choice: auto`
//! 3. If the model called tools: run each, append the results as `tool`
//!    messages, then a second completion without tools
//! 4. Otherwise the first reply's text is the answer
//!
//! Model and tool failures never become HTTP errors. They are turned into
//! an apology reply by [`respond`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::ChatMessage;
use crate::storage::Store;

pub mod client;
pub mod prompt;
pub mod tools;

pub use client::{
    AgentError, AssistantReply, ChatModel, FunctionCall, OpenRouterClient, PromptMessage, ToolCall,
};

/// Number of stored messages replayed into the prompt.
pub const HISTORY_WINDOW: usize = 10;

/// Reply used when the model answers with neither text nor tool calls.
const EMPTY_REPLY: &str = "Okay.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    pub tool_calls_executed: bool,
}

/// Run a turn, folding any failure into the reply text.
pub async fn respond(
    model: Option<&dyn ChatModel>,
    store: &dyn Store,
    user_id: Uuid,
    history: &[ChatMessage],
    now: DateTime<Utc>,
) -> TurnOutcome {
    match converse(model, store, user_id, history, now).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, user_id = %user_id, "Chat turn failed");
            TurnOutcome {
                reply: format!("I encountered an error processing your request: {e}"),
                tool_calls_executed: false,
            }
        }
    }
}

async fn converse(
    model: Option<&dyn ChatModel>,
    store: &dyn Store,
    user_id: Uuid,
    history: &[ChatMessage],
    now: DateTime<Utc>,
) -> Result<TurnOutcome, AgentError> {
    let model = model.ok_or(AgentError::NotConfigured)?;

    let mut messages = prompt::build_messages(now.date_naive(), history);
    let schema = prompt::tools_schema();

    let first = model.complete(&messages, Some(&schema)).await?;

    if first.tool_calls.is_empty() {
        let reply = first
            .content
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| EMPTY_REPLY.to_string());
        return Ok(TurnOutcome {
            reply,
            tool_calls_executed: false,
        });
    }

    messages.push(PromptMessage::Assistant {
        content: first.content.clone(),
        tool_calls: first.tool_calls.clone(),
    });

    for call in &first.tool_calls {
        let result = tools::execute(
            store,
            user_id,
            &call.function.name,
            &call.function.arguments,
            now,
        )
        .await?;
        messages.push(PromptMessage::Tool {
            tool_call_id: call.id.clone(),
            content: result.to_string(),
        });
    }

    let last = model.complete(&messages, None).await?;
    Ok(TurnOutcome {
        reply: last.content.unwrap_or_default(),
        tool_calls_executed: true,
    })
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedModel;
    use super::*;
    use crate::models::ChatRole;
    use crate::storage::InMemoryStore;

    fn history(text: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::new(Uuid::new_v4(), ChatRole::User, text, Utc::now())]
    }

    #[tokio::test]
    async fn plain_reply_skips_tools() {
        let store = InMemoryStore::new();
        let model = ScriptedModel::new(vec![AssistantReply::text("Hi there")]);

        let outcome = respond(Some(&model), &store, Uuid::new_v4(), &history("hello"), Utc::now()).await;
        assert_eq!(outcome.reply, "Hi there");
        assert!(!outcome.tool_calls_executed);

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].with_tools);
    }

    #[tokio::test]
    async fn empty_reply_becomes_okay() {
        let store = InMemoryStore::new();
        let model = ScriptedModel::new(vec![AssistantReply::default()]);

        let outcome = respond(Some(&model), &store, Uuid::new_v4(), &history("hm"), Utc::now()).await;
        assert_eq!(outcome.reply, "Okay.");
    }

    #[tokio::test]
    async fn tool_calls_run_then_second_completion_answers() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        let model = ScriptedModel::new(vec![
            AssistantReply::calls(vec![ToolCall::new(
                "call_1",
                tools::ADD_TASK,
                r#"{"title":"Buy milk","user_id":"ignored"}"#,
            )]),
            AssistantReply::text("Added Buy milk."),
        ]);

        let outcome = respond(Some(&model), &store, user, &history("add milk"), Utc::now()).await;
        assert_eq!(outcome.reply, "Added Buy milk.");
        assert!(outcome.tool_calls_executed);

        let tasks = store.tasks_for_user(user).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Buy milk");

        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        assert!(!calls[1].with_tools);
        match calls[1].messages.last() {
            Some(PromptMessage::Tool {
                tool_call_id,
                content,
            }) => {
                assert_eq!(tool_call_id, "call_1");
                assert!(content.contains("Task 'Buy milk' added."));
            }
            other => panic!("expected tool message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn model_failure_becomes_apology() {
        let store = InMemoryStore::new();
        let model = ScriptedModel::failing("upstream down");

        let outcome = respond(Some(&model), &store, Uuid::new_v4(), &history("hi"), Utc::now()).await;
        assert_eq!(
            outcome.reply,
            "I encountered an error processing your request: Unexpected chat model response: upstream down"
        );
        assert!(!outcome.tool_calls_executed);
    }

    #[tokio::test]
    async fn missing_model_is_reported_in_reply() {
        let store = InMemoryStore::new();
        let outcome = respond(None, &store, Uuid::new_v4(), &history("hi"), Utc::now()).await;
        assert_eq!(
            outcome.reply,
            "I encountered an error processing your request: Chat assistant is not configured"
        );
    }
}
