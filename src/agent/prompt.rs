// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! System prompt and tool schema for the task assistant.

use chrono::NaiveDate;
use serde_json::{json, Value};

use super::client::PromptMessage;
use super::tools;
use crate::models::{ChatMessage, ChatRole};

const SYSTEM_PROMPT: &str = "
You are Aurora, an intelligent Task Orchestrator.
Your goal is to ensure the user stays organized and productive.
Today's date is: {current_date}

BEHAVIORAL GUIDELINES:
1. **Direct & Action-Oriented**: Do not explain what you are doing, just do it.
2. **Smart Parsing**: If the user provides a relative date like \"next friday\", calculate the specific date.
3. **Data Integrity**: Always ensure dates are formatted as YYYY-MM-DD before saving.
4. **Duplicate Handling**: If you find multiple tasks with the same name when deleting, ask the user for clarification using the task IDs provided in the error message.
";

pub fn system_prompt(today: NaiveDate) -> String {
    SYSTEM_PROMPT.replace("{current_date}", &today.format("%Y-%m-%d").to_string())
}

/// System prompt followed by the user and assistant turns of `history`.
pub fn build_messages(today: NaiveDate, history: &[ChatMessage]) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(PromptMessage::System {
        content: system_prompt(today),
    });
    for message in history {
        match message.role {
            ChatRole::User => messages.push(PromptMessage::User {
                content: message.content.clone(),
            }),
            ChatRole::Assistant => messages.push(PromptMessage::Assistant {
                content: Some(message.content.clone()),
                tool_calls: Vec::new(),
            }),
            ChatRole::System | ChatRole::Tool => {}
        }
    }
    messages
}

fn function(name: &str, description: &str, parameters: Value) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": parameters,
        }
    })
}

fn no_parameters() -> Value {
    json!({"type": "object", "properties": {}, "required": []})
}

/// Function schema array advertised to the model.
pub fn tools_schema() -> Value {
    Value::Array(vec![
        function(
            tools::ADD_TASK,
            "Add a new task",
            json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Task title"},
                    "description": {"type": "string", "description": "Task description"},
                    "priority": {"type": "string", "enum": ["low", "medium", "high"], "description": "Task priority"},
                    "due_date": {"type": "string", "description": "Due date in YYYY-MM-DD format"},
                    "tags": {"type": "string", "description": "Comma-separated tags"}
                },
                "required": ["title"]
            }),
        ),
        function(
            tools::UPDATE_TASK,
            "Update an existing task. Identify the task by its CURRENT title.",
            json!({
                "type": "object",
                "properties": {
                    "current_title": {"type": "string", "description": "The exact title of the task to update"},
                    "new_title": {"type": "string", "description": "The new title (if renaming)"},
                    "description": {"type": "string", "description": "New description"},
                    "priority": {"type": "string", "enum": ["low", "medium", "high"]},
                    "status": {"type": "string", "enum": ["pending", "completed"]},
                    "due_date": {"type": "string", "description": "YYYY-MM-DD"},
                    "tags": {"type": "string"}
                },
                "required": ["current_title"]
            }),
        ),
        function(
            tools::LIST_TASKS,
            "List tasks for the user",
            json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "enum": ["all", "pending", "completed", "archived"]}
                }
            }),
        ),
        function(
            tools::DELETE_TASK,
            "Delete a task. Handles duplicates: if multiple tasks have the same title, use task_id.",
            json!({
                "type": "object",
                "properties": {
                    "task_title": {"type": "string", "description": "Title of the task to delete (if unique)"},
                    "task_id": {"type": "string", "description": "The specific UUID of the task (use this to resolve duplicates)"}
                }
            }),
        ),
        function(
            tools::DELETE_ALL_TASKS,
            "Delete all tasks for the user",
            no_parameters(),
        ),
        function(
            tools::COMPLETE_ALL_TASKS,
            "Mark all tasks as completed for the user",
            no_parameters(),
        ),
        function(
            tools::GET_ANALYTICS,
            "Get analytics data for the user",
            no_parameters(),
        ),
        function(
            tools::MARK_ALL_TASKS_INCOMPLETE,
            "Mark all tasks as incomplete for the user",
            no_parameters(),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn system_prompt_carries_date() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let prompt = system_prompt(today);
        assert!(prompt.contains("Today's date is: 2026-03-09"));
        assert!(!prompt.contains("{current_date}"));
    }

    #[test]
    fn history_keeps_only_user_and_assistant_turns() {
        let conversation = Uuid::new_v4();
        let now = Utc::now();
        let history = vec![
            ChatMessage::new(conversation, ChatRole::User, "add milk", now),
            ChatMessage::new(conversation, ChatRole::Tool, "{\"status\":\"success\"}", now),
            ChatMessage::new(conversation, ChatRole::Assistant, "Added.", now),
        ];

        let messages = build_messages(Utc::now().date_naive(), &history);
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[0], PromptMessage::System { .. }));
        assert_eq!(
            messages[1],
            PromptMessage::User {
                content: "add milk".into()
            }
        );
        assert!(matches!(&messages[2], PromptMessage::Assistant { content: Some(c), .. } if c == "Added."));
    }

    #[test]
    fn schema_advertises_every_tool() {
        let schema = tools_schema();
        let names: Vec<&str> = schema
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["function"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names.len(), tools::NAMES.len());
        for name in tools::NAMES {
            assert!(names.contains(&name), "missing {name}");
        }
    }
}
