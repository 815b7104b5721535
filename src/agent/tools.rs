// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Task tools the assistant can call.
//!
//! Every tool runs against the calling user's tasks only. Results are JSON
//! objects with a `status` of `success` or `error` and are fed back to the
//! model verbatim, so user-facing failures are values, not `Err`s. Only
//! storage failures propagate.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::{stored_timestamp, Task, TaskPriority, TaskStatus};
use crate::storage::{Store, StoreResult};

pub const ADD_TASK: &str = "add_task";
pub const UPDATE_TASK: &str = "update_task";
pub const LIST_TASKS: &str = "list_tasks";
pub const DELETE_TASK: &str = "delete_task";
pub const DELETE_ALL_TASKS: &str = "delete_all_tasks";
pub const COMPLETE_ALL_TASKS: &str = "complete_all_tasks";
pub const MARK_ALL_TASKS_INCOMPLETE: &str = "mark_all_tasks_incomplete";
pub const GET_ANALYTICS: &str = "get_analytics";

pub const NAMES: [&str; 8] = [
    ADD_TASK,
    UPDATE_TASK,
    LIST_TASKS,
    DELETE_TASK,
    DELETE_ALL_TASKS,
    COMPLETE_ALL_TASKS,
    MARK_ALL_TASKS_INCOMPLETE,
    GET_ANALYTICS,
];

#[derive(Debug, Deserialize)]
struct AddTaskArgs {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    tags: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskArgs {
    current_title: String,
    #[serde(default)]
    new_title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    tags: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListTasksArgs {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DeleteTaskArgs {
    #[serde(default)]
    task_title: Option<String>,
    #[serde(default)]
    task_id: Option<String>,
}

fn success(message: impl Into<String>) -> Value {
    json!({"status": "success", "message": message.into()})
}

fn error(message: impl Into<String>) -> Value {
    json!({"status": "error", "message": message.into()})
}

fn invalid_arguments(name: &str, reason: impl std::fmt::Display) -> Value {
    error(format!("Invalid arguments for {name}: {reason}"))
}

fn parse_args<T: DeserializeOwned>(name: &str, args: Value) -> Result<T, Value> {
    serde_json::from_value(args).map_err(|e| invalid_arguments(name, e))
}

/// Models often send `""` for fields they mean to leave out.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `YYYY-MM-DD` as midnight UTC. Anything else yields `None`.
fn parse_due_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

/// Run tool `name` with JSON-encoded `arguments` for `user_id`.
pub async fn execute(
    store: &dyn Store,
    user_id: Uuid,
    name: &str,
    arguments: &str,
    now: DateTime<Utc>,
) -> StoreResult<Value> {
    let args: Value = if arguments.trim().is_empty() {
        json!({})
    } else {
        match serde_json::from_str(arguments) {
            Ok(args) => args,
            Err(e) => return Ok(invalid_arguments(name, e)),
        }
    };

    tracing::debug!(tool = name, user_id = %user_id, "Executing assistant tool");

    match name {
        ADD_TASK => match parse_args(name, args) {
            Ok(args) => add_task(store, user_id, args, now).await,
            Err(result) => Ok(result),
        },
        UPDATE_TASK => match parse_args(name, args) {
            Ok(args) => update_task(store, user_id, args, now).await,
            Err(result) => Ok(result),
        },
        LIST_TASKS => match parse_args(name, args) {
            Ok(args) => list_tasks(store, user_id, args).await,
            Err(result) => Ok(result),
        },
        DELETE_TASK => match parse_args(name, args) {
            Ok(args) => delete_task(store, user_id, args).await,
            Err(result) => Ok(result),
        },
        DELETE_ALL_TASKS => {
            let deleted = store.delete_tasks_for_user(user_id).await?;
            Ok(success(format!("Deleted {deleted} tasks.")))
        }
        COMPLETE_ALL_TASKS => {
            store
                .set_status_for_user(user_id, TaskStatus::Completed, now)
                .await?;
            Ok(success("All tasks marked completed."))
        }
        MARK_ALL_TASKS_INCOMPLETE => {
            store
                .set_status_for_user(user_id, TaskStatus::Pending, now)
                .await?;
            Ok(success("All tasks marked pending."))
        }
        GET_ANALYTICS => get_analytics(store, user_id).await,
        other => Ok(error(format!("Tool {other} not found"))),
    }
}

async fn add_task(
    store: &dyn Store,
    user_id: Uuid,
    args: AddTaskArgs,
    now: DateTime<Utc>,
) -> StoreResult<Value> {
    if args.title.trim().is_empty() {
        return Ok(invalid_arguments(ADD_TASK, "title must not be empty"));
    }

    let mut task = Task::new(user_id, args.title, now);
    task.description = non_empty(args.description);
    task.tags = non_empty(args.tags);
    task.due_date = non_empty(args.due_date).and_then(|d| parse_due_date(&d));
    if let Some(priority) = non_empty(args.priority) {
        match priority.to_lowercase().parse::<TaskPriority>() {
            Ok(priority) => task.priority = priority,
            Err(e) => return Ok(invalid_arguments(ADD_TASK, e)),
        }
    }

    store.insert_task(&task).await?;

    Ok(json!({
        "status": "success",
        "message": format!("Task '{}' added.", task.title),
        "task": {"id": task.id.to_string(), "title": task.title},
    }))
}

async fn update_task(
    store: &dyn Store,
    user_id: Uuid,
    args: UpdateTaskArgs,
    now: DateTime<Utc>,
) -> StoreResult<Value> {
    if args.current_title.is_empty() {
        return Ok(error("Missing fields"));
    }

    let mut matches: Vec<Task> = store
        .tasks_for_user(user_id)
        .await?
        .into_iter()
        .filter(|t| t.title == args.current_title)
        .collect();

    let mut task = match matches.len() {
        0 => return Ok(error("Task not found.")),
        1 => matches.remove(0),
        n => {
            return Ok(error(format!(
                "Found {n} tasks named '{}'. Please rename them via ID first or delete the duplicates.",
                args.current_title
            )))
        }
    };

    if let Some(title) = non_empty(args.new_title) {
        task.title = title;
    }
    if let Some(description) = non_empty(args.description) {
        task.description = Some(description);
    }
    if let Some(priority) = non_empty(args.priority) {
        match priority.to_lowercase().parse::<TaskPriority>() {
            Ok(priority) => task.priority = priority,
            Err(e) => return Ok(invalid_arguments(UPDATE_TASK, e)),
        }
    }
    if let Some(status) = non_empty(args.status) {
        match status.to_lowercase().parse::<TaskStatus>() {
            Ok(status) => task.status = status,
            Err(e) => return Ok(invalid_arguments(UPDATE_TASK, e)),
        }
    }
    if let Some(tags) = non_empty(args.tags) {
        task.tags = Some(tags);
    }
    if let Some(due) = non_empty(args.due_date).and_then(|d| parse_due_date(&d)) {
        task.due_date = Some(due);
    }
    task.updated_at = stored_timestamp(now);

    store.update_task(&task).await?;

    Ok(json!({
        "status": "success",
        "message": format!("Task '{}' updated.", args.current_title),
        "task": {"title": task.title},
    }))
}

async fn list_tasks(store: &dyn Store, user_id: Uuid, args: ListTasksArgs) -> StoreResult<Value> {
    let filter = match non_empty(args.status).map(|s| s.to_lowercase()) {
        None => None,
        Some(s) if s == "all" => None,
        Some(s) => match s.parse::<TaskStatus>() {
            Ok(status) => Some(status),
            Err(e) => return Ok(invalid_arguments(LIST_TASKS, e)),
        },
    };

    let mut tasks = store.tasks_for_user(user_id).await?;
    tasks.reverse();

    let listed: Vec<Value> = tasks
        .iter()
        .filter(|t| filter.is_none_or(|status| t.status == status))
        .map(|t| {
            json!({
                "id": t.id.to_string(),
                "title": t.title,
                "priority": t.priority,
                "status": t.status,
                "due_date": t.due_date,
                "created_at": t.created_at,
            })
        })
        .collect();

    Ok(json!({"status": "success", "tasks": listed}))
}

async fn delete_task(store: &dyn Store, user_id: Uuid, args: DeleteTaskArgs) -> StoreResult<Value> {
    let title = non_empty(args.task_title);
    let id = non_empty(args.task_id);

    if let Some(raw_id) = id {
        let Ok(task_id) = Uuid::parse_str(raw_id.trim()) else {
            return Ok(error("Invalid ID format."));
        };
        return match store.task_by_id(task_id).await? {
            Some(task) if task.user_id == user_id => {
                store.delete_task(task.id).await?;
                Ok(success(format!("Task '{}' deleted.", task.title)))
            }
            _ => Ok(error(format!("Task ID {raw_id} not found."))),
        };
    }

    let Some(title) = title else {
        return Ok(error("Please provide either a task title or task ID."));
    };

    // Oldest first, so "number 1" always names the same task.
    let matches: Vec<Task> = store
        .tasks_for_user(user_id)
        .await?
        .into_iter()
        .filter(|t| t.title == title)
        .collect();

    match matches.as_slice() {
        [] => Ok(error(format!("Task '{title}' not found."))),
        [task] => {
            store.delete_task(task.id).await?;
            Ok(success(format!("Task '{title}' deleted.")))
        }
        duplicates => Ok(json!({
            "status": "error",
            "message": format!(
                "I found multiple tasks named '{title}'. Which one?\n{}\n\nYou can say 'Delete number 1' or 'Delete the high priority one'.",
                describe_duplicates(duplicates)
            ),
            "requires_clarification": true,
        })),
    }
}

fn describe_duplicates(tasks: &[Task]) -> String {
    tasks
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let due = t
                .due_date
                .map(|d| format!(" | Due: {}", d.format("%Y-%m-%d")))
                .unwrap_or_default();
            format!(
                "{}. [{}] Created: {}{} (ID: {})",
                i + 1,
                t.priority.as_str().to_uppercase(),
                t.created_at.format("%Y-%m-%d %H:%M:%S"),
                due,
                t.id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

async fn get_analytics(store: &dyn Store, user_id: Uuid) -> StoreResult<Value> {
    let tasks = store.tasks_for_user(user_id).await?;
    let total = tasks.len();
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let pending = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .count();
    let score = if total > 0 { completed * 100 / total } else { 0 };

    Ok(json!({
        "status": "success",
        "analytics": {
            "tasks_total": total,
            "tasks_completed": completed,
            "tasks_pending": pending,
            "productivity_score": score,
        },
    }))
}
