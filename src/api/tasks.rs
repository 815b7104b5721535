// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use uuid::Uuid;

use crate::{
    auth::{Auth, AuthenticatedUser},
    error::{ApiError, ApiJson},
    models::{DashboardStats, DeleteTaskResponse, Task, TaskCreate, TaskStatus, TaskUpdate},
    state::AppState,
};

/// Window for `tasks_due_soon`.
const DUE_SOON_WINDOW_DAYS: i64 = 7;

/// Dashboard counters for one user's tasks at instant `now`.
pub fn compute_stats(tasks: &[Task], now: DateTime<Utc>) -> DashboardStats {
    let today_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    let due_soon_end = now + Duration::days(DUE_SOON_WINDOW_DAYS);

    let total = tasks.len() as u64;
    let completed = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count() as u64;
    let completed_today = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed && t.updated_at >= today_start)
        .count() as u64;
    let due_soon = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .filter_map(|t| t.due_date)
        .filter(|due| *due >= now && *due <= due_soon_end)
        .count() as u64;

    let productivity_score = if total > 0 {
        (completed as f64 / total as f64 * 100.0).round_ties_even() as u64
    } else {
        0
    };

    DashboardStats {
        tasks_due_soon: due_soon,
        completed_today,
        productivity_score,
        total_tasks: total,
        completed_tasks: completed,
    }
}

fn parse_task_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::unprocessable("Invalid task ID"))
}

/// Load a task the caller owns: 404 if absent, 403 if foreign.
async fn owned_task(state: &AppState, user: &AuthenticatedUser, id: Uuid) -> Result<Task, ApiError> {
    let task = state
        .store
        .task_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))?;
    if task.user_id != user.id() {
        return Err(ApiError::forbidden("Not authorized"));
    }
    Ok(task)
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/stats",
    tag = "Tasks",
    security(("bearer_auth" = [])),
    responses((status = 200, body = DashboardStats))
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<DashboardStats>, ApiError> {
    let tasks = state.store.tasks_for_user(user.id()).await?;
    Ok(Json(compute_stats(&tasks, Utc::now())))
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    tag = "Tasks",
    security(("bearer_auth" = [])),
    responses((status = 200, body = [Task]))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.store.tasks_for_user(user.id()).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = TaskCreate,
    tag = "Tasks",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = Task),
        (status = 400, description = "Title is blank")
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    Auth(user): Auth,
    ApiJson(request): ApiJson<TaskCreate>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    if request.title.trim().is_empty() {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }

    let mut task = Task::new(user.id(), request.title, Utc::now());
    task.description = request.description;
    task.status = request.status.unwrap_or_default();
    task.priority = request.priority.unwrap_or_default();
    task.due_date = request.due_date;
    task.tags = request.tags;

    state.store.insert_task(&task).await?;
    tracing::debug!(task_id = %task.id, user_id = %user.id(), "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/api/v1/tasks/{task_id}",
    params(("task_id" = String, Path, description = "Task UUID")),
    tag = "Tasks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = Task),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn get_task(
    Path(task_id): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&task_id)?;
    Ok(Json(owned_task(&state, &user, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/tasks/{task_id}",
    params(("task_id" = String, Path, description = "Task UUID")),
    request_body = TaskUpdate,
    tag = "Tasks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = Task),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn update_task(
    Path(task_id): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
    ApiJson(update): ApiJson<TaskUpdate>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_task_id(&task_id)?;
    let mut task = owned_task(&state, &user, id).await?;
    if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::bad_request("Title cannot be empty"));
    }

    update.apply(&mut task, Utc::now());
    state.store.update_task(&task).await?;
    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{task_id}",
    params(("task_id" = String, Path, description = "Task UUID")),
    tag = "Tasks",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = DeleteTaskResponse),
        (status = 403, description = "Task belongs to another user"),
        (status = 404, description = "Task not found")
    )
)]
pub async fn delete_task(
    Path(task_id): Path<String>,
    State(state): State<AppState>,
    Auth(user): Auth,
) -> Result<Json<DeleteTaskResponse>, ApiError> {
    let id = parse_task_id(&task_id)?;
    let task = owned_task(&state, &user, id).await?;
    state.store.delete_task(task.id).await?;
    Ok(Json(DeleteTaskResponse { ok: true }))
}
