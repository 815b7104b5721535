// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::API_V1_PREFIX,
    models::{
        ChatRequest, ChatResponse, ChatRole, ConversationDetail, ConversationMessage,
        ConversationSummary, DashboardStats, DeleteTaskResponse, MessageResponse, Task,
        TaskCreate, TaskPriority, TaskStatus, TaskUpdate, TokenResponse, UserCreate, UserLogin,
        UserRead,
    },
    state::AppState,
};

pub mod auth;
pub mod chat;
pub mod health;
pub mod tasks;

/// Browser origins allowed by CORS. Unparseable entries are skipped.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let v1_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/tasks/stats", get(tasks::dashboard_stats))
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route("/tasks/", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/{task_id}",
            get(tasks::get_task)
                .put(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/chat", post(chat::chat))
        .route("/conversations", get(chat::list_conversations))
        .route(
            "/conversations/{conversation_id}",
            get(chat::get_conversation).delete(chat::delete_conversation),
        );

    let top_level = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .nest(API_V1_PREFIX, v1_routes)
        .merge(top_level)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(cors_layer(allowed_origins))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::root,
        health::health,
        health::liveness,
        health::readiness,
        auth::register,
        auth::login,
        auth::me,
        tasks::dashboard_stats,
        tasks::list_tasks,
        tasks::create_task,
        tasks::get_task,
        tasks::update_task,
        tasks::delete_task,
        chat::chat,
        chat::list_conversations,
        chat::get_conversation,
        chat::delete_conversation
    ),
    components(
        schemas(
            UserCreate,
            UserLogin,
            UserRead,
            TokenResponse,
            Task,
            TaskCreate,
            TaskUpdate,
            TaskStatus,
            TaskPriority,
            DashboardStats,
            DeleteTaskResponse,
            ChatRequest,
            ChatResponse,
            ChatRole,
            ConversationSummary,
            ConversationMessage,
            ConversationDetail,
            MessageResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Registration, login, and the current user"),
        (name = "Tasks", description = "Task management and dashboard statistics"),
        (name = "Chat", description = "Task assistant conversations")
    )
)]
pub struct ApiDoc;
