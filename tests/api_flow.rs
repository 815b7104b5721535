// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! End-to-end flows through the HTTP router over the in-memory store.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::Algorithm;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

use todo_manager_server::{
    api::router,
    auth::TokenService,
    config::{
        AuthSettings, Config, ConfigError, ACCESS_TOKEN_EXPIRE_MINUTES_ENV, DATABASE_URL_ENV,
        SECRET_KEY_ENV,
    },
    state::AppState,
    storage::InMemoryStore,
};

struct Client {
    app: Router,
}

impl Client {
    fn new() -> Self {
        Self::with_state(AppState::in_memory())
    }

    fn with_state(state: AppState) -> Self {
        Self {
            app: router(state, &["http://localhost:3000".to_string()]),
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        match body {
            Some(body) => {
                self.send_raw(method, uri, token, Some("application/json"), &body.to_string())
                    .await
            }
            None => self.send_raw(method, uri, token, None, "").await,
        }
    }

    /// Sends `body` verbatim. Every response body must be JSON.
    async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        content_type: Option<&str>,
        body: &str,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|e| panic!("{status} body is not JSON ({e}): {bytes:?}"))
        };
        (status, value)
    }

    /// Registers and logs in, returning `(token, user_id)`.
    async fn sign_up(&self, email: &str) -> (String, String) {
        let (status, _) = self
            .send(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({"email": email, "full_name": "Flow User", "password": "secret"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({"email": email, "password": "secret"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        let token = body["access_token"].as_str().unwrap().to_string();

        let (status, me) = self.send(Method::GET, "/api/v1/auth/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], email);
        (token, me["id"].as_str().unwrap().to_string())
    }
}

#[tokio::test]
async fn task_lifecycle_and_stats() {
    let client = Client::new();
    let (token, _) = client.sign_up("tasks@example.com").await;

    let (status, created) = client
        .send(
            Method::POST,
            "/api/v1/tasks/",
            Some(&token),
            Some(json!({"title": "Write report", "priority": "high"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let task_id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = client
        .send(
            Method::PUT,
            &format!("/api/v1/tasks/{task_id}"),
            Some(&token),
            Some(json!({"status": "completed"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "completed");
    assert_eq!(updated["title"], "Write report");

    let (status, stats) = client
        .send(Method::GET, "/api/v1/tasks/stats", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_tasks"], 1);
    assert_eq!(stats["completed_tasks"], 1);

    let (status, deleted) = client
        .send(Method::DELETE, &format!("/api/v1/tasks/{task_id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["ok"], true);

    let (status, body) = client
        .send(Method::GET, &format!("/api/v1/tasks/{task_id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Task not found");
}

#[tokio::test]
async fn tasks_are_private_to_their_owner() {
    let client = Client::new();
    let (alice, _) = client.sign_up("alice@example.com").await;
    let (bob, _) = client.sign_up("bob@example.com").await;

    let (_, created) = client
        .send(
            Method::POST,
            "/api/v1/tasks",
            Some(&alice),
            Some(json!({"title": "Alice only"})),
        )
        .await;
    let task_id = created["id"].as_str().unwrap();

    let (status, body) = client
        .send(Method::GET, &format!("/api/v1/tasks/{task_id}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["detail"], "Not authorized");

    let (_, listed) = client.send(Method::GET, "/api/v1/tasks", Some(&bob), None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let client = Client::new();
    client.sign_up("twice@example.com").await;

    let (status, body) = client
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "twice@example.com", "full_name": "Again", "password": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Email already registered");
}

#[tokio::test]
async fn chat_without_assistant_still_records_conversation() {
    let client = Client::new();
    let (token, user_id) = client.sign_up("chat@example.com").await;

    let (status, reply) = client
        .send(
            Method::POST,
            "/api/v1/chat",
            Some(&token),
            Some(json!({"message": "Add a task to buy milk", "user_id": user_id})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        reply["response"],
        "I encountered an error processing your request: Chat assistant is not configured"
    );
    assert_eq!(reply["tool_calls_executed"], false);
    assert_eq!(reply["original_request"]["message"], "Add a task to buy milk");
    let conversation_id = reply["conversation_id"].as_str().unwrap().to_string();

    let (_, conversations) = client
        .send(Method::GET, "/api/v1/conversations", Some(&token), None)
        .await;
    assert_eq!(conversations[0]["id"], conversation_id.as_str());
    assert_eq!(conversations[0]["title"], "Add a task to buy milk");

    let detail_uri = format!("/api/v1/conversations/{conversation_id}");
    let (status, detail) = client.send(Method::GET, &detail_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let messages = detail["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");

    let (status, deleted) = client
        .send(Method::DELETE, &detail_uri, Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "Deleted");

    let (status, _) = client.send(Method::GET, &detail_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_rejects_another_users_id() {
    let client = Client::new();
    let (token, _) = client.sign_up("caller@example.com").await;
    let (_, other_id) = client.sign_up("other@example.com").await;

    let (status, _) = client
        .send(
            Method::POST,
            "/api/v1/chat",
            Some(&token),
            Some(json!({"message": "hi", "user_id": other_id})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_bodies_get_detail_errors() {
    let client = Client::new();
    let (token, _) = client.sign_up("bodies@example.com").await;

    let (status, body) = client
        .send_raw(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some("application/json"),
            "{not json",
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    let (status, body) = client
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "partial@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("missing field"));

    let (status, body) = client
        .send_raw(Method::POST, "/api/v1/tasks", Some(&token), None, r#"{"title":"x"}"#)
        .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(body["detail"].is_string());

    let (status, body) = client
        .send(
            Method::POST,
            "/api/v1/tasks",
            Some(&token),
            Some(json!({"title": "x", "priority": "urgent"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());

    let (status, body) = client
        .send_raw(
            Method::POST,
            "/api/v1/chat",
            Some(&token),
            Some("application/json"),
            "[]",
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn task_update_null_clears_and_absent_keeps() {
    let client = Client::new();
    let (token, _) = client.sign_up("nulls@example.com").await;

    let (_, created) = client
        .send(
            Method::POST,
            "/api/v1/tasks",
            Some(&token),
            Some(json!({
                "title": "Pack",
                "description": "passport",
                "tags": "travel",
                "due_date": "2026-06-01T09:00:00Z"
            })),
        )
        .await;
    let uri = format!("/api/v1/tasks/{}", created["id"].as_str().unwrap());

    let (status, updated) = client
        .send(Method::PUT, &uri, Some(&token), Some(json!({"tags": null})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["tags"], Value::Null);
    assert_eq!(updated["description"], "passport");
    assert_eq!(updated["due_date"], created["due_date"]);

    let (_, updated) = client
        .send(
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({"due_date": null, "description": null})),
        )
        .await;
    assert_eq!(updated["due_date"], Value::Null);
    assert_eq!(updated["description"], Value::Null);
    assert_eq!(updated["title"], "Pack");

    let (_, fetched) = client.send(Method::GET, &uri, Some(&token), None).await;
    assert_eq!(fetched, updated);
}

#[test]
fn oversized_token_lifetime_is_rejected_at_startup() {
    let env: HashMap<&str, &str> = HashMap::from([
        (DATABASE_URL_ENV, "postgresql://app:pw@localhost:5432/todos"),
        (SECRET_KEY_ENV, "a-very-long-secret-key-for-tests-0001"),
        (ACCESS_TOKEN_EXPIRE_MINUTES_ENV, "9223372036854775807"),
    ]);
    let result = Config::from_lookup(|key| env.get(key).map(|v| v.to_string()));
    assert!(matches!(
        result,
        Err(ConfigError::Invalid { key, .. }) if key == ACCESS_TOKEN_EXPIRE_MINUTES_ENV
    ));
}

#[tokio::test]
async fn login_with_unrepresentable_expiry_fails_cleanly() {
    let tokens = TokenService::new(&AuthSettings {
        secret_key: "a-very-long-secret-key-for-tests-0001".to_string(),
        algorithm: Algorithm::HS256,
        access_token_expire_minutes: 1_000_000_000_000,
    });
    let client = Client::with_state(AppState::new(Arc::new(InMemoryStore::new()), tokens));

    let (status, _) = client
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"email": "far@example.com", "full_name": "Far", "password": "pw"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = client
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "far@example.com", "password": "pw"})),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error_code"], "internal_error");
}
