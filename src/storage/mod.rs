// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage for users, tasks, and chat history behind the
//! [`Store`] trait. Handlers hold an `Arc<dyn Store>` and never see which
//! backend is in use.
//!
//! ## Backends
//!
//! - [`PgStore`]: PostgreSQL via sqlx, used in every deployment
//! - [`InMemoryStore`]: process-local maps, used by tests
//!
//! ## Schema
//!
//! ```text
//! users          (id, email UNIQUE, password_hash, full_name, created_at, updated_at)
//! tasks          (id, user_id -> users, title, description, status, priority,
//!                 due_date, tags, created_at, updated_at)
//! conversations  (id, user_id, title, created_at, updated_at)
//! chat_messages  (id, conversation_id -> conversations, role, content,
//!                 timestamp, tool_call_id)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{ChatMessage, Conversation, NewUser, Task, TaskStatus, User};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity already exists (unique key taken)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A stored row could not be decoded into its model
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Readiness probe.
    async fn ping(&self) -> StoreResult<()>;

    /// Insert a user. Fails with `AlreadyExists` if the email is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn insert_task(&self, task: &Task) -> StoreResult<()>;
    async fn task_by_id(&self, id: Uuid) -> StoreResult<Option<Task>>;
    /// All tasks of a user, oldest first.
    async fn tasks_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Task>>;
    /// Overwrite a task. Fails with `NotFound` if it does not exist.
    async fn update_task(&self, task: &Task) -> StoreResult<()>;
    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;
    async fn delete_tasks_for_user(&self, user_id: Uuid) -> StoreResult<u64>;
    /// Set every task of a user to `status`, stamping `updated_at`.
    async fn set_status_for_user(
        &self,
        user_id: Uuid,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<u64>;

    async fn insert_conversation(&self, conversation: &Conversation) -> StoreResult<()>;
    async fn conversation_by_id(&self, id: Uuid) -> StoreResult<Option<Conversation>>;
    /// Conversations of a user, most recently updated first.
    async fn conversations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Conversation>>;
    async fn touch_conversation(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()>;
    /// Delete a conversation and all of its messages.
    async fn delete_conversation(&self, id: Uuid) -> StoreResult<bool>;

    async fn append_message(&self, message: &ChatMessage) -> StoreResult<()>;
    /// Messages of a conversation, oldest first.
    async fn messages_for_conversation(&self, conversation_id: Uuid)
        -> StoreResult<Vec<ChatMessage>>;
    /// The newest `limit` messages, returned oldest first.
    async fn recent_messages(
        &self,
        conversation_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<ChatMessage>>;
}
