// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory store.
//!
//! Keeps every entity in process memory behind a single `RwLock`. Vectors
//! preserve insertion order and sorts are stable, matching the `seq`
//! tiebreak of the Postgres queries.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{stored_timestamp, ChatMessage, Conversation, NewUser, Task, TaskStatus, User};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    tasks: Vec<Task>,
    conversations: Vec<Conversation>,
    messages: Vec<ChatMessage>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::AlreadyExists(format!("User {}", user.email)));
        }

        let now = stored_timestamp(Utc::now());
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            full_name: user.full_name,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.tasks.iter().any(|t| t.id == task.id) {
            return Err(StoreError::AlreadyExists(format!("Task {}", task.id)));
        }
        inner.tasks.push(task.clone());
        Ok(())
    }

    async fn task_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let inner = self.inner.read().await;
        Ok(inner.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn tasks_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }

    async fn update_task(&self, task: &Task) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => {
                *existing = task.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("Task {}", task.id))),
        }
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.id != id);
        Ok(inner.tasks.len() != before)
    }

    async fn delete_tasks_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.tasks.len();
        inner.tasks.retain(|t| t.user_id != user_id);
        Ok((before - inner.tasks.len()) as u64)
    }

    async fn set_status_for_user(
        &self,
        user_id: Uuid,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let mut changed = 0;
        for task in inner.tasks.iter_mut().filter(|t| t.user_id == user_id) {
            task.status = status;
            task.updated_at = stored_timestamp(now);
            changed += 1;
        }
        Ok(changed)
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        self.inner
            .write()
            .await
            .conversations
            .push(conversation.clone());
        Ok(())
    }

    async fn conversation_by_id(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        let inner = self.inner.read().await;
        Ok(inner.conversations.iter().find(|c| c.id == id).cloned())
    }

    async fn conversations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Conversation>> {
        let inner = self.inner.read().await;
        let mut conversations: Vec<Conversation> = inner
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn touch_conversation(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        match inner.conversations.iter_mut().find(|c| c.id == id) {
            Some(conversation) => {
                conversation.updated_at = stored_timestamp(now);
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("Conversation {id}"))),
        }
    }

    async fn delete_conversation(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        inner.messages.retain(|m| m.conversation_id != id);
        let before = inner.conversations.len();
        inner.conversations.retain(|c| c.id != id);
        Ok(inner.conversations.len() != before)
    }

    async fn append_message(&self, message: &ChatMessage) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner
            .conversations
            .iter()
            .any(|c| c.id == message.conversation_id)
        {
            return Err(StoreError::NotFound(format!(
                "Conversation {}",
                message.conversation_id
            )));
        }
        inner.messages.push(message.clone());
        Ok(())
    }

    async fn messages_for_conversation(
        &self,
        conversation_id: Uuid,
    ) -> StoreResult<Vec<ChatMessage>> {
        let inner = self.inner.read().await;
        let mut messages: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    async fn recent_messages(
        &self,
        conversation_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<ChatMessage>> {
        let mut messages = self.messages_for_conversation(conversation_id).await?;
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.split_off(skip))
    }
}
