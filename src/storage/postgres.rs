// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! PostgreSQL store.
//!
//! Enum columns are stored as lowercase `TEXT` and decoded through the
//! row structs below. A value that no longer parses surfaces as
//! [`StoreError::Corrupt`] instead of a panic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{ChatMessage, Conversation, NewUser, Task, TaskStatus, User};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        full_name TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT,
        status TEXT NOT NULL,
        priority TEXT NOT NULL,
        due_date TIMESTAMPTZ,
        tags TEXT,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        seq BIGSERIAL
    )
    "#,
    "ALTER TABLE tasks ADD COLUMN IF NOT EXISTS seq BIGSERIAL",
    "CREATE INDEX IF NOT EXISTS idx_tasks_user_id ON tasks(user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS conversations (
        id UUID PRIMARY KEY,
        user_id UUID NOT NULL,
        title VARCHAR(200) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        seq BIGSERIAL
    )
    "#,
    "ALTER TABLE conversations ADD COLUMN IF NOT EXISTS seq BIGSERIAL",
    "CREATE INDEX IF NOT EXISTS idx_conversations_user_id ON conversations(user_id)",
    r#"
    CREATE TABLE IF NOT EXISTS chat_messages (
        id UUID PRIMARY KEY,
        conversation_id UUID NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
        role TEXT NOT NULL,
        content VARCHAR(10000) NOT NULL,
        timestamp TIMESTAMPTZ NOT NULL,
        tool_call_id TEXT,
        seq BIGSERIAL
    )
    "#,
    "ALTER TABLE chat_messages ADD COLUMN IF NOT EXISTS seq BIGSERIAL",
    "CREATE INDEX IF NOT EXISTS idx_chat_messages_conversation_id ON chat_messages(conversation_id)",
];

// `seq` follows insertion order and breaks timestamp ties.
const TASKS_FOR_USER: &str =
    "SELECT * FROM tasks WHERE user_id = $1 ORDER BY created_at ASC, seq ASC";

const CONVERSATIONS_FOR_USER: &str = r#"
    SELECT id, user_id, title, created_at, updated_at
    FROM conversations
    WHERE user_id = $1
    ORDER BY updated_at DESC, seq ASC
"#;

const MESSAGES_FOR_CONVERSATION: &str = r#"
    SELECT id, conversation_id, role, content, timestamp, tool_call_id
    FROM chat_messages
    WHERE conversation_id = $1
    ORDER BY timestamp ASC, seq ASC
"#;

const RECENT_MESSAGES: &str = r#"
    SELECT id, conversation_id, role, content, timestamp, tool_call_id
    FROM chat_messages
    WHERE conversation_id = $1
    ORDER BY timestamp DESC, seq DESC
    LIMIT $2
"#;

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<DateTime<Utc>>,
    tags: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            status: row
                .status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("task {}: {e}", row.id)))?,
            priority: row
                .priority
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("task {}: {e}", row.id)))?,
            due_date: row.due_date,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Conversation {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    role: String,
    content: String,
    timestamp: DateTime<Utc>,
    tool_call_id: Option<String>,
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = StoreError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            id: row.id,
            conversation_id: row.conversation_id,
            role: row
                .role
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("message {}: {e}", row.id)))?,
            content: row.content,
            timestamp: row.timestamp,
            tool_call_id: row.tool_call_id,
        })
    }
}

fn decode_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the tables and indexes if they do not exist yet.
    pub async fn init_tables(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!("Database tables ready");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let now = Utc::now();
        let result = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash, full_name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id, email, password_hash, full_name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => Ok(created),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::AlreadyExists(format!("User {}", user.email)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, full_name, created_at, updated_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, full_name, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_task(&self, task: &Task) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO tasks
                (id, user_id, title, description, status, priority, due_date, tags, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(&task.tags)
        .bind(task.created_at)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::AlreadyExists(format!("Task {}", task.id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn task_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Task::try_from).transpose()
    }

    async fn tasks_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(TASKS_FOR_USER)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn update_task(&self, task: &Task) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, status = $4, priority = $5,
                due_date = $6, tags = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(&task.tags)
        .bind(task.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Task {}", task.id)));
        }
        Ok(())
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_tasks_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM tasks WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn set_status_for_user(
        &self,
        user_id: Uuid,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query("UPDATE tasks SET status = $2, updated_at = $3 WHERE user_id = $1")
            .bind(user_id)
            .bind(status.as_str())
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, title, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(conversation.id)
        .bind(conversation.user_id)
        .bind(&conversation.title)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn conversation_by_id(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(
            "SELECT id, user_id, title, created_at, updated_at FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Conversation::from))
    }

    async fn conversations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Conversation>> {
        let rows = sqlx::query_as::<_, ConversationRow>(CONVERSATIONS_FOR_USER)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Conversation::from).collect())
    }

    async fn touch_conversation(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE conversations SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("Conversation {id}")));
        }
        Ok(())
    }

    async fn delete_conversation(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chat_messages WHERE conversation_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_message(&self, message: &ChatMessage) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO chat_messages (id, conversation_id, role, content, timestamp, tool_call_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(message.timestamp)
        .bind(&message.tool_call_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => Err(
                StoreError::NotFound(format!("Conversation {}", message.conversation_id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn messages_for_conversation(
        &self,
        conversation_id: Uuid,
    ) -> StoreResult<Vec<ChatMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(MESSAGES_FOR_CONVERSATION)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await?;
        decode_all(rows)
    }

    async fn recent_messages(
        &self,
        conversation_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<ChatMessage>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, MessageRow>(RECENT_MESSAGES)
            .bind(conversation_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut messages: Vec<ChatMessage> = decode_all(rows)?;
        messages.reverse();
        Ok(messages)
    }
}
