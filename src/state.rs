// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use jsonwebtoken::Algorithm;

use crate::agent::ChatModel;
use crate::auth::TokenService;
use crate::config::{AuthSettings, DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES};
use crate::storage::{InMemoryStore, Store};

/// Signing key used by [`AppState::in_memory`].
const IN_MEMORY_SECRET_KEY: &str = "in-memory-state-signing-key-0123456789";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenService>,
    /// `None` when no chat model API key is configured.
    pub chat_model: Option<Arc<dyn ChatModel>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenService) -> Self {
        Self {
            store,
            tokens: Arc::new(tokens),
            chat_model: None,
        }
    }

    /// State backed by [`InMemoryStore`] with a fixed signing key.
    pub fn in_memory() -> Self {
        let tokens = TokenService::new(&AuthSettings {
            secret_key: IN_MEMORY_SECRET_KEY.to_string(),
            algorithm: Algorithm::HS256,
            access_token_expire_minutes: DEFAULT_ACCESS_TOKEN_EXPIRE_MINUTES,
        });
        Self::new(Arc::new(InMemoryStore::new()), tokens)
    }

    pub fn with_chat_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.chat_model = Some(model);
        self
    }
}
