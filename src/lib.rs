// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Todo Manager API - task management backend with a chat assistant
//!
//! Serves a JSON API under `/api/v1` backed by PostgreSQL, with HS256
//! bearer-token authentication and a tool-calling assistant that manages
//! tasks on the user's behalf.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `agent` - Chat assistant: prompt, tools, model client
//! - `auth` - Passwords, session tokens, request authentication
//! - `config` - Environment configuration
//! - `storage` - PostgreSQL and in-memory stores

pub mod agent;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod state;
pub mod storage;
pub mod validators;
