// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Password accounts with HS256 bearer tokens.
//!
//! ## Auth Flow
//!
//! 1. Client registers, then logs in with email and password
//! 2. Server verifies the bcrypt hash and issues a token whose `sub` is
//!    the account email
//! 3. Client sends `Authorization: Bearer <token>`
//! 4. The [`Auth`] extractor verifies signature and expiry, then loads
//!    the account by email
//!
//! ## Security
//!
//! - Tokens are signed with `SECRET_KEY`
//! - Expiry is `ACCESS_TOKEN_EXPIRE_MINUTES` after issue
//! - Clock skew tolerance is 60 seconds
//! - Every 401 carries `WWW-Authenticate: Bearer`

pub mod claims;
pub mod error;
pub mod extractor;
pub mod password;
pub mod token;

pub use claims::{AuthenticatedUser, Claims};
pub use error::AuthError;
pub use extractor::Auth;
pub use password::{hash_password, verify_password};
pub use token::TokenService;
