// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    auth::{hash_password, verify_password, Auth, AuthError},
    error::{ApiError, ApiJson},
    models::{NewUser, TokenResponse, UserCreate, UserLogin, UserRead},
    state::AppState,
    storage::StoreError,
    validators::is_email,
};

/// bcrypt is CPU-bound; keep it off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, AuthError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = UserCreate,
    tag = "Auth",
    responses(
        (status = 201, body = UserRead),
        (status = 400, description = "Invalid or duplicate registration")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UserCreate>,
) -> Result<(StatusCode, Json<UserRead>), ApiError> {
    let email = request.email.trim().to_string();
    if !is_email(&email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if request.password.is_empty() {
        return Err(ApiError::bad_request("Password cannot be empty"));
    }
    if state.store.user_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("Email already registered"));
    }
    if is_email(&request.full_name) {
        return Err(ApiError::bad_request("Full name cannot be an email address"));
    }

    let password = request.password;
    let password_hash = blocking(move || hash_password(&password))
        .await
        .and_then(|hashed| hashed)
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            ApiError::internal("Internal server error")
        })?;

    let user = state
        .store
        .create_user(NewUser {
            email,
            full_name: request.full_name.trim().to_string(),
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::AlreadyExists(_) => ApiError::bad_request("Email already registered"),
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(UserRead::from(&user))))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = UserLogin,
    tag = "Auth",
    responses(
        (status = 200, body = TokenResponse),
        (status = 401, description = "Incorrect email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<UserLogin>,
) -> Result<Json<TokenResponse>, AuthError> {
    let user = state
        .store
        .user_by_email(request.email.trim())
        .await
        .map_err(|e| AuthError::InternalError(e.to_string()))?
        .ok_or(AuthError::InvalidCredentials)?;

    let password = request.password;
    let hash = user.password_hash.clone();
    if !blocking(move || verify_password(&password, &hash)).await? {
        return Err(AuthError::InvalidCredentials);
    }

    let token = state.tokens.issue(&user.email)?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(TokenResponse::bearer(token)))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UserRead),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(Auth(user): Auth) -> Json<UserRead> {
    Json(UserRead::from(&user.user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    fn signup(email: &str, full_name: &str, password: &str) -> UserCreate {
        UserCreate {
            email: email.into(),
            full_name: full_name.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_issues_verifiable_token() {
        let state = AppState::in_memory();

        let (status, Json(user)) = register(
            State(state.clone()),
            ApiJson(signup("ada@example.com", "Ada Lovelace", "engines")),
        )
        .await
        .expect("registration succeeds");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user.full_name, "Ada Lovelace");

        let Json(token) = login(
            State(state.clone()),
            ApiJson(UserLogin {
                email: "ada@example.com".into(),
                password: "engines".into(),
            }),
        )
        .await
        .expect("login succeeds");
        assert_eq!(token.token_type, "bearer");

        let claims = state.tokens.verify(&token.access_token).unwrap();
        assert_eq!(claims.sub, "ada@example.com");
    }

    #[tokio::test]
    async fn register_rejects_bad_input() {
        let state = AppState::in_memory();

        let err = register(State(state.clone()), ApiJson(signup("not-an-email", "Ada", "pw")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Invalid email address");

        let err = register(State(state.clone()), ApiJson(signup("a@example.com", "Ada", "")))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Password cannot be empty");

        let err = register(
            State(state.clone()),
            ApiJson(signup("a@example.com", "a@example.com", "pw")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.message, "Full name cannot be an email address");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let state = AppState::in_memory();
        register(State(state.clone()), ApiJson(signup("dup@example.com", "One", "pw")))
            .await
            .unwrap();

        let err = register(State(state.clone()), ApiJson(signup("dup@example.com", "Two", "pw")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Email already registered");
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let state = AppState::in_memory();
        register(State(state.clone()), ApiJson(signup("ada@example.com", "Ada", "right")))
            .await
            .unwrap();

        for (email, password) in [("ada@example.com", "wrong"), ("nobody@example.com", "right")] {
            let err = login(
                State(state.clone()),
                ApiJson(UserLogin {
                    email: email.into(),
                    password: password.into(),
                }),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }
    }
}
