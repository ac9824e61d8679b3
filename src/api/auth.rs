// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints: registration, login and logout.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{NaiveDate, Utc};
use tracing::info;

use super::JsonBody;
use crate::{
    auth::{hash_password, token_fingerprint, verify_password, AuthError, SignedToken, UserType},
    error::ApiError,
    models::{AuthResponse, LoginRequest, MessageResponse, RegisterRequest},
    state::AppState,
    storage::{normalize_email, NewUser, RevokedTokenRepository, StoreError, UserRepository},
};

const DOB_FORMAT: &str = "%Y-%m-%d";

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("{field} is required")))
}

/// Register a new account and return an access token.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Missing or invalid field, or email taken"),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let first_name = required(request.first_name, "first_name")?;
    let last_name = required(request.last_name, "last_name")?;
    let email = required(request.email, "email")?;
    let password = required(request.password, "password")?;
    let dob = required(request.dob, "dob")?;
    let user_type = required(request.user_type, "user_type")?;

    let user_type = UserType::parse(&user_type)
        .ok_or_else(|| ApiError::bad_request(r#"user_type must be "viewer" or "editor""#))?;

    let email = normalize_email(&email);
    let users = UserRepository::new(&state.db);
    if users.email_exists(&email)? {
        return Err(ApiError::bad_request("Email already registered"));
    }

    let dob = NaiveDate::parse_from_str(dob.trim(), DOB_FORMAT)
        .map_err(|_| ApiError::bad_request("dob must be in YYYY-MM-DD format"))?;

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::internal)?;

    let user = users
        .create(NewUser {
            email,
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            dob,
            user_type,
            password_hash,
        })
        .map_err(|e| match e {
            StoreError::AlreadyExists(_) => ApiError::bad_request("Email already registered"),
            other => other.into(),
        })?;

    let token = state.tokens.issue(&user)?;
    info!(user_id = user.id, user_type = %user.user_type, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            token,
            user: user.into(),
        }),
    ))
}

/// Exchange email and password for an access token.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (Some(email), Some(password)) = (
        request.email.filter(|v| !v.trim().is_empty()),
        request.password.filter(|v| !v.is_empty()),
    ) else {
        return Err(ApiError::bad_request("email and password are required"));
    };

    let Some(user) = UserRepository::new(&state.db).find_by_email(&email)? else {
        info!("Login rejected: unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };

    let encoded = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &encoded))
        .await
        .map_err(ApiError::internal)?;
    if !valid {
        info!(user_id = user.id, "Login rejected: wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.tokens.issue(&user)?;
    info!(user_id = user.id, "User logged in");

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: user.into(),
    }))
}

/// Revoke the presented token.
///
/// Tokens signed by this server are accepted even after expiry.
#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "Auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Missing, invalid or already revoked token"),
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    signed: SignedToken,
) -> Result<Json<MessageResponse>, ApiError> {
    let expires_at = Utc::now().timestamp() + state.config.token_blacklist_ttl_secs;
    RevokedTokenRepository::new(&state.db)
        .revoke(&token_fingerprint(&signed.token), expires_at)?;

    info!(user_id = signed.claims.user_id, "User logged out");
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

#[cfg(test)]
mod tests {
    use axum::http::Method;
    use serde_json::{json, Value};

    use crate::test_support::{create_user, send_json, test_state, TEST_PASSWORD};

    fn registration() -> Value {
        json!({
            "first_name": "Grace",
            "last_name": "Hopper",
            "email": "Grace@Example.com",
            "password": "s3cret-pass",
            "dob": "1906-12-09",
            "user_type": "editor"
        })
    }

    #[tokio::test]
    async fn register_returns_token_and_user() {
        let (state, _dir) = test_state();
        let (status, body) = send_json(
            &state,
            Method::POST,
            "/v1/auth/register",
            None,
            Some(registration()),
        )
        .await;

        assert_eq!(status, 201);
        assert_eq!(body["message"], "User registered successfully");
        assert_eq!(body["user"]["email"], "grace@example.com");
        assert_eq!(body["user"]["user_type"], "editor");
        assert!(body["user"].get("password_hash").is_none());

        let token = body["token"].as_str().unwrap();
        let (status, me) = send_json(&state, Method::GET, "/v1/users/me", Some(token), None).await;
        assert_eq!(status, 200);
        assert_eq!(me["first_name"], "Grace");
    }

    #[tokio::test]
    async fn register_names_the_first_missing_field() {
        let (state, _dir) = test_state();
        let mut request = registration();
        request.as_object_mut().unwrap().remove("email");
        request["first_name"] = json!("   ");

        let (status, body) =
            send_json(&state, Method::POST, "/v1/auth/register", None, Some(request)).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "first_name is required");
    }

    #[tokio::test]
    async fn register_rejects_bad_user_type_and_date() {
        let (state, _dir) = test_state();

        let mut request = registration();
        request["user_type"] = json!("admin");
        let (status, body) =
            send_json(&state, Method::POST, "/v1/auth/register", None, Some(request)).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], r#"user_type must be "viewer" or "editor""#);

        let mut request = registration();
        request["dob"] = json!("09/12/1906");
        let (status, body) =
            send_json(&state, Method::POST, "/v1/auth/register", None, Some(request)).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "dob must be in YYYY-MM-DD format");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email_case_insensitively() {
        let (state, _dir) = test_state();
        create_user(&state, "grace@example.com");

        let (status, body) = send_json(
            &state,
            Method::POST,
            "/v1/auth/register",
            None,
            Some(registration()),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "Email already registered");
    }

    #[tokio::test]
    async fn login_with_valid_credentials() {
        let (state, _dir) = test_state();
        let (user, _) = create_user(&state, "ada@example.com");

        let (status, body) = send_json(
            &state,
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({"email": " ADA@example.com ", "password": TEST_PASSWORD})),
        )
        .await;

        assert_eq!(status, 200);
        assert_eq!(body["message"], "Login successful");
        assert_eq!(body["user"]["id"], user.id);
        assert!(body["token"].as_str().is_some());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (state, _dir) = test_state();
        create_user(&state, "ada@example.com");

        for (email, password) in [
            ("ada@example.com", "wrong password"),
            ("nobody@example.com", TEST_PASSWORD),
        ] {
            let (status, body) = send_json(
                &state,
                Method::POST,
                "/v1/auth/login",
                None,
                Some(json!({"email": email, "password": password})),
            )
            .await;
            assert_eq!(status, 401);
            assert_eq!(body["error"], "Invalid credentials");
        }
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let (state, _dir) = test_state();
        let (status, body) = send_json(
            &state,
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({"email": "ada@example.com"})),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "email and password are required");
    }

    #[tokio::test]
    async fn logout_revokes_the_token() {
        let (state, _dir) = test_state();
        let (_, token) = create_user(&state, "ada@example.com");

        let (status, body) =
            send_json(&state, Method::POST, "/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, 200);
        assert_eq!(body["message"], "Logged out successfully");

        let (status, body) =
            send_json(&state, Method::GET, "/v1/users/me", Some(&token), None).await;
        assert_eq!(status, 401);
        assert_eq!(body["error"], "Token has been revoked");

        let (status, _) =
            send_json(&state, Method::POST, "/v1/auth/logout", Some(&token), None).await;
        assert_eq!(status, 401);
    }

    #[tokio::test]
    async fn logout_requires_a_token() {
        let (state, _dir) = test_state();
        let (status, body) = send_json(&state, Method::POST, "/v1/auth/logout", None, None).await;
        assert_eq!(status, 401);
        assert_eq!(body["error"], "Authorization header required");
    }
}
