// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::auth::AuthError;
use crate::ledger::LedgerError;
use crate::payments::PaymentError;
use crate::storage::StoreError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    /// Extra top-level fields rendered next to `error`
    pub details: Map<String, Value>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(flatten)]
    details: Map<String, Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// 500 with a generic message; `detail` is logged, never returned.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "Internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        if let AuthError::InternalError(detail) = &e {
            tracing::error!(error = %detail, "Authentication internal error");
        }
        ApiError::new(e.status_code(), e.to_string()).with_detail("error_code", e.error_code())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            other => ApiError::internal(other),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidAmount(message) => ApiError::bad_request(message),
            LedgerError::InsufficientFunds { required, balance } => {
                ApiError::new(StatusCode::PAYMENT_REQUIRED, "Insufficient funds")
                    .with_detail("required", required.to_string())
                    .with_detail("balance", balance.to_string())
            }
            LedgerError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            LedgerError::Store(e) => ApiError::internal(e),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::InvalidAmount(message) | PaymentError::Provider(message) => {
                ApiError::bad_request(message)
            }
            PaymentError::InvalidSignature => ApiError::bad_request("Invalid signature"),
            PaymentError::InvalidPayload(_) => ApiError::bad_request("Invalid payload"),
            PaymentError::Ledger(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rust_decimal_macros::dec;

    async fn body_of(error: ApiError) -> (StatusCode, String) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        let forbidden = ApiError::forbidden("nope");
        assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let (status, body) = body_of(ApiError::bad_request("bad data")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[tokio::test]
    async fn insufficient_funds_renders_shortfall() {
        let error: ApiError = LedgerError::InsufficientFunds {
            required: dec!(5.00),
            balance: dec!(3.00),
        }
        .into();
        let (status, body) = body_of(error).await;

        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "Insufficient funds");
        assert_eq!(json["required"], "5.00");
        assert_eq!(json["balance"], "3.00");
    }

    #[tokio::test]
    async fn storage_failures_hide_detail() {
        let error: ApiError = LedgerError::Store(StoreError::AlreadyExists("secret".into())).into();
        let (status, body) = body_of(error).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"Internal server error"}"#);
    }

    #[tokio::test]
    async fn auth_errors_keep_error_code() {
        let (status, body) = body_of(AuthError::InvalidCredentials.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "Invalid credentials");
        assert_eq!(json["error_code"], "invalid_credentials");
    }

    #[test]
    fn payment_errors_map_to_bad_request() {
        let cases = [
            (PaymentError::Provider("Card declined".into()), "Card declined"),
            (PaymentError::InvalidSignature, "Invalid signature"),
            (PaymentError::InvalidPayload("eof".into()), "Invalid payload"),
            (
                PaymentError::InvalidAmount("Minimum deposit is $1.00".into()),
                "Minimum deposit is $1.00",
            ),
        ];
        for (error, message) in cases {
            let api: ApiError = error.into();
            assert_eq!(api.status, StatusCode::BAD_REQUEST);
            assert_eq!(api.message, message);
        }
    }
}
