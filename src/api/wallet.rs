// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet endpoints: balance, history, funding and provider confirmations.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use super::JsonBody;
use crate::{
    auth::Auth,
    error::ApiError,
    ledger::money,
    models::{
        BalanceResponse, FundWalletRequest, FundWalletResponse, TransactionEntry,
        TransactionListQuery, TransactionListResponse, WebhookAckResponse,
    },
    payments::{ConfirmationOutcome, PaymentBridge},
    state::AppState,
};

const DEFAULT_TRANSACTION_LIMIT: usize = 50;
const MAX_TRANSACTION_LIMIT: usize = 100;
const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

fn payments(state: &AppState) -> Result<&PaymentBridge, ApiError> {
    state
        .payments
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Payments are not configured"))
}

/// Amount as sent by clients: a decimal string or a JSON number, parsed
/// from its text so no binary float is involved.
fn requested_amount(value: Option<Value>) -> Result<Decimal, ApiError> {
    let text = match value {
        None | Some(Value::Null) => return Err(ApiError::bad_request("Amount is required")),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(ApiError::bad_request("Amount is required"))
        }
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(ApiError::bad_request("Amount must be a valid number")),
    };
    Ok(money::parse_amount(&text)?)
}

/// Current wallet balance.
#[utoipa::path(
    get,
    path = "/v1/wallet/balance",
    tag = "Wallet",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Wallet balance", body = BalanceResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn get_balance(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let wallet = state.ledger.wallet_for_user(user.user_id)?;
    Ok(Json(BalanceResponse {
        balance: wallet.balance.to_string(),
        currency: state.config.payment_currency.to_ascii_uppercase(),
    }))
}

/// Transaction history, newest first.
#[utoipa::path(
    get,
    path = "/v1/wallet/transactions",
    tag = "Wallet",
    security(("bearer" = [])),
    params(TransactionListQuery),
    responses(
        (status = 200, description = "Transactions", body = TransactionListResponse),
        (status = 401, description = "Unauthorized"),
    )
)]
pub async fn list_transactions(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRANSACTION_LIMIT)
        .clamp(1, MAX_TRANSACTION_LIMIT);

    let wallet = state.ledger.wallet_for_user(user.user_id)?;
    let transactions = state
        .ledger
        .transactions(wallet.id, limit)?
        .into_iter()
        .map(TransactionEntry::from)
        .collect();

    Ok(Json(TransactionListResponse { transactions }))
}

/// Create a payment intent to fund the wallet.
///
/// The wallet is credited only once the provider confirms the payment.
#[utoipa::path(
    post,
    path = "/v1/wallet/fund",
    tag = "Wallet",
    security(("bearer" = [])),
    request_body = FundWalletRequest,
    responses(
        (status = 200, description = "Payment intent created", body = FundWalletResponse),
        (status = 400, description = "Invalid amount or provider failure"),
        (status = 401, description = "Unauthorized"),
        (status = 503, description = "Payments are not configured"),
    )
)]
pub async fn fund_wallet(
    Auth(user): Auth,
    State(state): State<AppState>,
    JsonBody(request): JsonBody<FundWalletRequest>,
) -> Result<Json<FundWalletResponse>, ApiError> {
    let bridge = payments(&state)?;
    let amount = requested_amount(request.amount)?;

    let intent = bridge.create_intent(&user, amount).await?;

    Ok(Json(FundWalletResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
    }))
}

/// Stripe webhook receiver.
///
/// Authenticated by the `Stripe-Signature` header rather than a bearer
/// token. Replays and unknown users are acknowledged without credit.
#[utoipa::path(
    post,
    path = "/v1/wallet/webhook/stripe",
    tag = "Wallet",
    request_body(content = String, description = "Raw Stripe event", content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "Stripe webhook signature")),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAckResponse),
        (status = 400, description = "Invalid signature or payload"),
        (status = 503, description = "Payments are not configured"),
    )
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Bytes,
) -> Result<Json<WebhookAckResponse>, ApiError> {
    let bridge = payments(&state)?;
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match bridge.handle_confirmation(&payload, signature)? {
        ConfirmationOutcome::Credited {
            user_id,
            intent_id,
            amount,
            balance,
        } => info!(user_id, intent_id = %intent_id, %amount, %balance, "Wallet funded"),
        ConfirmationOutcome::AlreadyProcessed { intent_id } => {
            info!(intent_id = %intent_id, "Duplicate payment confirmation ignored")
        }
        ConfirmationOutcome::UnknownUser { intent_id } => {
            info!(intent_id = %intent_id, "Payment confirmation without a known user")
        }
        ConfirmationOutcome::Ignored { .. } => {}
    }

    Ok(Json(WebhookAckResponse {
        status: "success".to_string(),
    }))
}
