// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Postwallet - posts and accounts with a paid wallet ledger
//!
//! Users register and authenticate with JWTs, fund a per-user wallet through
//! Stripe payment intents, and pay a fixed fee for every post they create.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Passwords, access tokens and the request extractor
//! - `ledger` - Atomic wallet mutations and the fee debit hook
//! - `payments` - Payment intent bridge between provider and ledger
//! - `providers` - Payment provider trait and the Stripe client
//! - `storage` - Embedded redb database and repositories

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod models;
pub mod payments;
pub mod providers;
pub mod state;
pub mod storage;
pub mod token_sweeper;

#[cfg(test)]
mod test_support;
