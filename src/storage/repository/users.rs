// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User accounts.
//!
//! Emails are unique after normalization (NFKC, trimmed, lower-cased); the
//! `user_emails` index enforces that inside the same write transaction that
//! inserts the user.

use chrono::{DateTime, NaiveDate, Utc};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::auth::UserType;
use crate::storage::db::{decode, encode, next_id, Database, USERS, USER_EMAILS};
use crate::storage::{StoreError, StoreResult};

/// Persisted user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: u64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub user_type: UserType,
    /// PHC-like encoded PBKDF2 hash, never returned by the API
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub user_type: UserType,
    pub password_hash: String,
}

/// Canonical form used for uniqueness and lookups.
pub fn normalize_email(email: &str) -> String {
    email.nfkc().collect::<String>().trim().to_lowercase()
}

/// Repository for user accounts.
pub struct UserRepository<'a> {
    db: &'a Database,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a user.
    ///
    /// # Returns
    /// - `Err(StoreError::AlreadyExists)` if the normalized email is taken
    pub fn create(&self, new_user: NewUser) -> StoreResult<StoredUser> {
        let email = normalize_email(&new_user.email);
        self.db.write(|txn| {
            let mut emails = txn.open_table(USER_EMAILS)?;
            if emails.get(email.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("User {email}")));
            }

            let user = StoredUser {
                id: next_id(txn, "users")?,
                email: email.clone(),
                first_name: new_user.first_name,
                last_name: new_user.last_name,
                dob: new_user.dob,
                user_type: new_user.user_type,
                password_hash: new_user.password_hash,
                created_at: Utc::now(),
            };

            emails.insert(email.as_str(), user.id)?;
            insert_user(txn, &user)?;
            Ok(user)
        })
    }

    /// Check whether an email is already registered.
    pub fn email_exists(&self, email: &str) -> StoreResult<bool> {
        let email = normalize_email(email);
        self.db.read(|txn| {
            let emails = txn.open_table(USER_EMAILS)?;
            Ok(emails.get(email.as_str())?.is_some())
        })
    }

    /// Get a user by id.
    pub fn get(&self, user_id: u64) -> StoreResult<StoredUser> {
        self.find(user_id)?
            .ok_or_else(|| StoreError::NotFound(format!("User {user_id}")))
    }

    /// Get a user by id, `None` if absent.
    pub fn find(&self, user_id: u64) -> StoreResult<Option<StoredUser>> {
        self.db.read(|txn| {
            let users = txn.open_table(USERS)?;
            match users.get(user_id)? {
                Some(value) => Ok(Some(decode(value.value())?)),
                None => Ok(None),
            }
        })
    }

    /// Look up a user by email (normalized before lookup).
    pub fn find_by_email(&self, email: &str) -> StoreResult<Option<StoredUser>> {
        let email = normalize_email(email);
        let user_id = self.db.read(|txn| {
            let emails = txn.open_table(USER_EMAILS)?;
            Ok(emails.get(email.as_str())?.map(|v| v.value()))
        })?;
        match user_id {
            Some(id) => self.find(id),
            None => Ok(None),
        }
    }
}

fn insert_user(txn: &WriteTransaction, user: &StoredUser) -> StoreResult<()> {
    let bytes = encode(user)?;
    let mut users = txn.open_table(USERS)?;
    users.insert(user.id, bytes.as_slice())?;
    Ok(())
}
