// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Post repository.
//!
//! Posts are keyed by a monotonic id, so reverse key order is newest first.
//! New posts are inserted through [`PostRepository::insert`] inside the same
//! write transaction that debits the creation fee.

use chrono::{DateTime, Utc};
use redb::{ReadableTable, WriteTransaction};
use serde::{Deserialize, Serialize};

use crate::storage::db::{decode, encode, next_id, Database, POSTS};
use crate::storage::{OwnedResource, StoreError, StoreResult};

/// Persisted post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPost {
    pub id: u64,
    pub title: String,
    pub description: String,
    /// 1..=5
    pub rating: u8,
    pub author_id: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OwnedResource for StoredPost {
    fn owner_user_id(&self) -> u64 {
        self.author_id
    }
}

/// Fields of a post about to be created.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub rating: u8,
    pub author_id: u64,
}

pub struct PostRepository<'a> {
    db: &'a Database,
}

impl<'a> PostRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Insert a post inside an open write transaction.
    pub fn insert(txn: &WriteTransaction, new_post: NewPost) -> StoreResult<StoredPost> {
        let now = Utc::now();
        let post = StoredPost {
            id: next_id(txn, "posts")?,
            title: new_post.title,
            description: new_post.description,
            rating: new_post.rating,
            author_id: new_post.author_id,
            created_at: now,
            updated_at: now,
        };
        put(txn, &post)?;
        Ok(post)
    }

    /// All posts, newest first.
    pub fn list(&self) -> StoreResult<Vec<StoredPost>> {
        self.db.read(|txn| {
            let posts = txn.open_table(POSTS)?;
            let mut results = Vec::new();
            for entry in posts.iter()?.rev() {
                let (_, value) = entry?;
                results.push(decode(value.value())?);
            }
            Ok(results)
        })
    }

    /// Get a post by id.
    pub fn get(&self, post_id: u64) -> StoreResult<StoredPost> {
        self.db.read(|txn| {
            let posts = txn.open_table(POSTS)?;
            match posts.get(post_id)? {
                Some(value) => decode(value.value()),
                None => Err(StoreError::NotFound(format!("Post {post_id}"))),
            }
        })
    }

    /// Persist an edited post, bumping `updated_at`.
    pub fn update(&self, post: &mut StoredPost) -> StoreResult<()> {
        post.updated_at = Utc::now();
        self.db.write(|txn| {
            {
                let posts = txn.open_table(POSTS)?;
                if posts.get(post.id)?.is_none() {
                    return Err(StoreError::NotFound(format!("Post {}", post.id)));
                }
            }
            put(txn, post)
        })
    }

    /// Delete a post.
    pub fn delete(&self, post_id: u64) -> StoreResult<()> {
        self.db.write(|txn| {
            let mut posts = txn.open_table(POSTS)?;
            let removed = posts.remove(post_id)?.is_some();
            if removed {
                Ok(())
            } else {
                Err(StoreError::NotFound(format!("Post {post_id}")))
            }
        })
    }
}

fn put(txn: &WriteTransaction, post: &StoredPost) -> StoreResult<()> {
    let bytes = encode(post)?;
    let mut posts = txn.open_table(POSTS)?;
    posts.insert(post.id, bytes.as_slice())?;
    Ok(())
}
