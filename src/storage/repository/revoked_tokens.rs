// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Revoked access tokens (logout blacklist).
//!
//! Only the SHA-256 fingerprint of a token is stored, together with the
//! unix time after which the entry may be purged.

use redb::ReadableTable;

use crate::storage::db::{Database, REVOKED_TOKENS};
use crate::storage::StoreResult;

pub struct RevokedTokenRepository<'a> {
    db: &'a Database,
}

impl<'a> RevokedTokenRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Record a revoked token fingerprint until `expires_at` (unix seconds).
    pub fn revoke(&self, fingerprint: &str, expires_at: i64) -> StoreResult<()> {
        self.db.write(|txn| {
            let mut table = txn.open_table(REVOKED_TOKENS)?;
            table.insert(fingerprint, expires_at)?;
            Ok(())
        })
    }

    /// Whether the fingerprint is revoked at time `now`.
    pub fn is_revoked(&self, fingerprint: &str, now: i64) -> StoreResult<bool> {
        self.db.read(|txn| {
            let table = txn.open_table(REVOKED_TOKENS)?;
            Ok(table
                .get(fingerprint)?
                .is_some_and(|expires_at| expires_at.value() > now))
        })
    }

    /// Delete entries whose retention ended at or before `now`.
    ///
    /// Returns the number of purged entries.
    pub fn purge_expired(&self, now: i64) -> StoreResult<usize> {
        self.db.write(|txn| {
            let mut table = txn.open_table(REVOKED_TOKENS)?;
            let expired: Vec<String> = table
                .iter()?
                .filter_map(|entry| match entry {
                    Ok((key, value)) if value.value() <= now => Some(Ok(key.value().to_string())),
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                })
                .collect::<Result<_, _>>()?;
            for fingerprint in &expired {
                table.remove(fingerprint.as_str())?;
            }
            Ok(expired.len())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revoked_until_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("revoked.redb")).unwrap();
        let repo = RevokedTokenRepository::new(&db);

        repo.revoke("abc", 1_000).unwrap();
        assert!(repo.is_revoked("abc", 999).unwrap());
        assert!(!repo.is_revoked("abc", 1_000).unwrap());
        assert!(!repo.is_revoked("other", 0).unwrap());
    }

    #[test]
    fn purge_removes_only_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("revoked.redb")).unwrap();
        let repo = RevokedTokenRepository::new(&db);

        repo.revoke("old", 100).unwrap();
        repo.revoke("fresh", 10_000).unwrap();

        assert_eq!(repo.purge_expired(500).unwrap(), 1);
        assert!(repo.is_revoked("fresh", 500).unwrap());
        assert_eq!(repo.purge_expired(500).unwrap(), 0);
    }
}
