// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Revoked Token Sweeper
//!
//! Background task that periodically deletes revoked-token entries whose
//! retention has elapsed. Lookups already ignore expired entries, so the
//! sweep only bounds the size of the table.
//!
//! ## Shutdown
//!
//! Uses `tokio_util::sync::CancellationToken`; the HTTP server shares the
//! same token for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::storage::{Database, RevokedTokenRepository};

/// Default interval between sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

pub struct RevokedTokenSweeper {
    db: Arc<Database>,
    sweep_interval: Duration,
}

impl RevokedTokenSweeper {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Run the sweep loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(sweeper.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.sweep_interval.as_secs(),
            "Revoked token sweeper starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Revoked token sweeper shutting down");
                return;
            }

            self.sweep_step();

            tokio::select! {
                _ = tokio::time::sleep(self.sweep_interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Revoked token sweeper shutting down");
                    return;
                }
            }
        }
    }

    /// One sweep. Returns the number of purged entries.
    fn sweep_step(&self) -> usize {
        match RevokedTokenRepository::new(&self.db).purge_expired(Utc::now().timestamp()) {
            Ok(0) => {
                debug!("Token sweeper: nothing to purge");
                0
            }
            Ok(purged) => {
                info!(purged, "Token sweeper: purged expired revocations");
                purged
            }
            Err(e) => {
                warn!(error = %e, "Token sweeper: purge failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_db;

    #[test]
    fn sweep_purges_only_expired_entries() {
        let (db, _dir) = temp_db();
        let now = Utc::now().timestamp();
        let revoked = RevokedTokenRepository::new(&db);
        revoked.revoke("expired", now - 10).unwrap();
        revoked.revoke("live", now + 3600).unwrap();

        let sweeper = RevokedTokenSweeper::new(db.clone());
        assert_eq!(sweeper.sweep_step(), 1);
        assert_eq!(sweeper.sweep_step(), 0);
        assert!(revoked.is_revoked("live", now).unwrap());
    }

    #[tokio::test]
    async fn run_stops_when_cancelled() {
        let (db, _dir) = temp_db();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            RevokedTokenSweeper::new(db)
                .with_interval(Duration::from_millis(10))
                .run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }
}
