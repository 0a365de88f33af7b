use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use crate::Database;
use crate::clock::format_timestamp;

impl Database {
    /// Mark a session as ended. `expires_at` is when the token would have lapsed
    /// anyway; after that the entry can be purged.
    pub fn revoke_session(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO revoked_sessions (jti, expires_at) VALUES (?1, ?2)",
                rusqlite::params![jti, format_timestamp(expires_at)],
            )?;
            Ok(())
        })
    }

    pub fn is_session_revoked(&self, jti: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let revoked = conn
                .query_row("SELECT 1 FROM revoked_sessions WHERE jti = ?1", [jti], |_| Ok(()))
                .optional()?
                .is_some();
            Ok(revoked)
        })
    }

    /// Drop revocations whose tokens have expired on their own.
    pub fn purge_expired_revocations(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM revoked_sessions WHERE expires_at < ?1",
                [format_timestamp(now)],
            )?;
            Ok(removed)
        })
    }
}
