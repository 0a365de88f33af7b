use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use crate::Database;
use crate::clock::{format_timestamp, parse_timestamp};
use crate::models::{RedeemOutcome, VerificationCodeRow};

impl Database {
    /// Store a freshly issued code. Earlier codes for the same email stay valid.
    pub fn insert_verification_code(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationCodeRow> {
        let row = VerificationCodeRow {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            code: code.to_string(),
            expires_at: format_timestamp(expires_at),
            used: false,
            created_at: format_timestamp(now),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO verification_codes (id, email, code, expires_at, used, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5)",
                rusqlite::params![row.id, row.email, row.code, row.expires_at, row.created_at],
            )?;
            Ok(())
        })?;

        Ok(row)
    }

    /// Check and consume a code in one transaction. An expired code is left unused.
    pub fn redeem_verification_code(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<RedeemOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let found: Option<(String, String)> = tx
                .query_row(
                    "SELECT id, expires_at FROM verification_codes
                     WHERE email = ?1 AND code = ?2 AND used = 0
                     ORDER BY expires_at DESC
                     LIMIT 1",
                    [email, code],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((id, expires_at)) = found else {
                return Ok(RedeemOutcome::Invalid);
            };

            if now > parse_timestamp(&expires_at)? {
                return Ok(RedeemOutcome::Expired);
            }

            let consumed = tx.execute(
                "UPDATE verification_codes SET used = 1 WHERE id = ?1 AND used = 0",
                [&id],
            )?;
            if consumed == 0 {
                return Ok(RedeemOutcome::Invalid);
            }

            tx.commit()?;
            Ok(RedeemOutcome::Redeemed)
        })
    }

    pub fn get_verification_codes(&self, email: &str) -> Result<Vec<VerificationCodeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, email, code, expires_at, used, created_at
                 FROM verification_codes
                 WHERE email = ?1
                 ORDER BY created_at ASC, rowid ASC",
            )?;
            let rows = stmt
                .query_map([email], |row| {
                    Ok(VerificationCodeRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        code: row.get(2)?,
                        expires_at: row.get(3)?,
                        used: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const EMAIL: &str = "alice@example.com";

    fn issue(db: &Database, code: &str, now: DateTime<Utc>) -> VerificationCodeRow {
        db.insert_verification_code(EMAIL, code, now, now + Duration::minutes(10)).unwrap()
    }

    #[test]
    fn redeems_once() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        issue(&db, "123456", now);

        assert_eq!(db.redeem_verification_code(EMAIL, "123456", now).unwrap(), RedeemOutcome::Redeemed);
        assert_eq!(db.redeem_verification_code(EMAIL, "123456", now).unwrap(), RedeemOutcome::Invalid);

        let rows = db.get_verification_codes(EMAIL).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].used);
    }

    #[test]
    fn wrong_code_or_email_is_invalid() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        issue(&db, "123456", now);

        assert_eq!(db.redeem_verification_code(EMAIL, "654321", now).unwrap(), RedeemOutcome::Invalid);
        assert_eq!(
            db.redeem_verification_code("bob@example.com", "123456", now).unwrap(),
            RedeemOutcome::Invalid
        );
    }

    #[test]
    fn expired_code_stays_unused() {
        let db = Database::open_in_memory().unwrap();
        let issued = Utc::now();
        issue(&db, "123456", issued);
        let later = issued + Duration::minutes(11);

        assert_eq!(db.redeem_verification_code(EMAIL, "123456", later).unwrap(), RedeemOutcome::Expired);
        assert_eq!(db.redeem_verification_code(EMAIL, "123456", later).unwrap(), RedeemOutcome::Expired);
        assert!(!db.get_verification_codes(EMAIL).unwrap()[0].used);
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let db = Database::open_in_memory().unwrap();
        let issued = Utc::now();
        let row = issue(&db, "123456", issued);
        let at_expiry = parse_timestamp(&row.expires_at).unwrap();

        assert_eq!(db.redeem_verification_code(EMAIL, "123456", at_expiry).unwrap(), RedeemOutcome::Redeemed);
    }

    #[test]
    fn older_codes_remain_valid() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        issue(&db, "111111", now);
        issue(&db, "222222", now + Duration::seconds(5));

        assert_eq!(db.redeem_verification_code(EMAIL, "111111", now).unwrap(), RedeemOutcome::Redeemed);
        assert_eq!(db.redeem_verification_code(EMAIL, "222222", now).unwrap(), RedeemOutcome::Redeemed);
    }

    #[test]
    fn duplicate_code_prefers_unexpired_row() {
        let db = Database::open_in_memory().unwrap();
        let first = Utc::now();
        issue(&db, "123456", first);
        let second = first + Duration::minutes(8);
        issue(&db, "123456", second);

        // First row expired, second still live.
        let now = first + Duration::minutes(12);
        assert_eq!(db.redeem_verification_code(EMAIL, "123456", now).unwrap(), RedeemOutcome::Redeemed);
        assert_eq!(db.redeem_verification_code(EMAIL, "123456", now).unwrap(), RedeemOutcome::Expired);
    }

    #[test]
    fn concurrent_redemption_succeeds_once() {
        use std::sync::Arc;

        let db = Arc::new(Database::open_in_memory().unwrap());
        let now = Utc::now();
        issue(&db, "123456", now);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.redeem_verification_code(EMAIL, "123456", now))
            })
            .collect();

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
        let redeemed = outcomes.iter().filter(|o| **o == RedeemOutcome::Redeemed).count();
        assert_eq!(redeemed, 1);
        assert!(outcomes.contains(&RedeemOutcome::Invalid));
    }
}
