use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, TransactionBehavior};
use uuid::Uuid;

use crate::Database;
use crate::clock::format_timestamp;
use crate::models::{AddContactOutcome, ContactRow, ContactWithPeerRow};
use crate::users::map_user_at;

impl Database {
    /// Resolve an invitation code and create requester -> owner, plus the
    /// reverse edge if it is missing. Both edges commit or neither does.
    pub fn add_contact_by_invitation(
        &self,
        requester_id: &str,
        invitation_code: &str,
        now: DateTime<Utc>,
    ) -> Result<AddContactOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let target: Option<String> = tx
                .query_row(
                    "SELECT id FROM users WHERE invitation_code = ?1",
                    [invitation_code],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(target_id) = target else {
                return Ok(AddContactOutcome::InvalidInvitation);
            };
            if target_id == requester_id {
                return Ok(AddContactOutcome::SelfContact);
            }

            let forward = ContactRow {
                id: Uuid::new_v4().to_string(),
                user_id: requester_id.to_string(),
                contact_id: target_id.clone(),
                created_at: format_timestamp(now),
            };

            // The UNIQUE(user_id, contact_id) constraint turns "already there" into 0 rows.
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO contacts (id, user_id, contact_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![forward.id, forward.user_id, forward.contact_id, forward.created_at],
            )?;
            if inserted == 0 {
                return Ok(AddContactOutcome::AlreadyContact);
            }

            let reverse_created = tx.execute(
                "INSERT OR IGNORE INTO contacts (id, user_id, contact_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![Uuid::new_v4().to_string(), target_id, requester_id, forward.created_at],
            )? == 1;

            tx.commit()?;
            Ok(AddContactOutcome::Added {
                forward,
                reverse_created,
            })
        })
    }

    /// Directed check: may `user_id` message `contact_id`?
    pub fn contact_exists(&self, user_id: &str, contact_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM contacts WHERE user_id = ?1 AND contact_id = ?2",
                    [user_id, contact_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            Ok(exists)
        })
    }

    /// Outgoing edges of `user_id` with the peer's user row, in insertion order.
    pub fn get_contacts_with_users(&self, user_id: &str) -> Result<Vec<ContactWithPeerRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.user_id, c.contact_id, c.created_at,
                        u.id, u.email, u.username, u.password, u.avatar_url, u.status, u.invitation_code, u.created_at
                 FROM contacts c
                 JOIN users u ON u.id = c.contact_id
                 WHERE c.user_id = ?1
                 ORDER BY c.rowid ASC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ContactWithPeerRow {
                        contact: ContactRow {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            contact_id: row.get(2)?,
                            created_at: row.get(3)?,
                        },
                        peer: map_user_at(row, 4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Insert a single directed edge. Redeeming an invitation never needs this;
    /// it exists for data repair and for exercising one-sided state.
    pub fn insert_contact_edge(&self, user_id: &str, contact_id: &str, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO contacts (id, user_id, contact_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![Uuid::new_v4().to_string(), user_id, contact_id, format_timestamp(now)],
            )?;
            Ok(inserted == 1)
        })
    }
}
