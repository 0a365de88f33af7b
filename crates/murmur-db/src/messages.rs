use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::Database;
use crate::clock::format_timestamp;
use crate::models::{DeleteOutcome, MessageRow};

const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, content, deleted_for_sender, deleted_for_receiver, sent_at";

impl Database {
    /// Append a message. Callers are responsible for the contact check.
    pub fn insert_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<MessageRow> {
        let row = MessageRow {
            id: Uuid::new_v4().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            deleted_for_sender: false,
            deleted_for_receiver: false,
            sent_at: format_timestamp(now),
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, receiver_id, content, sent_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![row.id, row.sender_id, row.receiver_id, row.content, row.sent_at],
            )?;
            Ok(())
        })?;

        Ok(row)
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// Messages between `viewer_id` and `peer_id` that the viewer has not deleted,
    /// oldest first. Ties on `sent_at` fall back to insertion order.
    pub fn get_conversation(&self, viewer_id: &str, peer_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2 AND deleted_for_sender = 0)
                    OR (sender_id = ?2 AND receiver_id = ?1 AND deleted_for_receiver = 0)
                 ORDER BY sent_at ASC, rowid ASC",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([viewer_id, peer_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Hide a message from `requester_id` only. Setting an already-set flag is fine.
    pub fn soft_delete_message(&self, id: &str, requester_id: &str) -> Result<DeleteOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(message) = query_message(&tx, id)? else {
                return Ok(DeleteOutcome::NotFound);
            };

            let outcome = if message.sender_id == requester_id {
                tx.execute("UPDATE messages SET deleted_for_sender = 1 WHERE id = ?1", [id])?;
                DeleteOutcome::DeletedForSender
            } else if message.receiver_id == requester_id {
                tx.execute("UPDATE messages SET deleted_for_receiver = 1 WHERE id = ?1", [id])?;
                DeleteOutcome::DeletedForReceiver
            } else {
                return Ok(DeleteOutcome::NotParticipant);
            };

            tx.commit()?;
            Ok(outcome)
        })
    }

    /// Physically remove messages both parties have deleted. Returns the number removed.
    pub fn purge_fully_deleted(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM messages WHERE deleted_for_sender = 1 AND deleted_for_receiver = 1",
                [],
            )?;
            Ok(removed)
        })
    }
}

fn query_message(conn: &Connection, id: &str) -> Result<Option<MessageRow>> {
    let sql = format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS);
    let row = conn.query_row(&sql, [id], map_message).optional()?;
    Ok(row)
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        deleted_for_sender: row.get(4)?,
        deleted_for_receiver: row.get(5)?,
        sent_at: row.get(6)?,
    })
}
