use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

use crate::Database;
use crate::clock::format_timestamp;
use crate::models::{NewUser, NewUserOutcome, UserRow};

const USER_COLUMNS: &str =
    "id, email, username, password, avatar_url, status, invitation_code, created_at";

impl Database {
    /// Insert a user unless the username or email is already registered.
    pub fn create_user(&self, new: &NewUser, now: DateTime<Utc>) -> Result<NewUserOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if query_user(&tx, "username", &new.username)?.is_some() {
                return Ok(NewUserOutcome::UsernameTaken);
            }
            if query_user(&tx, "email", &new.email)?.is_some() {
                return Ok(NewUserOutcome::EmailTaken);
            }

            let row = UserRow {
                id: Uuid::new_v4().to_string(),
                email: new.email.clone(),
                username: new.username.clone(),
                password: new.password_hash.clone(),
                avatar_url: None,
                status: new.status.clone(),
                invitation_code: new.invitation_code.clone(),
                created_at: format_timestamp(now),
            };

            let inserted = tx.execute(
                "INSERT INTO users (id, email, username, password, avatar_url, status, invitation_code, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    row.id,
                    row.email,
                    row.username,
                    row.password,
                    row.avatar_url,
                    row.status,
                    row.invitation_code,
                    row.created_at,
                ],
            );

            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(err, Some(msg)))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    if msg.contains("users.username") {
                        return Ok(NewUserOutcome::UsernameTaken);
                    }
                    if msg.contains("users.email") {
                        return Ok(NewUserOutcome::EmailTaken);
                    }
                    anyhow::bail!("user insert violated a constraint: {}", msg);
                }
                Err(e) => return Err(e.into()),
            }

            tx.commit()?;
            Ok(NewUserOutcome::Created(row))
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_invitation_code(&self, code: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "invitation_code", code))
    }

    /// `None` leaves a field unchanged, `Some(None)` clears it.
    /// Returns the updated row, or `None` if the user does not exist.
    pub fn update_profile(
        &self,
        id: &str,
        status: Option<Option<&str>>,
        avatar_url: Option<Option<&str>>,
    ) -> Result<Option<UserRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if let Some(status) = status {
                tx.execute("UPDATE users SET status = ?1 WHERE id = ?2", rusqlite::params![status, id])?;
            }
            if let Some(avatar_url) = avatar_url {
                tx.execute(
                    "UPDATE users SET avatar_url = ?1 WHERE id = ?2",
                    rusqlite::params![avatar_url, id],
                )?;
            }
            let row = query_user(&tx, "id", id)?;
            tx.commit()?;
            Ok(row)
        })
    }
}

/// `column` is always one of our own literals, never user input.
fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    let row = stmt.query_row([value], map_user).optional()?;
    Ok(row)
}

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    map_user_at(row, 0)
}

/// Map the user columns starting at `offset`, for joins.
pub(crate) fn map_user_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(offset)?,
        email: row.get(offset + 1)?,
        username: row.get(offset + 2)?,
        password: row.get(offset + 3)?,
        avatar_url: row.get(offset + 4)?,
        status: row.get(offset + 5)?,
        invitation_code: row.get(offset + 6)?,
        created_at: row.get(offset + 7)?,
    })
}
