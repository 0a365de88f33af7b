//! Database row types. These map directly to SQLite rows and are kept apart from
//! the murmur-types API models; the `TryFrom` impls do the conversion.

use anyhow::{Context, Result};
use uuid::Uuid;

use murmur_types::models::{Contact, ContactWithProfile, Message, PublicProfile, User};

use crate::clock::parse_timestamp;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub avatar_url: Option<String>,
    pub status: Option<String>,
    pub invitation_code: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct VerificationCodeRow {
    pub id: String,
    pub email: String,
    pub code: String,
    pub expires_at: String,
    pub used: bool,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ContactRow {
    pub id: String,
    pub user_id: String,
    pub contact_id: String,
    pub created_at: String,
}

/// A contact edge joined with the peer's user row.
#[derive(Debug, Clone)]
pub struct ContactWithPeerRow {
    pub contact: ContactRow,
    pub peer: UserRow,
}

#[derive(Debug, Clone)]
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub deleted_for_sender: bool,
    pub deleted_for_receiver: bool,
    pub sent_at: String,
}

/// Everything needed to insert a user; hashing and code generation happen upstream.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub status: Option<String>,
    pub invitation_code: String,
}

// -- Outcomes --

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    Redeemed,
    /// No unused code matches (email, code).
    Invalid,
    /// A matching code exists but is past its expiry. It stays unused.
    Expired,
}

#[derive(Debug, Clone)]
pub enum NewUserOutcome {
    Created(UserRow),
    UsernameTaken,
    EmailTaken,
}

#[derive(Debug, Clone)]
pub enum AddContactOutcome {
    Added {
        forward: ContactRow,
        reverse_created: bool,
    },
    InvalidInvitation,
    SelfContact,
    AlreadyContact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    DeletedForSender,
    DeletedForReceiver,
    NotFound,
    NotParticipant,
}

// -- Conversions --

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    raw.parse().with_context(|| format!("corrupt {} '{}'", what, raw))
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id, "user id")?,
            created_at: parse_timestamp(&row.created_at)?,
            email: row.email,
            username: row.username,
            avatar_url: row.avatar_url,
            status: row.status,
            invitation_code: row.invitation_code,
        })
    }
}

impl TryFrom<UserRow> for PublicProfile {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id, "user id")?,
            created_at: parse_timestamp(&row.created_at)?,
            username: row.username,
            avatar_url: row.avatar_url,
            status: row.status,
        })
    }
}

impl TryFrom<ContactRow> for Contact {
    type Error = anyhow::Error;

    fn try_from(row: ContactRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id, "contact id")?,
            user_id: parse_id(&row.user_id, "user id")?,
            contact_id: parse_id(&row.contact_id, "contact user id")?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

impl TryFrom<ContactWithPeerRow> for ContactWithProfile {
    type Error = anyhow::Error;

    fn try_from(row: ContactWithPeerRow) -> Result<Self> {
        let edge = Contact::try_from(row.contact)?;
        Ok(Self {
            id: edge.id,
            user_id: edge.user_id,
            contact_id: edge.contact_id,
            created_at: edge.created_at,
            contact: PublicProfile::try_from(row.peer)?,
        })
    }
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id, "message id")?,
            sender_id: parse_id(&row.sender_id, "sender id")?,
            receiver_id: parse_id(&row.receiver_id, "receiver id")?,
            sent_at: parse_timestamp(&row.sent_at)?,
            content: row.content,
            deleted_for_sender: row.deleted_for_sender,
            deleted_for_receiver: row.deleted_for_receiver,
        })
    }
}
