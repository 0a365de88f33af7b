use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

/// Fail with `Forbidden` unless `caller` holds a contact edge to `peer`.
///
/// Only the caller's own outgoing edge counts; the reverse edge alone grants nothing.
pub async fn require_contact(state: &AppState, caller: Uuid, peer: Uuid) -> Result<(), ApiError> {
    let is_contact = with_db(state, move |db| db.contact_exists(&caller.to_string(), &peer.to_string())).await?;
    if !is_contact {
        return Err(ApiError::Forbidden("Not a contact"));
    }
    Ok(())
}
