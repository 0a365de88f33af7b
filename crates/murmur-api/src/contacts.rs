use axum::{Extension, Json, extract::State};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use tracing::info;

use murmur_db::models::AddContactOutcome;
use murmur_types::api::AddContactRequest;
use murmur_types::models::{Contact, ContactWithProfile};

use crate::error::ApiError;
use crate::middleware::Session;
use crate::state::{AppState, with_db};

/// GET /contacts
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<ContactWithProfile>>, ApiError> {
    let user_id = session.user_id.to_string();
    let rows = with_db(&state, move |db| db.get_contacts_with_users(&user_id)).await?;

    let contacts = rows
        .into_iter()
        .map(ContactWithProfile::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(contacts))
}

/// POST /contacts
pub async fn add_contact(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    WithRejection(Json(req), _): WithRejection<Json<AddContactRequest>, ApiError>,
) -> Result<Json<Contact>, ApiError> {
    req.validate()?;

    let requester = session.user_id.to_string();
    let code = req.invitation_code.trim().to_string();
    let outcome =
        with_db(&state, move |db| db.add_contact_by_invitation(&requester, &code, Utc::now())).await?;

    match outcome {
        AddContactOutcome::Added {
            forward,
            reverse_created,
        } => {
            let contact = Contact::try_from(forward)?;
            info!(
                "{} added {} as a contact (reverse edge {})",
                contact.user_id,
                contact.contact_id,
                if reverse_created { "created" } else { "already present" }
            );
            Ok(Json(contact))
        }
        AddContactOutcome::InvalidInvitation => Err(ApiError::InvalidInvitation),
        AddContactOutcome::SelfContact => Err(ApiError::SelfContact),
        AddContactOutcome::AlreadyContact => Err(ApiError::Conflict("Contact already exists")),
    }
}
