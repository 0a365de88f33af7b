use thiserror::Error;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 20;
pub const PASSWORD_MIN: usize = 8;
pub const STATUS_MAX: usize = 100;
pub const AVATAR_URL_MAX: usize = 2048;
pub const CODE_LEN: usize = 6;

/// A request field broke one of its constraints. The message is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Verification code must be {CODE_LEN} digits")]
    InvalidCodeFormat,

    #[error("Username must be {USERNAME_MIN}-{USERNAME_MAX} characters")]
    UsernameLength,

    #[error("Username may only contain letters, digits and underscores")]
    UsernameCharset,

    #[error("Password must be at least {PASSWORD_MIN} characters")]
    PasswordTooShort,

    #[error("Status must be at most {STATUS_MAX} characters")]
    StatusTooLong,

    #[error("Avatar URL must be at most {AVATAR_URL_MAX} characters")]
    AvatarUrlTooLong,

    #[error("Invitation code is required")]
    MissingInvitationCode,

    #[error("Message content cannot be empty")]
    EmptyContent,
}

/// Deliberately loose: one `@`, a non-empty local part, a dotted domain, no whitespace.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::InvalidEmail);
    }
    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn validate_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::InvalidCodeFormat)
    }
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ValidationError::UsernameLength);
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::UsernameCharset);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

pub fn validate_status(status: Option<&str>) -> Result<(), ValidationError> {
    match status {
        Some(s) if s.chars().count() > STATUS_MAX => Err(ValidationError::StatusTooLong),
        _ => Ok(()),
    }
}

pub fn validate_avatar_url(url: Option<&str>) -> Result<(), ValidationError> {
    match url {
        Some(u) if u.len() > AVATAR_URL_MAX => Err(ValidationError::AvatarUrlTooLong),
        _ => Ok(()),
    }
}

pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(())
}
