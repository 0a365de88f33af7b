use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use murmur_types::api::SessionClaims;

pub const SESSION_COOKIE: &str = "murmur_session";
pub const SESSION_TTL_DAYS: i64 = 30;

/// Issues and reads the signed session cookie.
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub secure_cookies: bool,
}

impl SessionConfig {
    pub fn new(secret: impl Into<String>, secure_cookies: bool) -> Self {
        Self {
            secret: secret.into(),
            secure_cookies,
        }
    }

    /// A cookie proving `email` was verified, and naming the account if there is one.
    pub fn issue(&self, email: &str, user_id: Option<Uuid>) -> anyhow::Result<Cookie<'static>> {
        let claims = SessionClaims {
            sub: user_id,
            email: email.to_string(),
            jti: Uuid::new_v4(),
            exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_TTL_DAYS)).timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(Cookie::build((SESSION_COOKIE, token))
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::days(SESSION_TTL_DAYS))
            .build())
    }

    /// Claims from a present, correctly signed, unexpired cookie.
    pub fn read(&self, jar: &CookieJar) -> Option<SessionClaims> {
        let token = jar.get(SESSION_COOKIE)?.value().to_string();
        decode::<SessionClaims>(
            &token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .ok()
        .map(|data| data.claims)
    }

    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }
}
