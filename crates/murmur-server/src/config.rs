use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

use murmur_api::mailer::BrevoConfig;
use murmur_gateway::dispatcher::FanoutScope;

/// Session secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub session_secret: String,
    pub secure_cookies: bool,
    pub fanout_scope: FanoutScope,
    /// `None` disables compaction.
    pub compaction_interval_secs: Option<u64>,
    /// `None` falls back to logging mail.
    pub brevo: Option<BrevoConfig>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let session_secret = var("MURMUR_SESSION_SECRET").unwrap_or_default();
        if session_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            bail!("MURMUR_SESSION_SECRET is unset or still a placeholder");
        }

        let port = match var("MURMUR_PORT") {
            Some(raw) => raw.parse().with_context(|| format!("invalid MURMUR_PORT '{}'", raw))?,
            None => 3000,
        };

        let secure_cookies = match var("MURMUR_SECURE_COOKIES").as_deref() {
            None | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => bail!("invalid MURMUR_SECURE_COOKIES '{}'", other),
        };

        let fanout_scope = match var("MURMUR_FANOUT_SCOPE") {
            Some(raw) => raw.parse().map_err(anyhow::Error::msg)?,
            None => FanoutScope::default(),
        };

        let compaction_interval_secs = match var("MURMUR_COMPACTION_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .parse()
                    .with_context(|| format!("invalid MURMUR_COMPACTION_INTERVAL_SECS '{}'", raw))?;
                (secs > 0).then_some(secs)
            }
            None => None,
        };

        let brevo = match (var("BREVO_API_KEY"), var("BREVO_SENDER_EMAIL")) {
            (Some(api_key), Some(sender_email)) => Some(BrevoConfig {
                api_key,
                sender_email,
                sender_name: var("BREVO_SENDER_NAME"),
            }),
            (None, None) => None,
            _ => bail!("BREVO_API_KEY and BREVO_SENDER_EMAIL must be set together"),
        };

        Ok(Self {
            host: var("MURMUR_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("MURMUR_DB_PATH").unwrap_or_else(|| "murmur.db".into()).into(),
            session_secret,
            secure_cookies,
            fanout_scope,
            compaction_interval_secs,
            brevo,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[("MURMUR_SESSION_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(config.addr().unwrap().to_string(), "0.0.0.0:3000");
        assert_eq!(config.db_path, PathBuf::from("murmur.db"));
        assert!(!config.secure_cookies);
        assert_eq!(config.fanout_scope, FanoutScope::All);
        assert!(config.compaction_interval_secs.is_none());
        assert!(config.brevo.is_none());
    }

    #[test]
    fn placeholder_secrets_are_rejected() {
        assert!(config(&[]).is_err());
        assert!(config(&[("MURMUR_SESSION_SECRET", "  ")]).is_err());
        assert!(config(&[("MURMUR_SESSION_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("MURMUR_SESSION_SECRET", "a-real-secret"),
            ("MURMUR_HOST", "127.0.0.1"),
            ("MURMUR_PORT", "8080"),
            ("MURMUR_SECURE_COOKIES", "true"),
            ("MURMUR_FANOUT_SCOPE", "participants"),
            ("MURMUR_COMPACTION_INTERVAL_SECS", "3600"),
            ("BREVO_API_KEY", "key"),
            ("BREVO_SENDER_EMAIL", "noreply@example.com"),
        ])
        .unwrap();
        assert_eq!(config.addr().unwrap().to_string(), "127.0.0.1:8080");
        assert!(config.secure_cookies);
        assert_eq!(config.fanout_scope, FanoutScope::Participants);
        assert_eq!(config.compaction_interval_secs, Some(3600));
        let brevo = config.brevo.unwrap();
        assert_eq!(brevo.sender_email, "noreply@example.com");
        assert!(brevo.sender_name.is_none());
    }

    #[test]
    fn bad_values_fail() {
        let secret = ("MURMUR_SESSION_SECRET", "a-real-secret");
        assert!(config(&[secret, ("MURMUR_PORT", "eighty")]).is_err());
        assert!(config(&[secret, ("MURMUR_FANOUT_SCOPE", "friends")]).is_err());
        assert!(config(&[secret, ("MURMUR_SECURE_COOKIES", "maybe")]).is_err());
        assert!(config(&[secret, ("BREVO_API_KEY", "key")]).is_err());
        // Zero means off.
        let config = config(&[secret, ("MURMUR_COMPACTION_INTERVAL_SECS", "0")]).unwrap();
        assert!(config.compaction_interval_secs.is_none());
    }
}
