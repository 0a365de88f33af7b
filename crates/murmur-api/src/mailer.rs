//! Outgoing email. Sending is fire-and-forget: callers never wait on delivery
//! and never see a delivery failure.

use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub trait Mailer: Send + Sync {
    fn send(&self, mail: OutgoingMail);
}

/// Development mailer: writes the mail to the log.
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: OutgoingMail) {
        info!("Email to {}: {} -- {}", mail.to, mail.subject, mail.body);
    }
}

/// Keeps every mail in memory. Used by tests to read verification codes back.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// The six-digit code in the most recent mail to `to`.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|mail| mail.to == to)?
            .body
            .split_whitespace()
            .find(|word| word.len() == 6 && word.bytes().all(|b| b.is_ascii_digit()))
            .map(str::to_string)
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: OutgoingMail) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(mail);
        }
    }
}

const BREVO_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Clone)]
pub struct BrevoConfig {
    pub api_key: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoEmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoSendEmailBody {
    sender: BrevoEmailAddress,
    to: Vec<BrevoEmailAddress>,
    subject: String,
    text_content: String,
}

/// Sends through the Brevo transactional email API on a background task.
pub struct BrevoMailer {
    client: reqwest::Client,
    config: BrevoConfig,
}

impl BrevoMailer {
    pub fn new(config: BrevoConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn payload(&self, mail: &OutgoingMail) -> BrevoSendEmailBody {
        BrevoSendEmailBody {
            sender: BrevoEmailAddress {
                email: self.config.sender_email.clone(),
                name: self.config.sender_name.clone(),
            },
            to: vec![BrevoEmailAddress {
                email: mail.to.clone(),
                name: None,
            }],
            subject: mail.subject.clone(),
            text_content: mail.body.clone(),
        }
    }
}

impl Mailer for BrevoMailer {
    fn send(&self, mail: OutgoingMail) {
        let body = match serde_json::to_string(&self.payload(&mail)) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to serialize Brevo payload for {}: {}", mail.to, e);
                return;
            }
        };

        let request = self
            .client
            .post(BREVO_ENDPOINT)
            .header("api-key", &self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(body);

        tokio::spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("Verification email sent to {}", mail.to);
                }
                Ok(resp) => warn!("Brevo rejected email to {}: HTTP {}", mail.to, resp.status()),
                Err(e) => warn!("Brevo request for {} failed: {}", mail.to, e),
            }
        });
    }
}
