#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use murmur_api::mailer::MemoryMailer;
use murmur_api::session::{SESSION_COOKIE, SessionConfig};
use murmur_api::state::{AppState, AppStateInner};
use murmur_db::Database;
use murmur_gateway::dispatcher::{Dispatcher, FanoutScope};
use murmur_types::models::User;

pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    /// `name=value` of the session cookie, if the response set one.
    pub session_cookie: Option<String>,
}

/// A logged-in account.
pub struct Account {
    pub user: User,
    pub cookie: String,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_scope(FanoutScope::All)
    }

    pub fn with_scope(scope: FanoutScope) -> Self {
        let mailer = Arc::new(MemoryMailer::default());
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            dispatcher: Dispatcher::new(scope),
            mailer: mailer.clone(),
            session: SessionConfig::new("test-session-secret", false),
        });
        Self { state, mailer }
    }

    pub fn router(&self) -> Router {
        murmur_api::router(self.state.clone())
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = self.router().oneshot(req).await.unwrap();
        let status = res.status();
        let session_cookie = res
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with(&format!("{}=", SESSION_COOKIE)))
            .map(str::to_string);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            body,
            session_cookie,
        }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, cookie, None).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, cookie, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, cookie, None).await
    }

    /// Request a code and return what was mailed.
    pub async fn send_code(&self, email: &str) -> String {
        let res = self.post("/auth/send-code", None, json!({ "email": email })).await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        self.mailer.last_code_for(email).unwrap()
    }

    /// Full email-code signup. Username doubles as the email local part.
    pub async fn signup(&self, username: &str) -> Account {
        let email = format!("{}@example.com", username);
        let code = self.send_code(&email).await;

        let verified = self
            .post("/auth/verify-code", None, json!({ "email": email, "code": code }))
            .await;
        assert_eq!(verified.status, StatusCode::OK, "{}", verified.body);
        assert_eq!(verified.body["needsProfile"], true);
        let pending = verified.session_cookie.unwrap();

        let registered = self
            .post(
                "/auth/complete-registration",
                Some(&pending),
                json!({ "email": email, "username": username, "password": "hunter2hunter2" }),
            )
            .await;
        assert_eq!(registered.status, StatusCode::OK, "{}", registered.body);

        Account {
            user: serde_json::from_value(registered.body["user"].clone()).unwrap(),
            cookie: registered.session_cookie.unwrap(),
        }
    }

    /// `requester` redeems `owner`'s invitation code.
    pub async fn connect(&self, requester: &Account, owner: &Account) {
        let res = self
            .post(
                "/contacts",
                Some(&requester.cookie),
                json!({ "invitationCode": owner.user.invitation_code }),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    }

    pub async fn send_message(&self, from: &Account, to: &Account, content: &str) -> TestResponse {
        self.post(
            "/messages",
            Some(&from.cookie),
            json!({ "receiverId": to.user.id, "content": content }),
        )
        .await
    }
}
