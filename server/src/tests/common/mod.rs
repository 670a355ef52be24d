use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde_json::{json, Value};

use crate::server_config::{ReportSettings, ServerConfig};

pub const TEST_TOKEN: &str = "test-token";

pub fn test_config(api_url: &str) -> ServerConfig {
    ServerConfig {
        db_name: "metrics".to_string(),
        user: "reporter".to_string(),
        password: "secret".to_string(),
        host: "127.0.0.1".to_string(),
        port: 1,
        sendpulse_api_url: api_url.to_string(),
        sendpulse_grant_type: "client_credentials".to_string(),
        sendpulse_client_id: "client-id".to_string(),
        sendpulse_client_secret: "client-secret".to_string(),
        from_email: "noreply@example.com".to_string(),
        report: ReportSettings {
            subject: "Report".to_string(),
            sender_name: "Vintex".to_string(),
            recipients: vec!["ops@example.com".to_string(), "cfo@example.com".to_string()],
            text: Some("Daily report".to_string()),
            send_time: "09:00".to_string(),
            timezone: "Asia/Almaty".to_string(),
            day_offset_days: 1,
            template_path: None,
            run_on_startup: true,
            http_timeout_secs: 5,
            db_connect_timeout_secs: 1,
        },
    }
}

/// Stand-in for the SendPulse API that records what it receives.
#[derive(Clone)]
pub struct FakeSendPulse {
    pub token_status: StatusCode,
    pub email_status: StatusCode,
    pub token_hits: Arc<AtomicUsize>,
    pub email_hits: Arc<AtomicUsize>,
    pub token_form: Arc<Mutex<Option<HashMap<String, String>>>>,
    pub email_body: Arc<Mutex<Option<Value>>>,
    pub authorization: Arc<Mutex<Option<String>>>,
}

impl FakeSendPulse {
    pub fn new(token_status: StatusCode, email_status: StatusCode) -> Self {
        Self {
            token_status,
            email_status,
            token_hits: Arc::new(AtomicUsize::new(0)),
            email_hits: Arc::new(AtomicUsize::new(0)),
            token_form: Arc::new(Mutex::new(None)),
            email_body: Arc::new(Mutex::new(None)),
            authorization: Arc::new(Mutex::new(None)),
        }
    }

    pub fn token_hits(&self) -> usize {
        self.token_hits.load(Ordering::SeqCst)
    }

    pub fn email_hits(&self) -> usize {
        self.email_hits.load(Ordering::SeqCst)
    }

    /// Serves the fake on an ephemeral port and returns its base url.
    pub async fn spawn(&self) -> String {
        let router = Router::new()
            .route("/oauth/access_token", post(access_token))
            .route("/smtp/emails", post(smtp_emails))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://{addr}")
    }
}

async fn access_token(
    State(fake): State<FakeSendPulse>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    fake.token_hits.fetch_add(1, Ordering::SeqCst);
    *fake.token_form.lock().unwrap() = Some(form);

    if fake.token_status != StatusCode::OK {
        return (fake.token_status, r#"{"error":"invalid_client"}"#).into_response();
    }

    Json(json!({
        "access_token": TEST_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600
    }))
    .into_response()
}

async fn smtp_emails(
    State(fake): State<FakeSendPulse>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    fake.email_hits.fetch_add(1, Ordering::SeqCst);
    *fake.authorization.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *fake.email_body.lock().unwrap() = Some(body);

    if fake.email_status != StatusCode::OK {
        return (fake.email_status, "upstream exploded").into_response();
    }

    Json(json!({"result": true, "id": "msg-1"})).into_response()
}
