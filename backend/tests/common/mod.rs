#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;

use moodsync_api::config::Config;
use moodsync_api::services::sms::{SmsError, SmsScheduler, SmsSender};
use moodsync_api::storage::memory::MemoryStorage;
use moodsync_api::{router, AppState};

/// Captures outbound messages instead of calling the provider.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SmsSender for RecordingSender {
    async fn send(&self, to: &str, body: &str) -> Result<String, SmsError> {
        let mut sent = self.sent.lock().await;
        sent.push((to.to_string(), body.to_string()));
        Ok(format!("SM{:04}", sent.len()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStorage>,
    pub sms: Arc<RecordingSender>,
}

pub fn test_config() -> Config {
    Config {
        jwt_secret: "integration-test-secret".into(),
        ..Config::default()
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(test_config(), true)
}

pub fn spawn_app_with(config: Config, with_sms: bool) -> TestApp {
    let store = Arc::new(MemoryStorage::new());
    let sms = Arc::new(RecordingSender::default());
    let scheduler = with_sms.then(|| SmsScheduler::new(sms.clone()));

    let state = AppState::new(store.clone(), Arc::new(config), scheduler);
    let router = router(state.clone()).layer(MockConnectInfo(SocketAddr::from((
        [127, 0, 0, 1],
        40000,
    ))));

    TestApp {
        router,
        state,
        store,
        sms,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    /// Sign up and log in; returns the bearer token.
    pub async fn register(&self, email: &str, password: &str) -> String {
        let creds = serde_json::json!({ "email": email, "password": password });
        let (status, _) = self.post("/api/signup", None, creds.clone()).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self.post("/api/login", None, creds).await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }
}
