#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use mercadoboom::config::Config;
use mercadoboom::db::migrator::DEFAULT_API_KEY;
use mercadoboom::services::{DeliveryError, Notifier, OutboundMessage};
use mercadoboom::state::SharedState;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const ADMIN_KEY: &str = DEFAULT_API_KEY;

/// Captures outgoing messages so tests can read the codes.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OutboundMessage>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    /// While set, every send fails as if the provider were down.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }

    /// Digits of the most recent code sent to `to`.
    pub fn last_code_for(&self, to: &str) -> String {
        let sent = self.sent.lock().unwrap();
        let message = sent
            .iter()
            .rev()
            .find(|m| m.to == to)
            .unwrap_or_else(|| panic!("no message sent to {to}"));
        extract_code(&message.body)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Rejected(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub fn extract_code(body: &str) -> String {
    body.split_whitespace()
        .map(|w| w.trim_end_matches('.'))
        .find(|w| w.len() >= 4 && w.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or_else(|| panic!("no code in message: {body}"))
        .to_string()
}

pub struct TestApp {
    pub router: Router,
    pub shared: Arc<SharedState>,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_config() -> Config {
    let db_path = std::env::temp_dir().join(format!("mercadoboom-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}?mode=rwc", db_path.display());
    // Keep hashing cheap in tests.
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.payments.webhook_secret = Some("test-webhook-secret".to_string());
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let notifier = Arc::new(RecordingNotifier::default());
    let shared = Arc::new(
        SharedState::with_notifier(config, notifier.clone())
            .await
            .expect("Failed to create shared state"),
    );
    let state = mercadoboom::api::create_app_state(shared.clone(), None);
    let router = mercadoboom::api::router(state).await;

    TestApp {
        router,
        shared,
        notifier,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        api_key: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = api_key {
            builder = builder.header("X-Api-Key", key);
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, api_key: Option<&str>) -> (StatusCode, Value) {
        self.request("GET", uri, api_key, None).await
    }

    pub async fn post(&self, uri: &str, api_key: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, api_key, Some(body)).await
    }

    pub async fn put(&self, uri: &str, api_key: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("PUT", uri, api_key, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, api_key: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request("PATCH", uri, api_key, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, api_key: Option<&str>) -> (StatusCode, Value) {
        self.request("DELETE", uri, api_key, None).await
    }

    pub async fn webhook(&self, secret: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/payments/webhook")
            .header("Content-Type", "application/json")
            .header("X-Webhook-Secret", secret)
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Registers a customer and returns `(user_id, api_key)`.
    pub async fn register_customer(&self, name: &str, email: &str) -> (i32, String) {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({
                    "name": name,
                    "email": email,
                    "phone": "5512345678",
                    "password": "correct-horse-battery"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {body}");

        let id = i32::try_from(body["data"]["id"].as_i64().unwrap()).unwrap();
        let key = body["data"]["apiKey"].as_str().unwrap().to_string();
        (id, key)
    }

    /// Creates an active product through the admin API and returns its id.
    pub async fn create_product(&self, name: &str, price: &str, stock: i32) -> i64 {
        let (status, body) = self
            .post(
                "/api/admin/products",
                Some(ADMIN_KEY),
                json!({ "name": name, "price": price, "stock": stock }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "create product failed: {body}");
        body["data"]["id"].as_i64().unwrap()
    }

    /// Seeded gateways start disabled; turn one on by gateway name.
    pub async fn activate_gateway(&self, gateway: &str) {
        let (status, body) = self.get("/api/admin/payment-config", Some(ADMIN_KEY)).await;
        assert_eq!(status, StatusCode::OK);

        let id = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["gateway"] == gateway)
            .and_then(|c| c["id"].as_i64())
            .unwrap_or_else(|| panic!("gateway {gateway} not seeded"));

        let (status, body) = self
            .patch(
                &format!("/api/admin/payment-config/{id}"),
                Some(ADMIN_KEY),
                json!({ "isActive": true }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "activate gateway failed: {body}");
    }

    pub async fn set_discount(&self, percentage: &str, active: bool) {
        let (status, body) = self
            .put(
                "/api/admin/transfer-discount-config",
                Some(ADMIN_KEY),
                json!({ "discountPercentage": percentage, "isActive": active }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "discount update failed: {body}");
    }
}
