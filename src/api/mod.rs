use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, patch, post, put},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::services::{AdminService, AuthService, OrderService, SecurityService, TicketService};
use crate::state::SharedState;

mod admin;
pub mod auth;
mod catalog;
mod error;
mod observability;
mod orders;
mod password_reset;
mod security;
mod support;
mod types;
mod validation;

pub use auth::CurrentUser;
pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn security_service(&self) -> &Arc<dyn SecurityService> {
        &self.shared.security_service
    }

    #[must_use]
    pub fn auth_service(&self) -> &Arc<dyn AuthService> {
        &self.shared.auth_service
    }

    #[must_use]
    pub fn order_service(&self) -> &Arc<dyn OrderService> {
        &self.shared.order_service
    }

    #[must_use]
    pub fn ticket_service(&self) -> &Arc<dyn TicketService> {
        &self.shared.ticket_service
    }

    #[must_use]
    pub fn admin_service(&self) -> &Arc<dyn AdminService> {
        &self.shared.admin_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, secure_cookies, session_minutes) = {
        let config = state.config().read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.secure_cookies,
            config.server.session_minutes,
        )
    };

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            session_minutes,
        )));

    let api_router = Router::new()
        .merge(create_admin_router(state.clone()))
        .merge(create_protected_router(state.clone()))
        .merge(create_public_router())
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(
            observability::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
}

fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/password-reset/request", post(password_reset::request_reset))
        .route("/password-reset/confirm", post(password_reset::confirm_reset))
        .route("/products", get(catalog::list_products))
        .route("/products/{id}", get(catalog::get_product))
        .route("/banners", get(catalog::list_banners))
        .route("/special-offers", get(catalog::list_offers))
        .route("/payment-methods", get(catalog::list_payment_methods))
        .route("/checkout/transfer-quote", get(orders::transfer_quote))
        .route("/payments/webhook", post(orders::payment_webhook))
        .route("/health", get(observability::health))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/password", put(auth::change_password))
        .route("/auth/api-key/regenerate", post(auth::regenerate_api_key))
        .route("/profile", put(auth::update_profile))
        .route("/security/settings", get(security::get_settings))
        .route("/security/send-code", post(security::send_code))
        .route("/security/verify-code", post(security::verify_code))
        .route("/security/update-2fa", post(security::update_two_factor))
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route("/orders/{id}", get(orders::get_order))
        .route(
            "/orders/{id}/transfer-receipt",
            post(orders::submit_transfer_receipt),
        )
        .route(
            "/support/tickets",
            get(support::list_tickets).post(support::create_ticket),
        )
        .route("/support/tickets/{id}", get(support::get_ticket))
        .route("/support/tickets/{id}/messages", post(support::post_message))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

// Layers run last-added first: authentication before the admin gate.
fn create_admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/verify-transfer", post(admin::verify_transfer))
        .route("/admin/pending-transfers", get(admin::pending_transfers))
        .route("/admin/orders", get(admin::list_orders))
        .route("/admin/orders/{id}/status", post(admin::advance_order_status))
        .route(
            "/admin/payment-config",
            get(admin::list_payment_configs).post(admin::create_payment_config),
        )
        .route(
            "/admin/payment-config/{id}",
            patch(admin::update_payment_config),
        )
        .route(
            "/admin/transfer-discount-config",
            get(admin::get_discount_config).put(admin::update_discount_config),
        )
        .route(
            "/admin/products",
            get(admin::list_products).post(admin::create_product),
        )
        .route("/admin/products/{id}", put(admin::update_product))
        .route(
            "/admin/banners",
            get(admin::list_banners).post(admin::create_banner),
        )
        .route(
            "/admin/banners/{id}",
            put(admin::update_banner).delete(admin::delete_banner),
        )
        .route(
            "/admin/special-offers",
            get(admin::list_offers).post(admin::create_offer),
        )
        .route(
            "/admin/special-offers/{id}",
            put(admin::update_offer).delete(admin::delete_offer),
        )
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/{id}/block", post(admin::block_user))
        .route(
            "/admin/support/tickets/{id}/status",
            patch(admin::update_ticket_status),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::admin_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}
