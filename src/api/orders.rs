use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState, TransferQuoteQuery, TransferReceiptRequest};
use crate::db::Order;
use crate::services::{CheckoutConfig, CreateOrderRequest, GatewayNotification, TransferQuoteView};

const WEBHOOK_SECRET_HEADER: &str = "X-Webhook-Secret";

async fn checkout_config(state: &AppState) -> Result<CheckoutConfig, ApiError> {
    Ok(CheckoutConfig::load(state.store()).await?)
}

/// GET /checkout/transfer-quote
pub async fn transfer_quote(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TransferQuoteQuery>,
) -> Result<Json<ApiResponse<TransferQuoteView>>, ApiError> {
    let product_id = validate_id(query.product_id, "producto")?;
    let checkout = checkout_config(&state).await?;

    let quote = state
        .order_service()
        .transfer_quote(&checkout, product_id, query.quantity)
        .await?;
    Ok(Json(ApiResponse::success(quote)))
}

/// GET /orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<Order>>>, ApiError> {
    let orders = state.order_service().list_orders_for_user(user.id).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// POST /orders
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    validate_id(payload.product_id, "producto")?;
    let checkout = checkout_config(&state).await?;

    let order = state
        .order_service()
        .create_order(&checkout, &user, payload)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// GET /orders/{id}
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let id = validate_id(id, "pedido")?;
    let order = state.order_service().get_order(&user, id).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// POST /orders/{id}/transfer-receipt
pub async fn submit_transfer_receipt(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<TransferReceiptRequest>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let id = validate_id(id, "pedido")?;
    let order = state
        .order_service()
        .submit_transfer_receipt(&user, id, &payload.receipt_url)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// POST /payments/webhook
///
/// Authenticated by the shared secret in `X-Webhook-Secret`; refused
/// outright when no secret is configured.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<GatewayNotification>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let expected = state.config().read().await.payments.webhook_secret.clone();
    let provided = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok());

    match (expected.as_deref(), provided) {
        (Some(expected), Some(provided)) if !expected.is_empty() && expected == provided => {}
        _ => {
            tracing::warn!(order_number = %payload.order_number, "Rejected payment webhook");
            return Err(ApiError::unauthorized("Firma de webhook inválida"));
        }
    }

    let order = state
        .order_service()
        .apply_gateway_notification(payload)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}
