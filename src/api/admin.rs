//! Admin panel endpoints. Every route here sits behind `admin_middleware`.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::validation::validate_id;
use super::{
    AdvanceStatusRequest, ApiError, ApiResponse, AppState, BlockUserRequest, MessageResponse,
    OrderListQuery, TicketStatusRequest, VerifyTransferRequest,
};
use crate::db::{Banner, DiscountConfig, Order, OrderFilter, Product, SpecialOffer, Ticket, User};
use crate::services::admin_service::{
    BannerRequest, CreatePaymentConfigRequest, DiscountConfigRequest, OfferRequest,
    PaymentConfigView, ProductRequest, UpdatePaymentConfigRequest,
};

// ============================================================================
// Transfers and orders
// ============================================================================

/// POST /admin/verify-transfer
pub async fn verify_transfer(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Json(payload): Json<VerifyTransferRequest>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order_id = validate_id(payload.order_id, "pedido")?;
    let order = state
        .order_service()
        .verify_transfer(admin.id, order_id, payload.verified, payload.notes)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// GET /admin/pending-transfers
pub async fn pending_transfers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Order>>>, ApiError> {
    let orders = state.order_service().list_pending_transfers().await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// GET /admin/orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<ApiResponse<Vec<Order>>>, ApiError> {
    let filter = OrderFilter {
        status: query.status,
        payment_status: query.payment_status,
        payment_type: query.payment_type,
    };
    let orders = state.order_service().list_orders(filter).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// POST /admin/orders/{id}/status
pub async fn advance_order_status(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<AdvanceStatusRequest>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let id = validate_id(id, "pedido")?;
    let order = state
        .order_service()
        .advance_status(admin.id, id, payload.status, payload.note)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

// ============================================================================
// Payment configuration
// ============================================================================

/// GET /admin/payment-config
pub async fn list_payment_configs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<PaymentConfigView>>>, ApiError> {
    let configs = state.admin_service().list_payment_configs().await?;
    Ok(Json(ApiResponse::success(configs)))
}

/// POST /admin/payment-config
pub async fn create_payment_config(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Json(payload): Json<CreatePaymentConfigRequest>,
) -> Result<Json<ApiResponse<PaymentConfigView>>, ApiError> {
    let config = state
        .admin_service()
        .create_payment_config(&admin, payload)
        .await?;
    Ok(Json(ApiResponse::success(config)))
}

/// PATCH /admin/payment-config/{id}
pub async fn update_payment_config(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdatePaymentConfigRequest>,
) -> Result<Json<ApiResponse<PaymentConfigView>>, ApiError> {
    let id = validate_id(id, "configuración")?;
    let config = state
        .admin_service()
        .update_payment_config(&admin, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(config)))
}

/// GET /admin/transfer-discount-config
pub async fn get_discount_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<DiscountConfig>>, ApiError> {
    let config = state.admin_service().discount_config().await?;
    Ok(Json(ApiResponse::success(config)))
}

/// PUT /admin/transfer-discount-config
pub async fn update_discount_config(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Json(payload): Json<DiscountConfigRequest>,
) -> Result<Json<ApiResponse<DiscountConfig>>, ApiError> {
    let config = state
        .admin_service()
        .update_discount_config(&admin, payload)
        .await?;
    Ok(Json(ApiResponse::success(config)))
}

// ============================================================================
// Catalog and promotions
// ============================================================================

/// GET /admin/products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Product>>>, ApiError> {
    let products = state.admin_service().list_products(false).await?;
    Ok(Json(ApiResponse::success(products)))
}

/// POST /admin/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProductRequest>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let product = state.admin_service().create_product(payload).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// PUT /admin/products/{id}
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<ProductRequest>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let id = validate_id(id, "producto")?;
    let product = state.admin_service().update_product(id, payload).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// GET /admin/banners
pub async fn list_banners(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Banner>>>, ApiError> {
    let banners = state.admin_service().list_banners(false).await?;
    Ok(Json(ApiResponse::success(banners)))
}

/// POST /admin/banners
pub async fn create_banner(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BannerRequest>,
) -> Result<Json<ApiResponse<Banner>>, ApiError> {
    let banner = state.admin_service().create_banner(payload).await?;
    Ok(Json(ApiResponse::success(banner)))
}

/// PUT /admin/banners/{id}
pub async fn update_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<BannerRequest>,
) -> Result<Json<ApiResponse<Banner>>, ApiError> {
    let id = validate_id(id, "banner")?;
    let banner = state.admin_service().update_banner(id, payload).await?;
    Ok(Json(ApiResponse::success(banner)))
}

/// DELETE /admin/banners/{id}
pub async fn delete_banner(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id, "banner")?;
    state.admin_service().delete_banner(id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Banner eliminado",
    ))))
}

/// GET /admin/special-offers
pub async fn list_offers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<SpecialOffer>>>, ApiError> {
    let offers = state.admin_service().list_offers(false).await?;
    Ok(Json(ApiResponse::success(offers)))
}

/// POST /admin/special-offers
pub async fn create_offer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OfferRequest>,
) -> Result<Json<ApiResponse<SpecialOffer>>, ApiError> {
    let offer = state.admin_service().create_offer(payload).await?;
    Ok(Json(ApiResponse::success(offer)))
}

/// PUT /admin/special-offers/{id}
pub async fn update_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<OfferRequest>,
) -> Result<Json<ApiResponse<SpecialOffer>>, ApiError> {
    let id = validate_id(id, "oferta")?;
    let offer = state.admin_service().update_offer(id, payload).await?;
    Ok(Json(ApiResponse::success(offer)))
}

/// DELETE /admin/special-offers/{id}
pub async fn delete_offer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id(id, "oferta")?;
    state.admin_service().delete_offer(id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Oferta eliminada",
    ))))
}

// ============================================================================
// Users and support
// ============================================================================

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<User>>>, ApiError> {
    let users = state.admin_service().list_users().await?;
    Ok(Json(ApiResponse::success(users)))
}

/// POST /admin/users/{id}/block
pub async fn block_user(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<BlockUserRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let id = validate_id(id, "usuario")?;
    let user = state
        .admin_service()
        .set_user_blocked(&admin, id, payload.blocked, payload.reason)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}

/// PATCH /admin/support/tickets/{id}/status
pub async fn update_ticket_status(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(payload): Json<TicketStatusRequest>,
) -> Result<Json<ApiResponse<Ticket>>, ApiError> {
    let id = validate_id(id, "ticket")?;
    let ticket = state
        .ticket_service()
        .update_status(admin.id, id, payload.status)
        .await?;
    Ok(Json(ApiResponse::success(ticket)))
}
