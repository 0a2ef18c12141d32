//! Public storefront data: products, banners, offers and payment methods.

use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::validation::validate_id;
use super::{ApiError, ApiResponse, AppState};
use crate::db::{Banner, Product, SpecialOffer};
use crate::services::admin_service::PaymentMethod;

/// GET /products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Product>>>, ApiError> {
    let products = state.admin_service().list_products(true).await?;
    Ok(Json(ApiResponse::success(products)))
}

/// GET /products/{id}
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let id = validate_id(id, "producto")?;
    let product = state.admin_service().get_product(id, false).await?;
    Ok(Json(ApiResponse::success(product)))
}

/// GET /banners
pub async fn list_banners(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Banner>>>, ApiError> {
    let banners = state.admin_service().list_banners(true).await?;
    Ok(Json(ApiResponse::success(banners)))
}

/// GET /special-offers
pub async fn list_offers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<SpecialOffer>>>, ApiError> {
    let offers = state.admin_service().list_offers(true).await?;
    Ok(Json(ApiResponse::success(offers)))
}

/// GET /payment-methods
pub async fn list_payment_methods(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<PaymentMethod>>>, ApiError> {
    let methods = state.admin_service().payment_methods().await?;
    Ok(Json(ApiResponse::success(methods)))
}
