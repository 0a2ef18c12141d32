//! Domain service for orders, payments and the direct-transfer workflow.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{DiscountConfig, Order, OrderFilter, Store, User};
use crate::domain::order::TransitionError;
use crate::domain::{
    OrderStatus, PaymentGateway, PaymentStatus, PaymentType, ShippingAddress, TransferQuote,
};
use crate::services::security_service::SecurityError;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("El producto no está disponible")]
    ProductUnavailable,

    #[error("No hay suficiente inventario (disponible: {available})")]
    InsufficientStock { available: i32 },

    #[error("Los pagos por transferencia requieren originalAmount y discountApplied")]
    MissingAmountFields,

    #[error("Los montos no coinciden con la cotización vigente")]
    QuoteMismatch { expected: TransferQuote },

    #[error("El pago del pedido está en estado {0} y no admite esta operación")]
    InvalidTransferState(PaymentStatus),

    #[error("Transición inválida: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("El pedido fue modificado por otra operación, vuelve a intentarlo")]
    Conflict,

    #[error("Pedido no encontrado")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrderError {
    #[must_use]
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::ProductUnavailable => Some("PRODUCT_UNAVAILABLE"),
            Self::InsufficientStock { .. } => Some("INSUFFICIENT_STOCK"),
            Self::MissingAmountFields => Some("MISSING_AMOUNT_FIELDS"),
            Self::QuoteMismatch { .. } => Some("QUOTE_MISMATCH"),
            Self::InvalidTransferState(_) => Some("INVALID_TRANSFER_STATE"),
            Self::InvalidTransition(_) | Self::Conflict => Some("STATE_CONFLICT"),
            Self::Security(e) => e.code(),
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for OrderError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for OrderError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub product_id: i32,
    pub quantity: i32,
    pub payment_type: PaymentType,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    /// Required for `direct_transfer`: the amounts the customer was shown.
    #[serde(default)]
    pub original_amount: Option<Decimal>,
    #[serde(default)]
    pub discount_applied: Option<Decimal>,
}

/// Configuration records read fresh for one checkout request.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    pub discount: DiscountConfig,
    pub active_gateways: Vec<PaymentGateway>,
}

impl CheckoutConfig {
    pub async fn load(store: &Store) -> anyhow::Result<Self> {
        let discount = store.discount().get().await?;
        let active_gateways = store
            .payment_configs()
            .list(true)
            .await?
            .into_iter()
            .map(|c| c.gateway)
            .collect();

        Ok(Self {
            discount,
            active_gateways,
        })
    }

    #[must_use]
    pub fn accepts(&self, payment_type: PaymentType) -> bool {
        self.active_gateways
            .iter()
            .any(|g| g.payment_type() == payment_type)
    }

    /// Transfer price breakdown for `subtotal` under this configuration.
    #[must_use]
    pub fn quote(&self, subtotal: Decimal) -> Option<TransferQuote> {
        TransferQuote::compute(subtotal, self.discount.effective_percentage())
    }
}

/// Price the customer would pay by bank transfer right now.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferQuoteView {
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(flatten)]
    pub quote: TransferQuote,
    pub discount_active: bool,
    pub message: Option<String>,
}

/// Payment update reported by a gateway callback.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayNotification {
    pub order_number: String,
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_reference: Option<String>,
}

#[async_trait::async_trait]
pub trait OrderService: Send + Sync {
    /// Quote for paying `quantity` units of a product by transfer.
    async fn transfer_quote(
        &self,
        checkout: &CheckoutConfig,
        product_id: i32,
        quantity: i32,
    ) -> Result<TransferQuoteView, OrderError>;

    /// Creates an order, reserving stock.
    ///
    /// # Errors
    ///
    /// Direct-transfer orders fail with [`OrderError::MissingAmountFields`]
    /// or [`OrderError::QuoteMismatch`] when the client amounts are absent or
    /// stale. Totals over the high-value threshold need a fresh
    /// `high_value_order` grant.
    async fn create_order(
        &self,
        checkout: &CheckoutConfig,
        user: &User,
        request: CreateOrderRequest,
    ) -> Result<Order, OrderError>;

    /// Customers only see their own orders; admins see all.
    async fn get_order(&self, user: &User, order_id: i32) -> Result<Order, OrderError>;

    async fn list_orders_for_user(&self, user_id: i32) -> Result<Vec<Order>, OrderError>;

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, OrderError>;

    /// Direct-transfer orders whose receipt awaits review, oldest first.
    async fn list_pending_transfers(&self) -> Result<Vec<Order>, OrderError>;

    /// `pending → pending_verification` with the uploaded receipt.
    async fn submit_transfer_receipt(
        &self,
        user: &User,
        order_id: i32,
        receipt_url: &str,
    ) -> Result<Order, OrderError>;

    /// Admin decision on a transfer receipt. Irreversible.
    ///
    /// # Errors
    ///
    /// [`OrderError::InvalidTransferState`] unless the order is in
    /// `pending_verification`; [`OrderError::Conflict`] if a concurrent
    /// review won.
    async fn verify_transfer(
        &self,
        admin_id: i32,
        order_id: i32,
        verified: bool,
        notes: Option<String>,
    ) -> Result<Order, OrderError>;

    /// Applies a gateway webhook. Replays of the current status are no-ops.
    async fn apply_gateway_notification(
        &self,
        notification: GatewayNotification,
    ) -> Result<Order, OrderError>;

    /// Moves fulfillment to the next stage. Skips and moves back are refused.
    async fn advance_status(
        &self,
        admin_id: i32,
        order_id: i32,
        next: OrderStatus,
        note: Option<String>,
    ) -> Result<Order, OrderError>;
}
