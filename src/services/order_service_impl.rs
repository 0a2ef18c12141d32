//! `SeaORM` implementation of the `OrderService` trait.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::db::{NewOrder, Order, OrderFilter, Product, Store, Transition, User};
use crate::domain::{
    OrderStatus, PaymentStatus, PaymentType, SensitiveAction, StatusHistoryEntry, TransferQuote,
    round_money,
};
use crate::services::order_service::{
    CheckoutConfig, CreateOrderRequest, GatewayNotification, OrderError, OrderService,
    TransferQuoteView,
};
use crate::services::security_service::SecurityService;

const MAX_QUANTITY: i32 = 100;

pub struct SeaOrmOrderService {
    store: Store,
    config: Arc<RwLock<Config>>,
    security: Arc<dyn SecurityService>,
}

impl SeaOrmOrderService {
    #[must_use]
    pub fn new(
        store: Store,
        config: Arc<RwLock<Config>>,
        security: Arc<dyn SecurityService>,
    ) -> Self {
        Self {
            store,
            config,
            security,
        }
    }

    async fn available_product(
        &self,
        product_id: i32,
        quantity: i32,
    ) -> Result<Product, OrderError> {
        if !(1..=MAX_QUANTITY).contains(&quantity) {
            return Err(OrderError::Validation(format!(
                "La cantidad debe estar entre 1 y {MAX_QUANTITY}"
            )));
        }

        let product = self
            .store
            .products()
            .get(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(OrderError::ProductUnavailable)?;

        if product.stock < quantity {
            return Err(OrderError::InsufficientStock {
                available: product.stock,
            });
        }

        Ok(product)
    }
}

fn transfer_quote_for(
    checkout: &CheckoutConfig,
    subtotal: Decimal,
) -> Result<TransferQuote, OrderError> {
    checkout.quote(subtotal).ok_or_else(|| {
        OrderError::Internal("Stored transfer discount is out of range".to_string())
    })
}

fn settle(outcome: Transition<OrderError>) -> Result<Order, OrderError> {
    match outcome {
        Transition::Applied(order) => Ok(order),
        Transition::NotFound => Err(OrderError::NotFound),
        Transition::Rejected(e) => Err(e),
        Transition::Conflict => Err(OrderError::Conflict),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl OrderService for SeaOrmOrderService {
    async fn transfer_quote(
        &self,
        checkout: &CheckoutConfig,
        product_id: i32,
        quantity: i32,
    ) -> Result<TransferQuoteView, OrderError> {
        let product = self.available_product(product_id, quantity).await?;
        let subtotal = round_money(product.price * Decimal::from(quantity));

        Ok(TransferQuoteView {
            product_id,
            quantity,
            unit_price: product.price,
            quote: transfer_quote_for(checkout, subtotal)?,
            discount_active: checkout.discount.is_active,
            message: checkout.discount.message.clone(),
        })
    }

    async fn create_order(
        &self,
        checkout: &CheckoutConfig,
        user: &User,
        request: CreateOrderRequest,
    ) -> Result<Order, OrderError> {
        let product = self
            .available_product(request.product_id, request.quantity)
            .await?;

        if let Some(address) = &request.shipping_address
            && let Some(field) = address.missing_field()
        {
            return Err(OrderError::Validation(format!(
                "Falta el campo {field} de la dirección de envío"
            )));
        }

        if !checkout.accepts(request.payment_type) {
            return Err(OrderError::Validation(
                "El método de pago seleccionado no está disponible".to_string(),
            ));
        }

        let subtotal = round_money(product.price * Decimal::from(request.quantity));

        let (total_amount, quote) = if request.payment_type == PaymentType::DirectTransfer {
            let (Some(original), Some(discount)) =
                (request.original_amount, request.discount_applied)
            else {
                return Err(OrderError::MissingAmountFields);
            };

            let quote = transfer_quote_for(checkout, subtotal)?;
            if !quote.matches(original, discount) {
                return Err(OrderError::QuoteMismatch { expected: quote });
            }
            (quote.total_amount, Some(quote))
        } else {
            (subtotal, None)
        };

        let (threshold, prefix) = {
            let config = self.config.read().await;
            (
                config.storefront.high_value_threshold,
                config.storefront.order_number_prefix.clone(),
            )
        };
        if total_amount >= threshold {
            self.security
                .ensure_verified(user, SensitiveAction::HighValueOrder)
                .await?;
        }

        let created = self
            .store
            .orders()
            .create(NewOrder {
                number_prefix: prefix,
                user_id: user.id,
                product_id: product.id,
                quantity: request.quantity,
                unit_price: product.price,
                total_amount,
                quote,
                payment_type: request.payment_type,
                shipping_address: request.shipping_address,
            })
            .await?;

        let Some(order) = created else {
            // Stock ran out between the check and the reservation.
            let available = self
                .store
                .products()
                .get(product.id)
                .await?
                .map_or(0, |p| p.stock);
            return Err(OrderError::InsufficientStock { available });
        };

        metrics::counter!("orders_created_total", "payment_type" => order.payment_type.as_str())
            .increment(1);
        info!(
            order_id = order.id,
            order_number = %order.order_number,
            user_id = user.id,
            total = %order.total_amount,
            "Order created"
        );

        Ok(order)
    }

    async fn get_order(&self, user: &User, order_id: i32) -> Result<Order, OrderError> {
        self.store
            .orders()
            .get(order_id)
            .await?
            .filter(|o| user.is_admin() || o.user_id == user.id)
            .ok_or(OrderError::NotFound)
    }

    async fn list_orders_for_user(&self, user_id: i32) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.orders().list_for_user(user_id).await?)
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.orders().list(filter).await?)
    }

    async fn list_pending_transfers(&self) -> Result<Vec<Order>, OrderError> {
        let mut orders = self
            .store
            .orders()
            .list(OrderFilter {
                payment_status: Some(PaymentStatus::PendingVerification),
                payment_type: Some(PaymentType::DirectTransfer),
                ..OrderFilter::default()
            })
            .await?;
        orders.sort_by_key(|o| o.id);
        Ok(orders)
    }

    async fn submit_transfer_receipt(
        &self,
        user: &User,
        order_id: i32,
        receipt_url: &str,
    ) -> Result<Order, OrderError> {
        let receipt_url = receipt_url.trim().to_string();
        if !(receipt_url.starts_with("https://") || receipt_url.starts_with("http://")) {
            return Err(OrderError::Validation(
                "El comprobante debe ser una URL http(s)".to_string(),
            ));
        }

        let user_id = user.id;
        let outcome = self
            .store
            .orders()
            .transition(order_id, |order| {
                if order.user_id != user_id {
                    return Err(OrderError::NotFound);
                }
                if order.payment_type != PaymentType::DirectTransfer {
                    return Err(OrderError::InvalidTransferState(order.payment_status));
                }

                let next = order
                    .payment_status
                    .submit_receipt()
                    .map_err(|_| OrderError::InvalidTransferState(order.payment_status))?;

                order.payment_status = next;
                order.transfer_receipt_url = Some(receipt_url);
                order.status_history.push(
                    StatusHistoryEntry::now(order.status, Some(next))
                        .by(user_id)
                        .with_note(Some("Comprobante de transferencia recibido".to_string())),
                );
                Ok(())
            })
            .await?;

        let order = settle(outcome)?;
        info!(order_id, "Transfer receipt submitted");
        Ok(order)
    }

    async fn verify_transfer(
        &self,
        admin_id: i32,
        order_id: i32,
        verified: bool,
        notes: Option<String>,
    ) -> Result<Order, OrderError> {
        let notes = non_blank(notes);
        let now = Utc::now().to_rfc3339();

        let outcome = self
            .store
            .orders()
            .transition(order_id, |order| {
                if order.payment_type != PaymentType::DirectTransfer {
                    return Err(OrderError::InvalidTransferState(order.payment_status));
                }

                let next = order
                    .payment_status
                    .review_transfer(verified)
                    .map_err(|_| OrderError::InvalidTransferState(order.payment_status))?;

                order.payment_status = next;
                order.transfer_notes.clone_from(&notes);
                if verified {
                    order.transfer_verified_at = Some(now);
                    order.transfer_verified_by = Some(admin_id);
                    if order.status == OrderStatus::Pendiente {
                        order.status = order.status.advance_to(OrderStatus::Pagado, next)?;
                    }
                }
                order.status_history.push(
                    StatusHistoryEntry::now(order.status, Some(next))
                        .by(admin_id)
                        .with_note(notes),
                );
                Ok(())
            })
            .await?;

        let order = settle(outcome)?;

        let result = if verified { "verified" } else { "rejected" };
        metrics::counter!("transfers_reviewed_total", "result" => result).increment(1);
        info!(order_id, admin_id, result, "Transfer reviewed");

        Ok(order)
    }

    async fn apply_gateway_notification(
        &self,
        notification: GatewayNotification,
    ) -> Result<Order, OrderError> {
        let order = self
            .store
            .orders()
            .get_by_number(&notification.order_number)
            .await?
            .ok_or(OrderError::NotFound)?;

        let requested = notification.payment_status;
        let reference = non_blank(notification.payment_reference);

        let outcome = self
            .store
            .orders()
            .transition(order.id, |order| {
                if !order.payment_type.is_gateway() {
                    return Err(OrderError::InvalidTransferState(order.payment_status));
                }

                let Some(next) = order.payment_status.gateway_transition(requested)? else {
                    return Ok(());
                };

                order.payment_status = next;
                if reference.is_some() {
                    order.payment_reference = reference;
                }
                if next == PaymentStatus::Approved && order.status == OrderStatus::Pendiente {
                    order.status = order.status.advance_to(OrderStatus::Pagado, next)?;
                }
                order
                    .status_history
                    .push(StatusHistoryEntry::now(order.status, Some(next)));
                Ok(())
            })
            .await?;

        let order = settle(outcome)?;
        info!(
            order_id = order.id,
            payment_status = %order.payment_status,
            "Gateway notification applied"
        );
        Ok(order)
    }

    async fn advance_status(
        &self,
        admin_id: i32,
        order_id: i32,
        next: OrderStatus,
        note: Option<String>,
    ) -> Result<Order, OrderError> {
        let outcome = self
            .store
            .orders()
            .transition(order_id, |order| -> Result<(), OrderError> {
                order.status = order.status.advance_to(next, order.payment_status)?;
                order.status_history.push(
                    StatusHistoryEntry::now(order.status, None)
                        .by(admin_id)
                        .with_note(note),
                );
                Ok(())
            })
            .await?;

        let order = settle(outcome)?;
        info!(order_id, admin_id, status = %order.status, "Order status advanced");
        Ok(order)
    }
}
