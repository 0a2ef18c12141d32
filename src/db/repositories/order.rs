use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use serde::Serialize;
use tracing::warn;

use crate::domain::{
    OrderStatus, PaymentStatus, PaymentType, ShippingAddress, StatusHistoryEntry, TransferQuote,
    parse_money, round_money,
};
use crate::entities::{orders, products};

use super::reference_number;

const NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i32,
    pub order_number: String,
    pub user_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub original_amount: Option<Decimal>,
    pub discount_applied: Option<Decimal>,
    pub discount_percentage: Option<Decimal>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_type: PaymentType,
    pub payment_reference: Option<String>,
    pub transfer_receipt_url: Option<String>,
    pub transfer_verified_at: Option<String>,
    pub transfer_verified_by: Option<i32>,
    pub transfer_notes: Option<String>,
    pub status_history: Vec<StatusHistoryEntry>,
    pub shipping_address: Option<ShippingAddress>,
    pub version: i32,
    pub created_at: String,
    pub updated_at: String,
}

fn optional_money(raw: Option<&str>) -> Result<Option<Decimal>> {
    raw.map(parse_money).transpose().map_err(Into::into)
}

impl TryFrom<orders::Model> for Order {
    type Error = anyhow::Error;

    fn try_from(model: orders::Model) -> Result<Self> {
        let id = model.id;
        let corrupt = |field: &str| format!("Corrupt {field} on order {id}");

        Ok(Self {
            unit_price: parse_money(&model.unit_price).with_context(|| corrupt("unit_price"))?,
            total_amount: parse_money(&model.total_amount)
                .with_context(|| corrupt("total_amount"))?,
            original_amount: optional_money(model.original_amount.as_deref())
                .with_context(|| corrupt("original_amount"))?,
            discount_applied: optional_money(model.discount_applied.as_deref())
                .with_context(|| corrupt("discount_applied"))?,
            discount_percentage: optional_money(model.discount_percentage.as_deref())
                .with_context(|| corrupt("discount_percentage"))?,
            status: model.status.parse().with_context(|| corrupt("status"))?,
            payment_status: model
                .payment_status
                .parse()
                .with_context(|| corrupt("payment_status"))?,
            payment_type: model
                .payment_type
                .parse()
                .with_context(|| corrupt("payment_type"))?,
            status_history: serde_json::from_str(&model.status_history)
                .with_context(|| corrupt("status_history"))?,
            shipping_address: model
                .shipping_address
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .with_context(|| corrupt("shipping_address"))?,
            id,
            order_number: model.order_number,
            user_id: model.user_id,
            product_id: model.product_id,
            quantity: model.quantity,
            payment_reference: model.payment_reference,
            transfer_receipt_url: model.transfer_receipt_url,
            transfer_verified_at: model.transfer_verified_at,
            transfer_verified_by: model.transfer_verified_by,
            transfer_notes: model.transfer_notes,
            version: model.version,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub number_prefix: String,
    pub user_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    /// Present for direct-transfer orders only.
    pub quote: Option<TransferQuote>,
    pub payment_type: PaymentType,
    pub shipping_address: Option<ShippingAddress>,
}

/// Outcome of a guarded state change on one order.
#[derive(Debug)]
pub enum Transition<E> {
    Applied(Order),
    NotFound,
    Rejected(E),
    /// Someone else changed the order between our read and our write.
    Conflict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_type: Option<PaymentType>,
}

pub struct OrderRepository {
    conn: DatabaseConnection,
}

impl OrderRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Reserves stock and inserts the order in one transaction.
    ///
    /// Returns `None` when the product no longer has enough active stock.
    pub async fn create(&self, new: NewOrder) -> Result<Option<Order>> {
        let txn = self.conn.begin().await?;

        // The stock write comes first so SQLite takes the write lock up front.
        let reserved = products::Entity::update_many()
            .col_expr(
                products::Column::Stock,
                Expr::col(products::Column::Stock).sub(new.quantity),
            )
            .filter(products::Column::Id.eq(new.product_id))
            .filter(products::Column::IsActive.eq(true))
            .filter(products::Column::Stock.gte(new.quantity))
            .exec(&txn)
            .await
            .context("Failed to reserve stock")?;

        if reserved.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let history = vec![
            StatusHistoryEntry::now(OrderStatus::Pendiente, Some(PaymentStatus::Pending))
                .by(new.user_id),
        ];
        let history = serde_json::to_string(&history)?;
        let shipping = new
            .shipping_address
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = chrono::Utc::now().to_rfc3339();

        let mut attempt = 0;
        let model = loop {
            attempt += 1;
            let active = orders::ActiveModel {
                order_number: Set(reference_number(&new.number_prefix)),
                user_id: Set(new.user_id),
                product_id: Set(new.product_id),
                quantity: Set(new.quantity),
                unit_price: Set(round_money(new.unit_price).to_string()),
                total_amount: Set(round_money(new.total_amount).to_string()),
                original_amount: Set(new.quote.map(|q| q.original_amount.to_string())),
                discount_applied: Set(new.quote.map(|q| q.discount_applied.to_string())),
                discount_percentage: Set(new.quote.map(|q| q.discount_percentage.to_string())),
                status: Set(OrderStatus::Pendiente.as_str().to_string()),
                payment_status: Set(PaymentStatus::Pending.as_str().to_string()),
                payment_type: Set(new.payment_type.as_str().to_string()),
                payment_reference: Set(None),
                transfer_receipt_url: Set(None),
                transfer_verified_at: Set(None),
                transfer_verified_by: Set(None),
                transfer_notes: Set(None),
                status_history: Set(history.clone()),
                shipping_address: Set(shipping.clone()),
                version: Set(0),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            };

            match active.insert(&txn).await {
                Ok(model) => break model,
                Err(e)
                    if attempt < NUMBER_ATTEMPTS
                        && matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    warn!("Order number collision, retrying");
                }
                Err(e) => return Err(e).context("Failed to insert order"),
            }
        };

        txn.commit().await?;
        Ok(Some(Order::try_from(model)?))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Order>> {
        let row = orders::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query order")?;

        row.map(Order::try_from).transpose()
    }

    pub async fn get_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        let row = orders::Entity::find()
            .filter(orders::Column::OrderNumber.eq(order_number))
            .one(&self.conn)
            .await
            .context("Failed to query order by number")?;

        row.map(Order::try_from).transpose()
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<Order>> {
        let rows = orders::Entity::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list orders for user")?;

        rows.into_iter().map(Order::try_from).collect()
    }

    pub async fn list(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let mut query = orders::Entity::find().order_by_desc(orders::Column::Id);

        if let Some(status) = filter.status {
            query = query.filter(orders::Column::Status.eq(status.as_str()));
        }
        if let Some(payment_status) = filter.payment_status {
            query = query.filter(orders::Column::PaymentStatus.eq(payment_status.as_str()));
        }
        if let Some(payment_type) = filter.payment_type {
            query = query.filter(orders::Column::PaymentType.eq(payment_type.as_str()));
        }

        let rows = query.all(&self.conn).await.context("Failed to list orders")?;
        rows.into_iter().map(Order::try_from).collect()
    }

    /// Reads the order, lets `apply` mutate a copy, then writes it back only if
    /// `version` and `payment_status` still match what was read.
    ///
    /// Only the lifecycle fields are written; amounts and identity are frozen.
    /// Moving the payment to `rejected` or `cancelled` restocks the product in
    /// the same transaction.
    pub async fn transition<E>(
        &self,
        id: i32,
        apply: impl FnOnce(&mut Order) -> Result<(), E>,
    ) -> Result<Transition<E>> {
        let Some(current) = self.get(id).await? else {
            return Ok(Transition::NotFound);
        };

        let mut next = current.clone();
        if let Err(e) = apply(&mut next) {
            return Ok(Transition::Rejected(e));
        }
        if next == current {
            return Ok(Transition::Applied(current));
        }

        let history = serde_json::to_string(&next.status_history)?;
        let now = chrono::Utc::now().to_rfc3339();

        let txn = self.conn.begin().await?;

        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(next.status.as_str()))
            .col_expr(
                orders::Column::PaymentStatus,
                Expr::value(next.payment_status.as_str()),
            )
            .col_expr(
                orders::Column::PaymentReference,
                Expr::value(next.payment_reference.clone()),
            )
            .col_expr(
                orders::Column::TransferReceiptUrl,
                Expr::value(next.transfer_receipt_url.clone()),
            )
            .col_expr(
                orders::Column::TransferVerifiedAt,
                Expr::value(next.transfer_verified_at.clone()),
            )
            .col_expr(
                orders::Column::TransferVerifiedBy,
                Expr::value(next.transfer_verified_by),
            )
            .col_expr(
                orders::Column::TransferNotes,
                Expr::value(next.transfer_notes.clone()),
            )
            .col_expr(orders::Column::StatusHistory, Expr::value(history))
            .col_expr(orders::Column::Version, Expr::value(current.version + 1))
            .col_expr(orders::Column::UpdatedAt, Expr::value(now))
            .filter(orders::Column::Id.eq(id))
            .filter(orders::Column::Version.eq(current.version))
            .filter(orders::Column::PaymentStatus.eq(current.payment_status.as_str()))
            .exec(&txn)
            .await
            .context("Failed to update order")?;

        if result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(Transition::Conflict);
        }

        // A failed payment hands its reserved units back.
        if next.payment_status.releases_stock() && !current.payment_status.releases_stock() {
            products::Entity::update_many()
                .col_expr(
                    products::Column::Stock,
                    Expr::col(products::Column::Stock).add(current.quantity),
                )
                .filter(products::Column::Id.eq(current.product_id))
                .exec(&txn)
                .await
                .context("Failed to release reserved stock")?;
        }

        txn.commit().await?;

        match self.get(id).await? {
            Some(order) => Ok(Transition::Applied(order)),
            None => Ok(Transition::NotFound),
        }
    }
}
