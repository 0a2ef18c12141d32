use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;

use crate::domain::{parse_money, round_money};
use crate::entities::products;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<products::Model> for Product {
    type Error = anyhow::Error;

    fn try_from(model: products::Model) -> Result<Self> {
        Ok(Self {
            price: parse_money(&model.price)
                .with_context(|| format!("Corrupt price for product {}", model.id))?,
            id: model.id,
            name: model.name,
            description: model.description,
            stock: model.stock,
            category: model.category,
            image_url: model.image_url,
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Writable product fields, used for both create and update.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
}

pub struct ProductRepository {
    conn: DatabaseConnection,
}

impl ProductRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i32) -> Result<Option<Product>> {
        let row = products::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query product")?;

        row.map(Product::try_from).transpose()
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<Product>> {
        let mut query = products::Entity::find().order_by_asc(products::Column::Id);
        if active_only {
            query = query.filter(products::Column::IsActive.eq(true));
        }

        let rows = query.all(&self.conn).await.context("Failed to list products")?;
        rows.into_iter().map(Product::try_from).collect()
    }

    pub async fn create(&self, input: ProductInput) -> Result<Product> {
        let now = chrono::Utc::now().to_rfc3339();
        let active = products::ActiveModel {
            name: Set(input.name),
            description: Set(input.description),
            price: Set(round_money(input.price).to_string()),
            stock: Set(input.stock),
            category: Set(input.category),
            image_url: Set(input.image_url),
            is_active: Set(input.is_active),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert product")?;
        Product::try_from(model)
    }

    /// Replaces the writable fields. Returns `None` if the product does not exist.
    pub async fn update(&self, id: i32, input: ProductInput) -> Result<Option<Product>> {
        let Some(row) = products::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: products::ActiveModel = row.into();
        active.name = Set(input.name);
        active.description = Set(input.description);
        active.price = Set(round_money(input.price).to_string());
        active.stock = Set(input.stock);
        active.category = Set(input.category);
        active.image_url = Set(input.image_url);
        active.is_active = Set(input.is_active);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update product")?;
        Ok(Some(Product::try_from(model)?))
    }
}
