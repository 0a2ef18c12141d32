use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use serde::Serialize;

use crate::domain::{parse_money, round_money};
use crate::entities::{banners, special_offers};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    pub id: i32,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<banners::Model> for Banner {
    fn from(model: banners::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            subtitle: model.subtitle,
            image_url: model.image_url,
            link_url: model.link_url,
            display_order: model.display_order,
            is_active: model.is_active,
            start_date: model.start_date,
            end_date: model.end_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialOffer {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub product_id: Option<i32>,
    pub discount_percentage: Option<Decimal>,
    pub display_order: i32,
    pub is_active: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<special_offers::Model> for SpecialOffer {
    type Error = anyhow::Error;

    fn try_from(model: special_offers::Model) -> Result<Self> {
        Ok(Self {
            discount_percentage: model
                .discount_percentage
                .as_deref()
                .map(parse_money)
                .transpose()
                .with_context(|| format!("Corrupt discount on offer {}", model.id))?,
            id: model.id,
            title: model.title,
            description: model.description,
            image_url: model.image_url,
            product_id: model.product_id,
            display_order: model.display_order,
            is_active: model.is_active,
            start_date: model.start_date,
            end_date: model.end_date,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BannerInput {
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub link_url: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct OfferInput {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub product_id: Option<i32>,
    pub discount_percentage: Option<Decimal>,
    pub display_order: i32,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

fn date_column(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(|d| d.to_rfc3339())
}

pub struct PromotionRepository {
    conn: DatabaseConnection,
}

impl PromotionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list_banners(&self, active_only: bool) -> Result<Vec<Banner>> {
        let mut query = banners::Entity::find()
            .order_by_asc(banners::Column::DisplayOrder)
            .order_by_asc(banners::Column::Id);
        if active_only {
            query = query.filter(banners::Column::IsActive.eq(true));
        }

        let rows = query.all(&self.conn).await.context("Failed to list banners")?;
        Ok(rows.into_iter().map(Banner::from).collect())
    }

    pub async fn create_banner(&self, input: BannerInput) -> Result<Banner> {
        let now = Utc::now().to_rfc3339();
        let model = banners::ActiveModel {
            title: Set(input.title),
            subtitle: Set(input.subtitle),
            image_url: Set(input.image_url),
            link_url: Set(input.link_url),
            display_order: Set(input.display_order),
            is_active: Set(input.is_active),
            start_date: Set(date_column(input.start_date)),
            end_date: Set(date_column(input.end_date)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert banner")?;

        Ok(Banner::from(model))
    }

    pub async fn update_banner(&self, id: i32, input: BannerInput) -> Result<Option<Banner>> {
        let Some(row) = banners::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: banners::ActiveModel = row.into();
        active.title = Set(input.title);
        active.subtitle = Set(input.subtitle);
        active.image_url = Set(input.image_url);
        active.link_url = Set(input.link_url);
        active.display_order = Set(input.display_order);
        active.is_active = Set(input.is_active);
        active.start_date = Set(date_column(input.start_date));
        active.end_date = Set(date_column(input.end_date));
        active.updated_at = Set(Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update banner")?;
        Ok(Some(Banner::from(model)))
    }

    pub async fn delete_banner(&self, id: i32) -> Result<bool> {
        let result = banners::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete banner")?;
        Ok(result.rows_affected > 0)
    }

    pub async fn list_offers(&self, active_only: bool) -> Result<Vec<SpecialOffer>> {
        let mut query = special_offers::Entity::find()
            .order_by_asc(special_offers::Column::DisplayOrder)
            .order_by_asc(special_offers::Column::Id);
        if active_only {
            query = query.filter(special_offers::Column::IsActive.eq(true));
        }

        let rows = query
            .all(&self.conn)
            .await
            .context("Failed to list special offers")?;
        rows.into_iter().map(SpecialOffer::try_from).collect()
    }

    pub async fn create_offer(&self, input: OfferInput) -> Result<SpecialOffer> {
        let now = Utc::now().to_rfc3339();
        let model = special_offers::ActiveModel {
            title: Set(input.title),
            description: Set(input.description),
            image_url: Set(input.image_url),
            product_id: Set(input.product_id),
            discount_percentage: Set(input.discount_percentage.map(|d| round_money(d).to_string())),
            display_order: Set(input.display_order),
            is_active: Set(input.is_active),
            start_date: Set(date_column(input.start_date)),
            end_date: Set(date_column(input.end_date)),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert special offer")?;

        SpecialOffer::try_from(model)
    }

    pub async fn update_offer(&self, id: i32, input: OfferInput) -> Result<Option<SpecialOffer>> {
        let Some(row) = special_offers::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: special_offers::ActiveModel = row.into();
        active.title = Set(input.title);
        active.description = Set(input.description);
        active.image_url = Set(input.image_url);
        active.product_id = Set(input.product_id);
        active.discount_percentage =
            Set(input.discount_percentage.map(|d| round_money(d).to_string()));
        active.display_order = Set(input.display_order);
        active.is_active = Set(input.is_active);
        active.start_date = Set(date_column(input.start_date));
        active.end_date = Set(date_column(input.end_date));
        active.updated_at = Set(Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update special offer")?;
        Ok(Some(SpecialOffer::try_from(model)?))
    }

    pub async fn delete_offer(&self, id: i32) -> Result<bool> {
        let result = special_offers::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete special offer")?;
        Ok(result.rows_affected > 0)
    }
}
