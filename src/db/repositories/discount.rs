use anyhow::{Context, Result};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Serialize;

use crate::domain::{parse_money, round_money};
use crate::entities::transfer_discount_config;

const SINGLETON_ID: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountConfig {
    pub discount_percentage: Decimal,
    pub message: Option<String>,
    pub is_active: bool,
    pub updated_by: Option<i32>,
    pub updated_at: String,
}

impl DiscountConfig {
    /// Percentage applied to new transfer orders; zero while disabled.
    #[must_use]
    pub fn effective_percentage(&self) -> Decimal {
        if self.is_active {
            self.discount_percentage
        } else {
            Decimal::ZERO
        }
    }
}

impl TryFrom<transfer_discount_config::Model> for DiscountConfig {
    type Error = anyhow::Error;

    fn try_from(model: transfer_discount_config::Model) -> Result<Self> {
        Ok(Self {
            discount_percentage: parse_money(&model.discount_percentage)
                .context("Corrupt transfer discount percentage")?,
            message: model.message,
            is_active: model.is_active,
            updated_by: model.updated_by,
            updated_at: model.updated_at,
        })
    }
}

pub struct DiscountRepository {
    conn: DatabaseConnection,
}

impl DiscountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Reads the singleton row. A missing row means no discount.
    pub async fn get(&self) -> Result<DiscountConfig> {
        let row = transfer_discount_config::Entity::find_by_id(SINGLETON_ID)
            .one(&self.conn)
            .await
            .context("Failed to query transfer discount config")?;

        match row {
            Some(model) => DiscountConfig::try_from(model),
            None => Ok(DiscountConfig {
                discount_percentage: Decimal::ZERO,
                message: None,
                is_active: false,
                updated_by: None,
                updated_at: String::new(),
            }),
        }
    }

    pub async fn update(
        &self,
        percentage: Decimal,
        message: Option<String>,
        is_active: bool,
        updated_by: i32,
    ) -> Result<DiscountConfig> {
        let existing = transfer_discount_config::Entity::find_by_id(SINGLETON_ID)
            .one(&self.conn)
            .await
            .context("Failed to query transfer discount config")?;

        let now = chrono::Utc::now().to_rfc3339();
        let model = match existing {
            Some(row) => {
                let mut active: transfer_discount_config::ActiveModel = row.into();
                active.discount_percentage = Set(round_money(percentage).to_string());
                active.message = Set(message);
                active.is_active = Set(is_active);
                active.updated_by = Set(Some(updated_by));
                active.updated_at = Set(now);
                active.update(&self.conn).await
            }
            None => {
                transfer_discount_config::ActiveModel {
                    id: Set(SINGLETON_ID),
                    discount_percentage: Set(round_money(percentage).to_string()),
                    message: Set(message),
                    is_active: Set(is_active),
                    updated_by: Set(Some(updated_by)),
                    updated_at: Set(now),
                }
                .insert(&self.conn)
                .await
            }
        }
        .context("Failed to save transfer discount config")?;

        DiscountConfig::try_from(model)
    }
}
