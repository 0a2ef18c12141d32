use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};

use crate::domain::{GatewaySettings, PaymentGateway};
use crate::entities::payment_configs;

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub id: i32,
    pub gateway: PaymentGateway,
    pub display_name: String,
    pub is_active: bool,
    pub settings: GatewaySettings,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<payment_configs::Model> for PaymentConfig {
    type Error = anyhow::Error;

    fn try_from(model: payment_configs::Model) -> Result<Self> {
        let gateway: PaymentGateway = model
            .gateway
            .parse()
            .with_context(|| format!("Corrupt gateway on payment config {}", model.id))?;
        let raw: serde_json::Value = serde_json::from_str(&model.config)
            .with_context(|| format!("Corrupt JSON on payment config {}", model.id))?;
        let settings = GatewaySettings::parse(gateway, &raw)
            .with_context(|| format!("Invalid settings on payment config {}", model.id))?;

        Ok(Self {
            id: model.id,
            gateway,
            display_name: model.display_name,
            is_active: model.is_active,
            settings,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

/// Fields an admin may change on an existing config. `None` keeps the value.
#[derive(Debug, Clone, Default)]
pub struct PaymentConfigPatch {
    pub display_name: Option<String>,
    pub is_active: Option<bool>,
    pub settings: Option<GatewaySettings>,
}

pub struct PaymentConfigRepository {
    conn: DatabaseConnection,
}

impl PaymentConfigRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn list(&self, active_only: bool) -> Result<Vec<PaymentConfig>> {
        let mut query = payment_configs::Entity::find().order_by_asc(payment_configs::Column::Id);
        if active_only {
            query = query.filter(payment_configs::Column::IsActive.eq(true));
        }

        let rows = query
            .all(&self.conn)
            .await
            .context("Failed to list payment configs")?;
        rows.into_iter().map(PaymentConfig::try_from).collect()
    }

    pub async fn get(&self, id: i32) -> Result<Option<PaymentConfig>> {
        let row = payment_configs::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query payment config")?;

        row.map(PaymentConfig::try_from).transpose()
    }

    pub async fn get_by_gateway(&self, gateway: PaymentGateway) -> Result<Option<PaymentConfig>> {
        let row = payment_configs::Entity::find()
            .filter(payment_configs::Column::Gateway.eq(gateway.as_str()))
            .one(&self.conn)
            .await
            .context("Failed to query payment config by gateway")?;

        row.map(PaymentConfig::try_from).transpose()
    }

    /// Returns `None` if a config for this gateway already exists.
    pub async fn create(
        &self,
        display_name: String,
        is_active: bool,
        settings: GatewaySettings,
    ) -> Result<Option<PaymentConfig>> {
        let now = chrono::Utc::now().to_rfc3339();
        let active = payment_configs::ActiveModel {
            gateway: Set(settings.gateway().as_str().to_string()),
            display_name: Set(display_name),
            is_active: Set(is_active),
            config: Set(settings.to_value().to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(PaymentConfig::try_from(model)?)),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Ok(None),
            Err(e) => Err(e).context("Failed to insert payment config"),
        }
    }

    pub async fn update(
        &self,
        id: i32,
        patch: PaymentConfigPatch,
    ) -> Result<Option<PaymentConfig>> {
        let Some(row) = payment_configs::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: payment_configs::ActiveModel = row.into();
        if let Some(display_name) = patch.display_name {
            active.display_name = Set(display_name);
        }
        if let Some(is_active) = patch.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(settings) = patch.settings {
            active.config = Set(settings.to_value().to_string());
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update payment config")?;
        Ok(Some(PaymentConfig::try_from(model)?))
    }
}
