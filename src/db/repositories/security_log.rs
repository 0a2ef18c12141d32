use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::SensitiveAction;
use crate::entities::security_logs;

use super::parse_timestamp;

#[derive(Debug, Clone)]
pub struct SecurityLog {
    pub id: i32,
    pub user_id: i32,
    pub action: SensitiveAction,
    pub channel: String,
    pub code_hash: String,
    pub verified: bool,
    pub attempts: i32,
    pub expires_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: String,
}

impl TryFrom<security_logs::Model> for SecurityLog {
    type Error = anyhow::Error;

    fn try_from(model: security_logs::Model) -> Result<Self> {
        let id = model.id;
        Ok(Self {
            action: model
                .action
                .parse()
                .with_context(|| format!("Corrupt action on security log {id}"))?,
            expires_at: parse_timestamp(&model.expires_at)
                .with_context(|| format!("Corrupt expires_at on security log {id}"))?,
            verified_at: model
                .verified_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .with_context(|| format!("Corrupt verified_at on security log {id}"))?,
            id,
            user_id: model.user_id,
            channel: model.channel,
            code_hash: model.code_hash,
            verified: model.verified,
            attempts: model.attempts,
            created_at: model.created_at,
        })
    }
}

pub struct SecurityLogRepository {
    conn: DatabaseConnection,
}

impl SecurityLogRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn insert(
        &self,
        user_id: i32,
        action: SensitiveAction,
        channel: &str,
        code_hash: String,
        expires_at: DateTime<Utc>,
    ) -> Result<SecurityLog> {
        let active = security_logs::ActiveModel {
            user_id: Set(user_id),
            action: Set(action.as_str().to_string()),
            channel: Set(channel.to_string()),
            code_hash: Set(code_hash),
            verified: Set(false),
            attempts: Set(0),
            expires_at: Set(expires_at.to_rfc3339()),
            verified_at: Set(None),
            created_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert security log")?;
        SecurityLog::try_from(model)
    }

    /// Newest row for `(user, action)`. Older rows are superseded.
    pub async fn latest(
        &self,
        user_id: i32,
        action: SensitiveAction,
    ) -> Result<Option<SecurityLog>> {
        let row = security_logs::Entity::find()
            .filter(security_logs::Column::UserId.eq(user_id))
            .filter(security_logs::Column::Action.eq(action.as_str()))
            .order_by_desc(security_logs::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query latest security log")?;

        row.map(SecurityLog::try_from).transpose()
    }

    /// Newest successfully verified row for `(user, action)`.
    pub async fn latest_verified(
        &self,
        user_id: i32,
        action: SensitiveAction,
    ) -> Result<Option<SecurityLog>> {
        let row = security_logs::Entity::find()
            .filter(security_logs::Column::UserId.eq(user_id))
            .filter(security_logs::Column::Action.eq(action.as_str()))
            .filter(security_logs::Column::Verified.eq(true))
            .order_by_desc(security_logs::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query verified security log")?;

        row.map(SecurityLog::try_from).transpose()
    }

    /// Claims one attempt on an unconsumed code before it is compared.
    ///
    /// Returns `false` when the code is already used up or consumed, so at
    /// most `max_attempts` comparisons ever run against a code.
    pub async fn reserve_attempt(&self, id: i32, max_attempts: i32) -> Result<bool> {
        let result = security_logs::Entity::update_many()
            .col_expr(
                security_logs::Column::Attempts,
                Expr::col(security_logs::Column::Attempts).add(1),
            )
            .filter(security_logs::Column::Id.eq(id))
            .filter(security_logs::Column::Verified.eq(false))
            .filter(security_logs::Column::Attempts.lt(max_attempts))
            .exec(&self.conn)
            .await
            .context("Failed to reserve verification attempt")?;

        Ok(result.rows_affected == 1)
    }

    pub async fn get(&self, id: i32) -> Result<Option<SecurityLog>> {
        let row = security_logs::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query security log")?;

        row.map(SecurityLog::try_from).transpose()
    }

    /// Flips `verified` on. Returns `false` if another request consumed the
    /// code first.
    pub async fn mark_verified(&self, id: i32, at: DateTime<Utc>) -> Result<bool> {
        let result = security_logs::Entity::update_many()
            .col_expr(security_logs::Column::Verified, Expr::value(true))
            .col_expr(security_logs::Column::VerifiedAt, Expr::value(at.to_rfc3339()))
            .filter(security_logs::Column::Id.eq(id))
            .filter(security_logs::Column::Verified.eq(false))
            .exec(&self.conn)
            .await
            .context("Failed to mark security log verified")?;

        Ok(result.rows_affected == 1)
    }

    pub async fn list_for_user(&self, user_id: i32, limit: u64) -> Result<Vec<SecurityLog>> {
        use sea_orm::QuerySelect;

        let rows = security_logs::Entity::find()
            .filter(security_logs::Column::UserId.eq(user_id))
            .order_by_desc(security_logs::Column::Id)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list security logs")?;

        rows.into_iter().map(SecurityLog::try_from).collect()
    }
}
