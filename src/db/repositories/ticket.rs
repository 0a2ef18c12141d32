use anyhow::{Context, Result};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use serde::Serialize;
use tracing::warn;

use crate::domain::{Attachment, SenderType, TicketCategory, TicketPriority, TicketStatus};
use crate::entities::{support_tickets, ticket_messages};

use super::reference_number;

const NUMBER_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i32,
    pub ticket_number: String,
    pub user_id: i32,
    pub subject: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub order_id: Option<i32>,
    pub attachments: Vec<Attachment>,
    pub created_at: String,
    pub updated_at: String,
    pub closed_at: Option<String>,
}

impl TryFrom<support_tickets::Model> for Ticket {
    type Error = anyhow::Error;

    fn try_from(model: support_tickets::Model) -> Result<Self> {
        let id = model.id;
        let corrupt = |field: &str| format!("Corrupt {field} on ticket {id}");

        Ok(Self {
            category: model.category.parse().with_context(|| corrupt("category"))?,
            priority: model.priority.parse().with_context(|| corrupt("priority"))?,
            status: model.status.parse().with_context(|| corrupt("status"))?,
            attachments: serde_json::from_str(&model.attachments)
                .with_context(|| corrupt("attachments"))?,
            id,
            ticket_number: model.ticket_number,
            user_id: model.user_id,
            subject: model.subject,
            order_id: model.order_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
            closed_at: model.closed_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMessage {
    pub id: i32,
    pub ticket_id: i32,
    pub sender_id: i32,
    pub sender_type: SenderType,
    pub message: String,
    pub attachments: Vec<Attachment>,
    pub created_at: String,
}

impl TryFrom<ticket_messages::Model> for TicketMessage {
    type Error = anyhow::Error;

    fn try_from(model: ticket_messages::Model) -> Result<Self> {
        let id = model.id;
        Ok(Self {
            sender_type: model
                .sender_type
                .parse()
                .with_context(|| format!("Corrupt sender_type on message {id}"))?,
            attachments: serde_json::from_str(&model.attachments)
                .with_context(|| format!("Corrupt attachments on message {id}"))?,
            id,
            ticket_id: model.ticket_id,
            sender_id: model.sender_id,
            message: model.message,
            created_at: model.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub number_prefix: String,
    pub user_id: i32,
    pub subject: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub order_id: Option<i32>,
    pub message: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: i32,
    pub sender_type: SenderType,
    pub message: String,
    pub attachments: Vec<Attachment>,
}

pub struct TicketRepository {
    conn: DatabaseConnection,
}

impl TicketRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts the ticket and its opening message together.
    pub async fn create(&self, new: NewTicket) -> Result<(Ticket, TicketMessage)> {
        let attachments = serde_json::to_string(&new.attachments)?;
        let now = chrono::Utc::now().to_rfc3339();

        let txn = self.conn.begin().await?;

        let mut attempt = 0;
        let ticket = loop {
            attempt += 1;
            let active = support_tickets::ActiveModel {
                ticket_number: Set(reference_number(&new.number_prefix)),
                user_id: Set(new.user_id),
                subject: Set(new.subject.clone()),
                category: Set(new.category.as_str().to_string()),
                priority: Set(new.priority.as_str().to_string()),
                status: Set(TicketStatus::Abierto.as_str().to_string()),
                order_id: Set(new.order_id),
                attachments: Set(attachments.clone()),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                closed_at: Set(None),
                ..Default::default()
            };

            match active.insert(&txn).await {
                Ok(model) => break model,
                Err(e)
                    if attempt < NUMBER_ATTEMPTS
                        && matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
                {
                    warn!("Ticket number collision, retrying");
                }
                Err(e) => return Err(e).context("Failed to insert ticket"),
            }
        };

        let message = ticket_messages::ActiveModel {
            ticket_id: Set(ticket.id),
            sender_id: Set(new.user_id),
            sender_type: Set(SenderType::Cliente.as_str().to_string()),
            message: Set(new.message),
            attachments: Set(attachments),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert opening message")?;

        txn.commit().await?;

        Ok((Ticket::try_from(ticket)?, TicketMessage::try_from(message)?))
    }

    pub async fn get(&self, id: i32) -> Result<Option<Ticket>> {
        let row = support_tickets::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query ticket")?;

        row.map(Ticket::try_from).transpose()
    }

    pub async fn list(
        &self,
        user_id: Option<i32>,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>> {
        let mut query = support_tickets::Entity::find().order_by_desc(support_tickets::Column::Id);
        if let Some(user_id) = user_id {
            query = query.filter(support_tickets::Column::UserId.eq(user_id));
        }
        if let Some(status) = status {
            query = query.filter(support_tickets::Column::Status.eq(status.as_str()));
        }

        let rows = query.all(&self.conn).await.context("Failed to list tickets")?;
        rows.into_iter().map(Ticket::try_from).collect()
    }

    /// Thread in insertion order.
    pub async fn messages(&self, ticket_id: i32) -> Result<Vec<TicketMessage>> {
        let rows = ticket_messages::Entity::find()
            .filter(ticket_messages::Column::TicketId.eq(ticket_id))
            .order_by_asc(ticket_messages::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list ticket messages")?;

        rows.into_iter().map(TicketMessage::try_from).collect()
    }

    /// Appends to the thread unless the ticket is resolved or closed.
    ///
    /// The status check and the insert share a transaction, so a message
    /// cannot slip in after a concurrent close. Returns `None` when closed.
    pub async fn add_message(
        &self,
        ticket_id: i32,
        new: NewMessage,
    ) -> Result<Option<TicketMessage>> {
        let now = chrono::Utc::now().to_rfc3339();
        let txn = self.conn.begin().await?;

        let touched = support_tickets::Entity::update_many()
            .col_expr(support_tickets::Column::UpdatedAt, Expr::value(now.clone()))
            .filter(support_tickets::Column::Id.eq(ticket_id))
            .filter(support_tickets::Column::Status.is_not_in([
                TicketStatus::Resuelto.as_str(),
                TicketStatus::Cerrado.as_str(),
            ]))
            .exec(&txn)
            .await
            .context("Failed to touch ticket")?;

        if touched.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let model = ticket_messages::ActiveModel {
            ticket_id: Set(ticket_id),
            sender_id: Set(new.sender_id),
            sender_type: Set(new.sender_type.as_str().to_string()),
            message: Set(new.message),
            attachments: Set(serde_json::to_string(&new.attachments)?),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert ticket message")?;

        txn.commit().await?;
        Ok(Some(TicketMessage::try_from(model)?))
    }

    /// Moves `from → to` if the ticket is still in `from`. Returns `None` on a lost race.
    pub async fn update_status(
        &self,
        id: i32,
        from: TicketStatus,
        to: TicketStatus,
    ) -> Result<Option<Ticket>> {
        let now = chrono::Utc::now().to_rfc3339();
        let closed_at = (to == TicketStatus::Cerrado).then(|| now.clone());

        let result = support_tickets::Entity::update_many()
            .col_expr(support_tickets::Column::Status, Expr::value(to.as_str()))
            .col_expr(support_tickets::Column::UpdatedAt, Expr::value(now))
            .col_expr(support_tickets::Column::ClosedAt, Expr::value(closed_at))
            .filter(support_tickets::Column::Id.eq(id))
            .filter(support_tickets::Column::Status.eq(from.as_str()))
            .exec(&self.conn)
            .await
            .context("Failed to update ticket status")?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get(id).await
    }
}
