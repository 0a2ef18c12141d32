//! `SeaORM` implementation of the `TicketService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::db::{NewMessage, NewTicket, Store, Ticket, TicketMessage, User};
use crate::domain::{SenderType, TicketStatus};
use crate::services::ticket_service::{
    CreateTicketRequest, MAX_SUBJECT_LENGTH, PostMessageRequest, TicketError, TicketService,
    TicketThread, validate_message,
};

pub struct SeaOrmTicketService {
    store: Store,
    config: Arc<RwLock<Config>>,
}

impl SeaOrmTicketService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>) -> Self {
        Self { store, config }
    }

    async fn visible_ticket(&self, user: &User, ticket_id: i32) -> Result<Ticket, TicketError> {
        self.store
            .tickets()
            .get(ticket_id)
            .await?
            .filter(|t| user.is_admin() || t.user_id == user.id)
            .ok_or(TicketError::NotFound)
    }
}

#[async_trait]
impl TicketService for SeaOrmTicketService {
    async fn create_ticket(
        &self,
        user: &User,
        request: CreateTicketRequest,
    ) -> Result<TicketThread, TicketError> {
        let subject = request.subject.trim().to_string();
        if subject.is_empty() || subject.chars().count() > MAX_SUBJECT_LENGTH {
            return Err(TicketError::Validation(format!(
                "El asunto es obligatorio (máximo {MAX_SUBJECT_LENGTH} caracteres)"
            )));
        }
        let message = validate_message(&request.message, &request.attachments)?;

        if let Some(order_id) = request.order_id {
            let owned = self
                .store
                .orders()
                .get(order_id)
                .await?
                .is_some_and(|o| o.user_id == user.id);
            if !owned {
                return Err(TicketError::Validation(
                    "El pedido indicado no existe".to_string(),
                ));
            }
        }

        let number_prefix = self.config.read().await.storefront.ticket_number_prefix.clone();
        let (ticket, first) = self
            .store
            .tickets()
            .create(NewTicket {
                number_prefix,
                user_id: user.id,
                subject,
                category: request.category,
                priority: request.priority,
                order_id: request.order_id,
                message,
                attachments: request.attachments,
            })
            .await?;

        info!(
            ticket_id = ticket.id,
            ticket_number = %ticket.ticket_number,
            category = %ticket.category,
            priority = %ticket.priority,
            "Support ticket opened"
        );

        Ok(TicketThread {
            ticket,
            messages: vec![first],
        })
    }

    async fn list_tickets(
        &self,
        user: &User,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>, TicketError> {
        let owner = (!user.is_admin()).then_some(user.id);
        Ok(self.store.tickets().list(owner, status).await?)
    }

    async fn get_ticket(&self, user: &User, ticket_id: i32) -> Result<TicketThread, TicketError> {
        let ticket = self.visible_ticket(user, ticket_id).await?;
        let messages = self.store.tickets().messages(ticket.id).await?;
        Ok(TicketThread { ticket, messages })
    }

    async fn post_message(
        &self,
        user: &User,
        ticket_id: i32,
        request: PostMessageRequest,
    ) -> Result<TicketMessage, TicketError> {
        let ticket = self.visible_ticket(user, ticket_id).await?;
        if !ticket.status.accepts_messages() {
            return Err(TicketError::Closed(ticket.status));
        }

        let message = validate_message(&request.message, &request.attachments)?;
        let sender_type = if user.is_admin() {
            SenderType::Admin
        } else {
            SenderType::Cliente
        };

        let posted = self
            .store
            .tickets()
            .add_message(
                ticket.id,
                NewMessage {
                    sender_id: user.id,
                    sender_type,
                    message,
                    attachments: request.attachments,
                },
            )
            .await?;

        let Some(posted) = posted else {
            // Closed between the read and the insert.
            let status = self
                .store
                .tickets()
                .get(ticket.id)
                .await?
                .map_or(TicketStatus::Cerrado, |t| t.status);
            return Err(TicketError::Closed(status));
        };

        info!(ticket_id, sender = %sender_type, "Ticket message posted");
        Ok(posted)
    }

    async fn update_status(
        &self,
        admin_id: i32,
        ticket_id: i32,
        status: TicketStatus,
    ) -> Result<Ticket, TicketError> {
        let ticket = self
            .store
            .tickets()
            .get(ticket_id)
            .await?
            .ok_or(TicketError::NotFound)?;

        if !ticket.status.can_transition_to(status) {
            return Err(TicketError::InvalidTransition {
                from: ticket.status,
                to: status,
            });
        }

        let updated = self
            .store
            .tickets()
            .update_status(ticket.id, ticket.status, status)
            .await?
            .ok_or(TicketError::Conflict)?;

        info!(ticket_id, admin_id, from = %ticket.status, to = %status, "Ticket status changed");
        Ok(updated)
    }
}
