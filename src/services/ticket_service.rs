//! Domain service for customer support tickets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Ticket, TicketMessage, User};
use crate::domain::{Attachment, TicketCategory, TicketPriority, TicketStatus};

pub const MAX_SUBJECT_LENGTH: usize = 200;
pub const MAX_MESSAGE_LENGTH: usize = 5000;
pub const MAX_ATTACHMENTS: usize = 5;

#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Ticket no encontrado")]
    NotFound,

    #[error("El ticket está {0} y ya no admite mensajes")]
    Closed(TicketStatus),

    #[error("No se puede cambiar un ticket de {from} a {to}")]
    InvalidTransition {
        from: TicketStatus,
        to: TicketStatus,
    },

    #[error("El ticket fue modificado por otra operación, vuelve a intentarlo")]
    Conflict,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TicketError {
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::Closed(_) => Some("TICKET_CLOSED"),
            Self::InvalidTransition { .. } | Self::Conflict => Some("STATE_CONFLICT"),
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for TicketError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for TicketError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub subject: String,
    pub category: TicketCategory,
    #[serde(default)]
    pub priority: TicketPriority,
    #[serde(default)]
    pub order_id: Option<i32>,
    pub message: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub message: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A ticket with its full message thread, oldest message first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketThread {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub messages: Vec<TicketMessage>,
}

#[async_trait::async_trait]
pub trait TicketService: Send + Sync {
    /// Opens a ticket with its first customer message.
    async fn create_ticket(
        &self,
        user: &User,
        request: CreateTicketRequest,
    ) -> Result<TicketThread, TicketError>;

    /// Customers see their own tickets; admins see all.
    async fn list_tickets(
        &self,
        user: &User,
        status: Option<TicketStatus>,
    ) -> Result<Vec<Ticket>, TicketError>;

    async fn get_ticket(&self, user: &User, ticket_id: i32) -> Result<TicketThread, TicketError>;

    /// Appends to the thread. The sender type follows the user's role.
    ///
    /// # Errors
    ///
    /// [`TicketError::Closed`] once the ticket is `RESUELTO` or `CERRADO`.
    async fn post_message(
        &self,
        user: &User,
        ticket_id: i32,
        request: PostMessageRequest,
    ) -> Result<TicketMessage, TicketError>;

    /// Admin status change, checked against the ticket transition table.
    async fn update_status(
        &self,
        admin_id: i32,
        ticket_id: i32,
        status: TicketStatus,
    ) -> Result<Ticket, TicketError>;
}

pub fn validate_message(message: &str, attachments: &[Attachment]) -> Result<String, TicketError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(TicketError::Validation(
            "El mensaje no puede estar vacío".to_string(),
        ));
    }
    if message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(TicketError::Validation(format!(
            "El mensaje no puede exceder {MAX_MESSAGE_LENGTH} caracteres"
        )));
    }
    if attachments.len() > MAX_ATTACHMENTS {
        return Err(TicketError::Validation(format!(
            "Se permiten como máximo {MAX_ATTACHMENTS} archivos adjuntos"
        )));
    }
    if let Some(bad) = attachments.iter().find(|a| !a.is_valid()) {
        return Err(TicketError::Validation(format!(
            "Archivo adjunto inválido: {}",
            bad.file_name
        )));
    }
    Ok(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(url: &str) -> Attachment {
        Attachment {
            url: url.to_string(),
            file_name: "recibo.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            size_bytes: Some(2048),
        }
    }

    #[test]
    fn message_is_trimmed() {
        assert_eq!(validate_message("  hola  ", &[]).unwrap(), "hola");
    }

    #[test]
    fn rejects_blank_messages_and_bad_attachments() {
        assert!(validate_message("   ", &[]).is_err());
        assert!(validate_message("hola", &[attachment("ftp://x/recibo.pdf")]).is_err());
        assert!(validate_message("hola", &[attachment("https://cdn.example.com/r.pdf")]).is_ok());

        let many = vec![attachment("https://cdn.example.com/r.pdf"); MAX_ATTACHMENTS + 1];
        assert!(validate_message("hola", &many).is_err());
    }

    #[test]
    fn request_defaults_priority_to_media() {
        let request: CreateTicketRequest = serde_json::from_str(
            r#"{"subject":"Cobro doble","category":"PAGO","message":"Me cobraron dos veces"}"#,
        )
        .unwrap();
        assert_eq!(request.priority, TicketPriority::Media);
        assert!(request.attachments.is_empty());
    }
}
