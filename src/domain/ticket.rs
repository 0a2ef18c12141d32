//! Support ticket lifecycle.

use serde::{Deserialize, Serialize};

str_enum! {
    #[derive(Default)]
    pub enum TicketStatus: "ticket status" {
        #[default]
        Abierto => "ABIERTO",
        EnProceso => "EN_PROCESO",
        EsperandoCliente => "ESPERANDO_CLIENTE",
        Resuelto => "RESUELTO",
        Cerrado => "CERRADO",
    }
}

str_enum! {
    pub enum TicketCategory: "ticket category" {
        Pedido => "PEDIDO",
        Pago => "PAGO",
        Envio => "ENVIO",
        Producto => "PRODUCTO",
        Cuenta => "CUENTA",
        Otro => "OTRO",
    }
}

str_enum! {
    #[derive(Default)]
    pub enum TicketPriority: "ticket priority" {
        Baja => "BAJA",
        #[default]
        Media => "MEDIA",
        Alta => "ALTA",
        Urgente => "URGENTE",
    }
}

str_enum! {
    pub enum SenderType: "sender type" {
        Cliente => "CLIENTE",
        Admin => "ADMIN",
    }
}

impl TicketStatus {
    /// Threads accept new messages until the ticket is resolved or closed.
    #[must_use]
    pub const fn accepts_messages(&self) -> bool {
        !matches!(self, Self::Resuelto | Self::Cerrado)
    }

    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Abierto, EnProceso | EsperandoCliente | Resuelto | Cerrado)
                | (EnProceso, EsperandoCliente | Resuelto | Cerrado)
                | (EsperandoCliente, EnProceso | Resuelto | Cerrado)
                | (Resuelto, Cerrado)
        )
    }
}

/// File reference stored in the `attachments` JSON columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
}

impl Attachment {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (self.url.starts_with("https://") || self.url.starts_with("http://"))
            && !self.file_name.trim().is_empty()
            && self.size_bytes.is_none_or(|s| s >= 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_and_resolved_tickets_reject_messages() {
        assert!(TicketStatus::Abierto.accepts_messages());
        assert!(TicketStatus::EsperandoCliente.accepts_messages());
        assert!(!TicketStatus::Resuelto.accepts_messages());
        assert!(!TicketStatus::Cerrado.accepts_messages());
    }

    #[test]
    fn status_transitions() {
        use TicketStatus::*;
        assert!(Abierto.can_transition_to(EnProceso));
        assert!(EnProceso.can_transition_to(EsperandoCliente));
        assert!(EsperandoCliente.can_transition_to(EnProceso));
        assert!(Resuelto.can_transition_to(Cerrado));
        assert!(!Cerrado.can_transition_to(Abierto));
        assert!(!Resuelto.can_transition_to(EnProceso));
        assert!(!EnProceso.can_transition_to(Abierto));
        assert!(!Abierto.can_transition_to(Abierto));
    }

    #[test]
    fn attachment_validation() {
        let ok = Attachment {
            url: "https://cdn.example.com/recibo.pdf".to_string(),
            file_name: "recibo.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            size_bytes: Some(1024),
        };
        assert!(ok.is_valid());

        let bad = Attachment {
            url: "ftp://files/recibo.pdf".to_string(),
            ..ok.clone()
        };
        assert!(!bad.is_valid());
    }
}
