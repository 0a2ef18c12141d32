//! Order fulfillment and payment state machines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

str_enum! {
    /// Fulfillment stage. Linear and forward-only.
    #[derive(Default, PartialOrd, Ord)]
    pub enum OrderStatus: "order status" {
        #[default]
        Pendiente => "PENDIENTE",
        Pagado => "PAGADO",
        EnPreparacion => "EN_PREPARACION",
        Recogido => "RECOGIDO",
        Enviado => "ENVIADO",
        EnRuta => "EN_RUTA",
        Entregado => "ENTREGADO",
    }
}

str_enum! {
    /// Payment stage. Which transitions are legal depends on the payment type.
    #[derive(Default)]
    pub enum PaymentStatus: "payment status" {
        #[default]
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Cancelled => "cancelled",
        PendingVerification => "pending_verification",
        Verified => "verified",
    }
}

str_enum! {
    pub enum PaymentType: "payment type" {
        MercadoPago => "mercadopago",
        Conekta => "conekta",
        DirectTransfer => "direct_transfer",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot move order from {from} to {to}")]
    Fulfillment { from: OrderStatus, to: OrderStatus },

    #[error("cannot move payment from {from} to {to}")]
    Payment {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("payment must be settled before leaving {0}")]
    PaymentNotSettled(OrderStatus),
}

impl OrderStatus {
    /// The stage that directly follows this one.
    #[must_use]
    pub fn next_stage(self) -> Option<Self> {
        let index = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(index + 1).copied()
    }

    /// Validates a fulfillment move. Only the next stage is legal, and
    /// nothing leaves `PENDIENTE` until the payment has settled.
    pub fn advance_to(
        self,
        next: Self,
        payment_status: PaymentStatus,
    ) -> Result<Self, TransitionError> {
        if self.next_stage() != Some(next) {
            return Err(TransitionError::Fulfillment {
                from: self,
                to: next,
            });
        }
        if self == Self::Pendiente && !payment_status.is_settled() {
            return Err(TransitionError::PaymentNotSettled(self));
        }
        Ok(next)
    }

    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Entregado)
    }
}

impl PaymentStatus {
    /// Money has been confirmed, by the gateway or by an admin.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Approved | Self::Verified)
    }

    /// The payment failed for good; the order no longer holds stock.
    #[must_use]
    pub const fn releases_stock(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }

    /// Gateway webhook transition: `pending → approved | rejected | cancelled`.
    ///
    /// Replaying the current status yields `Ok(None)` so duplicate webhook
    /// deliveries are harmless.
    pub fn gateway_transition(self, next: Self) -> Result<Option<Self>, TransitionError> {
        if self == next {
            return Ok(None);
        }
        match (self, next) {
            (Self::Pending, Self::Approved | Self::Rejected | Self::Cancelled) => Ok(Some(next)),
            _ => Err(TransitionError::Payment {
                from: self,
                to: next,
            }),
        }
    }

    /// Customer uploaded a transfer receipt: `pending → pending_verification`.
    pub fn submit_receipt(self) -> Result<Self, TransitionError> {
        match self {
            Self::Pending => Ok(Self::PendingVerification),
            other => Err(TransitionError::Payment {
                from: other,
                to: Self::PendingVerification,
            }),
        }
    }

    /// Admin decision on a transfer: `pending_verification → verified | rejected`.
    pub fn review_transfer(self, approved: bool) -> Result<Self, TransitionError> {
        let next = if approved {
            Self::Verified
        } else {
            Self::Rejected
        };
        match self {
            Self::PendingVerification => Ok(next),
            other => Err(TransitionError::Payment {
                from: other,
                to: next,
            }),
        }
    }
}

impl PaymentType {
    #[must_use]
    pub const fn is_gateway(&self) -> bool {
        !matches!(self, Self::DirectTransfer)
    }
}

/// One row of the append-only `status_history` JSON column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_by: Option<i32>,
    pub changed_at: DateTime<Utc>,
}

impl StatusHistoryEntry {
    #[must_use]
    pub fn now(status: OrderStatus, payment_status: Option<PaymentStatus>) -> Self {
        Self {
            status,
            payment_status,
            note: None,
            changed_by: None,
            changed_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn by(mut self, user_id: i32) -> Self {
        self.changed_by = Some(user_id);
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: Option<String>) -> Self {
        self.note = note.filter(|n| !n.trim().is_empty());
        self
    }
}

/// Delivery address stored in the `shipping_address` JSON column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub recipient: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
}

fn default_country() -> String {
    "MX".to_string()
}

impl ShippingAddress {
    /// Returns the name of the first empty required field, if any.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("recipient", &self.recipient),
            ("street", &self.street),
            ("city", &self.city),
            ("state", &self.state),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fulfillment_moves_forward_only() {
        use OrderStatus::*;
        let settled = PaymentStatus::Verified;

        assert_eq!(Pagado.advance_to(EnPreparacion, settled), Ok(EnPreparacion));
        assert_eq!(EnRuta.advance_to(Entregado, settled), Ok(Entregado));
        assert!(Entregado.advance_to(Pendiente, settled).is_err());
        assert!(Enviado.advance_to(Recogido, settled).is_err());
        assert!(Pagado.advance_to(Pagado, settled).is_err());
    }

    #[test]
    fn fulfillment_cannot_skip_stages() {
        use OrderStatus::*;
        let settled = PaymentStatus::Approved;

        assert!(Pagado.advance_to(Entregado, settled).is_err());
        assert!(Pagado.advance_to(Enviado, settled).is_err());
        assert_eq!(Entregado.next_stage(), None);
        assert_eq!(Recogido.next_stage(), Some(Enviado));
    }

    #[test]
    fn failed_payments_release_stock() {
        assert!(PaymentStatus::Rejected.releases_stock());
        assert!(PaymentStatus::Cancelled.releases_stock());
        assert!(!PaymentStatus::PendingVerification.releases_stock());
        assert!(!PaymentStatus::Verified.releases_stock());
    }

    #[test]
    fn pending_order_needs_settled_payment() {
        assert_eq!(
            OrderStatus::Pendiente.advance_to(OrderStatus::Pagado, PaymentStatus::Pending),
            Err(TransitionError::PaymentNotSettled(OrderStatus::Pendiente))
        );
        assert!(
            OrderStatus::Pendiente
                .advance_to(OrderStatus::Pagado, PaymentStatus::Approved)
                .is_ok()
        );
    }

    #[test]
    fn gateway_transitions() {
        use PaymentStatus::*;
        assert_eq!(Pending.gateway_transition(Approved), Ok(Some(Approved)));
        assert_eq!(Pending.gateway_transition(Cancelled), Ok(Some(Cancelled)));
        assert_eq!(Approved.gateway_transition(Approved), Ok(None));
        assert!(Approved.gateway_transition(Rejected).is_err());
        assert!(Pending.gateway_transition(Verified).is_err());
    }

    #[test]
    fn transfer_transitions() {
        use PaymentStatus::*;
        assert_eq!(Pending.submit_receipt(), Ok(PendingVerification));
        assert!(PendingVerification.submit_receipt().is_err());
        assert!(Rejected.submit_receipt().is_err());

        assert_eq!(PendingVerification.review_transfer(true), Ok(Verified));
        assert_eq!(PendingVerification.review_transfer(false), Ok(Rejected));
        assert!(Verified.review_transfer(true).is_err());
        assert!(Rejected.review_transfer(true).is_err());
        assert!(Pending.review_transfer(false).is_err());
    }

    #[test]
    fn history_entry_json_shape() {
        let entry = StatusHistoryEntry::now(OrderStatus::Pagado, Some(PaymentStatus::Verified))
            .by(7)
            .with_note(Some("ok".to_string()));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "PAGADO");
        assert_eq!(json["paymentStatus"], "verified");
        assert_eq!(json["changedBy"], 7);
        assert_eq!(json["note"], "ok");

        let blank = StatusHistoryEntry::now(OrderStatus::Pendiente, None)
            .with_note(Some("  ".to_string()));
        let json = serde_json::to_value(&blank).unwrap();
        assert!(json.get("note").is_none());
        assert!(json.get("paymentStatus").is_none());
    }

    #[test]
    fn shipping_address_reports_missing_fields() {
        let address: ShippingAddress = serde_json::from_value(serde_json::json!({
            "recipient": "Ana",
            "street": "Av. Juárez 10",
            "city": "CDMX",
            "state": "CDMX",
            "postalCode": ""
        }))
        .unwrap();
        assert_eq!(address.country, "MX");
        assert_eq!(address.missing_field(), Some("postalCode"));
    }
}
