//! Domain service for the two-factor verification gate.
//!
//! Issues short-lived numeric codes for a `(user, action)` pair, checks them,
//! and answers whether a sensitive action is currently unlocked for a user.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::User;
use crate::domain::{Channel, SensitiveAction, TwoFactorMethod};

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("El código es incorrecto")]
    CodeMismatch { attempts_left: i32 },

    #[error("El código ha expirado, solicita uno nuevo")]
    CodeExpired,

    #[error("No hay un código pendiente para esta acción")]
    NoPendingCode,

    #[error("Demasiados intentos fallidos, solicita un código nuevo")]
    TooManyAttempts,

    #[error("Esta acción requiere verificación en dos pasos ({0})")]
    VerificationRequired(SensitiveAction),

    #[error("No hay un canal de contacto disponible para enviar el código")]
    ChannelUnavailable,

    #[error("No se pudo entregar el código: {0}")]
    ChannelDelivery(String),

    #[error("{0}")]
    Validation(String),

    #[error("Usuario no encontrado")]
    UserNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SecurityError {
    /// Stable machine-readable code for clients.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::CodeMismatch { .. } => Some("CODE_MISMATCH"),
            Self::CodeExpired => Some("CODE_EXPIRED"),
            Self::NoPendingCode => Some("NO_PENDING_CODE"),
            Self::TooManyAttempts => Some("TOO_MANY_ATTEMPTS"),
            Self::VerificationRequired(_) => Some("VERIFICATION_REQUIRED"),
            Self::ChannelUnavailable => Some("CHANNEL_UNAVAILABLE"),
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for SecurityError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SecurityError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Where a code went. Contacts are masked.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeDispatch {
    pub action: SensitiveAction,
    pub channels: Vec<Channel>,
    pub sent_to: Vec<String>,
    pub expires_at: DateTime<Utc>,
}

/// Proof that the user entered a valid code for `action`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationGrant {
    pub action: SensitiveAction,
    pub verified_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityActivity {
    pub action: SensitiveAction,
    pub channel: String,
    pub verified: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecuritySettings {
    pub two_factor_enabled: bool,
    pub two_factor_method: TwoFactorMethod,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub whatsapp_verified: bool,
    /// Channels the user has contact details for.
    pub available_channels: Vec<Channel>,
    pub recent_activity: Vec<SecurityActivity>,
}

#[async_trait::async_trait]
pub trait SecurityService: Send + Sync {
    /// Issues a code over the user's configured channels (email when 2FA is off).
    ///
    /// # Errors
    ///
    /// [`SecurityError::ChannelUnavailable`] when no selected channel has a
    /// contact, [`SecurityError::ChannelDelivery`] when every dispatch failed.
    async fn send_code(
        &self,
        user_id: i32,
        action: SensitiveAction,
    ) -> Result<CodeDispatch, SecurityError>;

    /// Like [`SecurityService::send_code`] but over an explicit channel set.
    async fn send_code_over(
        &self,
        user_id: i32,
        action: SensitiveAction,
        method: TwoFactorMethod,
    ) -> Result<CodeDispatch, SecurityError>;

    /// Checks `code` against the newest pending code for `(user, action)`.
    /// A correct code is consumed.
    async fn verify_code(
        &self,
        user_id: i32,
        action: SensitiveAction,
        code: &str,
    ) -> Result<VerificationGrant, SecurityError>;

    /// Passes when 2FA is off or a grant for `action` is still fresh.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError::VerificationRequired`] otherwise.
    async fn ensure_verified(
        &self,
        user: &User,
        action: SensitiveAction,
    ) -> Result<(), SecurityError>;

    async fn settings(&self, user_id: i32) -> Result<SecuritySettings, SecurityError>;

    /// Turns 2FA on or off and picks the channel set. Changing settings while
    /// 2FA is on requires a `security_settings` grant.
    async fn update_two_factor_settings(
        &self,
        user_id: i32,
        enabled: bool,
        method: TwoFactorMethod,
    ) -> Result<SecuritySettings, SecurityError>;
}

/// Masks a contact for display: `a***@example.com`, `******5678`.
#[must_use]
pub fn mask_contact(contact: &str) -> String {
    if let Some((local, domain)) = contact.split_once('@') {
        let first: String = local.chars().take(1).collect();
        return format!("{first}***@{domain}");
    }

    let chars: Vec<char> = contact.chars().collect();
    let visible = chars.len().min(4);
    let hidden = chars.len() - visible;
    let tail: String = chars[hidden..].iter().collect();
    format!("{}{tail}", "*".repeat(hidden))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_email_and_phone() {
        assert_eq!(mask_contact("ana@example.com"), "a***@example.com");
        assert_eq!(mask_contact("+525512345678"), "*********5678");
        assert_eq!(mask_contact("123"), "123");
    }

    #[test]
    fn machine_codes() {
        assert_eq!(
            SecurityError::CodeMismatch { attempts_left: 2 }.code(),
            Some("CODE_MISMATCH")
        );
        assert_eq!(
            SecurityError::VerificationRequired(SensitiveAction::AdminAccess).code(),
            Some("VERIFICATION_REQUIRED")
        );
        assert_eq!(SecurityError::UserNotFound.code(), None);
    }
}
