//! Domain service for authentication and account management.
//!
//! Handles registration, login, profile changes, API keys and password
//! recovery through the verification gate.

use serde::Deserialize;
use thiserror::Error;

use crate::db::User;
use crate::domain::TwoFactorMethod;
use crate::services::security_service::SecurityError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Correo o contraseña incorrectos")]
    InvalidCredentials,

    #[error("La cuenta está bloqueada")]
    Blocked(Option<String>),

    #[error("Ya existe una cuenta con ese correo")]
    EmailTaken,

    #[error("Usuario no encontrado")]
    UserNotFound,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::Blocked(_) => Some("ACCOUNT_BLOCKED"),
            Self::EmailTaken => Some("EMAIL_TAKEN"),
            Self::Security(e) => e.code(),
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates a customer account.
    async fn register(&self, request: RegisterRequest) -> Result<User, AuthError>;

    /// Verifies credentials.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] on a wrong email or password,
    /// [`AuthError::Blocked`] when the account is blocked.
    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError>;

    /// Loads the user behind a session or API key, refusing blocked accounts.
    async fn active_user(&self, user_id: i32) -> Result<User, AuthError>;

    async fn authenticate_api_key(&self, api_key: &str) -> Result<Option<User>, AuthError>;

    /// Changes name and phone. Requires a `profile_update` grant when 2FA is on.
    async fn update_profile(
        &self,
        user: &User,
        name: &str,
        phone: Option<String>,
    ) -> Result<User, AuthError>;

    async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    async fn regenerate_api_key(&self, user_id: i32) -> Result<String, AuthError>;

    /// Sends a `password_reset` code when `identifier` (email or phone)
    /// resolves to an account with a contact on `method`. Unknown
    /// identifiers are indistinguishable from known ones.
    async fn request_password_reset(
        &self,
        identifier: &str,
        method: TwoFactorMethod,
    ) -> Result<(), AuthError>;

    async fn confirm_password_reset(
        &self,
        identifier: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::Validation(format!(
            "La contraseña debe tener al menos {MIN_PASSWORD_LENGTH} caracteres"
        )));
    }
    Ok(())
}

pub fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));

    if valid && !email.contains(char::is_whitespace) {
        Ok(email)
    } else {
        Err(AuthError::Validation("El correo no es válido".to_string()))
    }
}

/// Accepts `+` followed by 10 to 15 digits, or 10 bare digits (Mexican
/// national format, stored with `+52`).
pub fn normalize_phone(phone: &str) -> Result<String, AuthError> {
    let compact: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let (plus, digits) = compact
        .strip_prefix('+')
        .map_or((false, compact.as_str()), |rest| (true, rest));

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::Validation("El teléfono no es válido".to_string()));
    }

    match (plus, digits.len()) {
        (true, 10..=15) => Ok(format!("+{digits}")),
        (false, 10) => Ok(format!("+52{digits}")),
        _ => Err(AuthError::Validation("El teléfono no es válido".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_normalization() {
        assert_eq!(
            normalize_email("  Ana@Example.COM ").unwrap(),
            "ana@example.com"
        );
        assert!(normalize_email("ana").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ana@localhost").is_err());
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("55 1234 5678").unwrap(), "+525512345678");
        assert_eq!(normalize_phone("+52 (55) 1234-5678").unwrap(), "+525512345678");
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("+52abc").is_err());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }
}
