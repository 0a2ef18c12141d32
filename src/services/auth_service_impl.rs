//! `SeaORM` implementation of the `AuthService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{NewUser, Store, User};
use crate::domain::{SensitiveAction, TwoFactorMethod, UserRole};
use crate::services::auth_service::{
    AuthError, AuthService, RegisterRequest, normalize_email, normalize_phone, validate_password,
};
use crate::services::security_service::{SecurityError, SecurityService};

pub struct SeaOrmAuthService {
    store: Store,
    config: Arc<RwLock<Config>>,
    security: Arc<dyn SecurityService>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub fn new(
        store: Store,
        config: Arc<RwLock<Config>>,
        security: Arc<dyn SecurityService>,
    ) -> Self {
        Self {
            store,
            config,
            security,
        }
    }
}

fn ensure_not_blocked(user: User) -> Result<User, AuthError> {
    if user.is_blocked {
        return Err(AuthError::Blocked(user.blocked_reason));
    }
    Ok(user)
}

fn clean_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 120 {
        return Err(AuthError::Validation(
            "El nombre es obligatorio (máximo 120 caracteres)".to_string(),
        ));
    }
    Ok(name.to_string())
}

/// Canonical form of a login identifier: lowercase email or `+`-prefixed phone.
fn canonical_identifier(identifier: &str) -> String {
    let identifier = identifier.trim();
    if identifier.contains('@') {
        identifier.to_lowercase()
    } else {
        normalize_phone(identifier).unwrap_or_else(|_| identifier.to_string())
    }
}

fn clean_phone(phone: Option<String>) -> Result<Option<String>, AuthError> {
    phone
        .filter(|p| !p.trim().is_empty())
        .map(|p| normalize_phone(&p))
        .transpose()
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, request: RegisterRequest) -> Result<User, AuthError> {
        let name = clean_name(&request.name)?;
        let email = normalize_email(&request.email)?;
        let phone = clean_phone(request.phone)?;
        validate_password(&request.password)?;

        let security = self.config.read().await.security.clone();
        let user = self
            .store
            .users()
            .create(
                NewUser {
                    name,
                    email,
                    phone,
                    password: request.password,
                    role: UserRole::Customer,
                },
                &security,
            )
            .await?
            .ok_or(AuthError::EmailTaken)?;

        info!(user_id = user.id, "Customer registered");
        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = email.trim().to_lowercase();
        let user = self
            .store
            .users()
            .verify_credentials(&email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let user = ensure_not_blocked(user).inspect_err(|_| {
            warn!("Blocked account attempted to log in");
        })?;

        info!(user_id = user.id, "User logged in");
        Ok(user)
    }

    async fn active_user(&self, user_id: i32) -> Result<User, AuthError> {
        let user = self
            .store
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        ensure_not_blocked(user)
    }

    async fn authenticate_api_key(&self, api_key: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.users().verify_api_key(api_key).await?)
    }

    async fn update_profile(
        &self,
        user: &User,
        name: &str,
        phone: Option<String>,
    ) -> Result<User, AuthError> {
        let name = clean_name(name)?;
        let phone = clean_phone(phone)?;

        self.security
            .ensure_verified(user, SensitiveAction::ProfileUpdate)
            .await?;

        let updated = self
            .store
            .users()
            .update_profile(user.id, name, phone)
            .await?;

        info!(user_id = user.id, "Profile updated");
        Ok(updated)
    }

    async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;

        if current_password == new_password {
            return Err(AuthError::Validation(
                "La nueva contraseña debe ser distinta de la actual".to_string(),
            ));
        }

        let valid = self
            .store
            .users()
            .verify_credentials(&user.email, current_password)
            .await?
            .is_some();

        if !valid {
            return Err(AuthError::Validation(
                "La contraseña actual es incorrecta".to_string(),
            ));
        }

        let security = self.config.read().await.security.clone();
        self.store
            .users()
            .update_password(user.id, new_password, &security)
            .await?;

        info!(user_id = user.id, "Password changed");
        Ok(())
    }

    async fn regenerate_api_key(&self, user_id: i32) -> Result<String, AuthError> {
        let key = self.store.users().regenerate_api_key(user_id).await?;
        info!(user_id, "API key regenerated");
        Ok(key)
    }

    async fn request_password_reset(
        &self,
        identifier: &str,
        method: TwoFactorMethod,
    ) -> Result<(), AuthError> {
        let Some(user) = self
            .store
            .users()
            .find_by_identifier(&canonical_identifier(identifier))
            .await?
        else {
            info!("Password reset requested for unknown identifier");
            return Ok(());
        };

        if user.is_blocked {
            return Ok(());
        }

        // Failures stay invisible to the caller so the answer never reveals
        // whether the account exists.
        if let Err(e) = self
            .security
            .send_code_over(user.id, SensitiveAction::PasswordReset, method)
            .await
        {
            warn!(user_id = user.id, error = %e, "Password reset code not sent");
        }

        Ok(())
    }

    async fn confirm_password_reset(
        &self,
        identifier: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_password(new_password)?;

        let user = self
            .store
            .users()
            .find_by_identifier(&canonical_identifier(identifier))
            .await?
            .ok_or(SecurityError::NoPendingCode)?;

        self.security
            .verify_code(user.id, SensitiveAction::PasswordReset, code)
            .await?;

        let security = self.config.read().await.security.clone();
        self.store
            .users()
            .update_password(user.id, new_password, &security)
            .await?;

        info!(user_id = user.id, "Password reset completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_canonicalized() {
        assert_eq!(canonical_identifier(" Ana@Example.com "), "ana@example.com");
        assert_eq!(canonical_identifier("55 1234 5678"), "+525512345678");
        assert_eq!(canonical_identifier("cliente-42"), "cliente-42");
    }

    #[test]
    fn blank_phone_means_none() {
        assert_eq!(clean_phone(Some("  ".to_string())).unwrap(), None);
        assert!(clean_phone(Some("abc".to_string())).is_err());
    }
}
