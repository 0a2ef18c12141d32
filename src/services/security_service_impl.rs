//! `SeaORM` implementation of the `SecurityService` trait.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::repositories::user::{hash_password, verify_hash};
use crate::db::{Store, User};
use crate::domain::{Channel, SensitiveAction, TwoFactorMethod};
use crate::services::notifier::{Notifier, OutboundMessage};
use crate::services::security_service::{
    CodeDispatch, SecurityActivity, SecurityError, SecurityService, SecuritySettings,
    VerificationGrant, mask_contact,
};

const RECENT_ACTIVITY_LIMIT: u64 = 10;

pub struct SeaOrmSecurityService {
    store: Store,
    config: Arc<RwLock<Config>>,
    notifier: Arc<dyn Notifier>,
}

impl SeaOrmSecurityService {
    #[must_use]
    pub fn new(store: Store, config: Arc<RwLock<Config>>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            config,
            notifier,
        }
    }

    async fn load_user(&self, user_id: i32) -> Result<User, SecurityError> {
        self.store
            .users()
            .get_by_id(user_id)
            .await?
            .ok_or(SecurityError::UserNotFound)
    }

    async fn build_settings(&self, user: &User) -> Result<SecuritySettings, SecurityError> {
        let recent_activity = self
            .store
            .security_logs()
            .list_for_user(user.id, RECENT_ACTIVITY_LIMIT)
            .await?
            .into_iter()
            .map(|log| SecurityActivity {
                action: log.action,
                channel: log.channel,
                verified: log.verified,
                created_at: log.created_at,
            })
            .collect();

        Ok(SecuritySettings {
            two_factor_enabled: user.two_factor_enabled,
            two_factor_method: user.two_factor_method,
            email_verified: user.email_verified,
            phone_verified: user.phone_verified,
            whatsapp_verified: user.whatsapp_verified,
            available_channels: Channel::ALL
                .iter()
                .copied()
                .filter(|c| user.contact_for(*c).is_some())
                .collect(),
            recent_activity,
        })
    }
}

fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

fn subject_for(action: SensitiveAction) -> &'static str {
    match action {
        SensitiveAction::AdminAccess => "Acceso al panel de administración",
        SensitiveAction::HighValueOrder => "Confirmación de compra",
        SensitiveAction::ProfileUpdate => "Cambio de datos de perfil",
        SensitiveAction::PaymentChange => "Cambio de métodos de pago",
        SensitiveAction::SecuritySettings => "Cambio de seguridad",
        SensitiveAction::PasswordReset => "Recuperación de contraseña",
    }
}

#[async_trait]
impl SecurityService for SeaOrmSecurityService {
    async fn send_code(
        &self,
        user_id: i32,
        action: SensitiveAction,
    ) -> Result<CodeDispatch, SecurityError> {
        let user = self.load_user(user_id).await?;
        let method = if user.two_factor_enabled {
            user.two_factor_method
        } else {
            TwoFactorMethod::EMAIL
        };

        self.send_code_over(user.id, action, method).await
    }

    async fn send_code_over(
        &self,
        user_id: i32,
        action: SensitiveAction,
        method: TwoFactorMethod,
    ) -> Result<CodeDispatch, SecurityError> {
        let user = self.load_user(user_id).await?;
        let security = self.config.read().await.security.clone();
        let verification = &security.verification;

        let targets: Vec<(Channel, String)> = method
            .channels()
            .filter_map(|c| user.contact_for(c).map(|to| (c, to.to_string())))
            .collect();

        if targets.is_empty() {
            return Err(SecurityError::ChannelUnavailable);
        }

        let code = generate_code(verification.code_length);
        let code_for_hash = code.clone();
        let hash_config = security.clone();
        let code_hash =
            task::spawn_blocking(move || hash_password(&code_for_hash, Some(&hash_config)))
                .await
                .map_err(|e| SecurityError::Internal(format!("Code hashing task failed: {e}")))??;

        let body = format!(
            "Tu código de verificación MercadoBoom es {code}. Expira en {} minutos. \
             No lo compartas con nadie.",
            verification.code_ttl_minutes
        );

        let mut delivered = Vec::new();
        let mut sent_to = Vec::new();
        let mut last_error = None;
        for (channel, to) in targets {
            let message = OutboundMessage {
                channel,
                to,
                subject: subject_for(action).to_string(),
                body: body.clone(),
            };
            match self.notifier.send(&message).await {
                Ok(()) => {
                    metrics::counter!("security_codes_sent_total", "channel" => channel.as_str())
                        .increment(1);
                    delivered.push(channel);
                    sent_to.push(mask_contact(&message.to));
                }
                Err(e) => {
                    warn!(user_id, %channel, error = %e, "Code delivery failed");
                    last_error = Some(e.to_string());
                }
            }
        }

        let Some(delivered_method) = TwoFactorMethod::from_channels(delivered.iter().copied())
        else {
            return Err(SecurityError::ChannelDelivery(
                last_error.unwrap_or_else(|| "sin respuesta del proveedor".to_string()),
            ));
        };

        let expires_at = Utc::now() + chrono::Duration::minutes(verification.code_ttl_minutes);
        self.store
            .security_logs()
            .insert(
                user.id,
                action,
                delivered_method.as_str(),
                code_hash,
                expires_at,
            )
            .await?;

        info!(user_id, %action, channels = %delivered_method, "Verification code issued");

        Ok(CodeDispatch {
            action,
            channels: delivered,
            sent_to,
            expires_at,
        })
    }

    async fn verify_code(
        &self,
        user_id: i32,
        action: SensitiveAction,
        code: &str,
    ) -> Result<VerificationGrant, SecurityError> {
        let verification = self.config.read().await.security.verification.clone();
        let logs = self.store.security_logs();

        let log = logs
            .latest(user_id, action)
            .await?
            .filter(|log| !log.verified)
            .ok_or(SecurityError::NoPendingCode)?;

        let now = Utc::now();
        if now > log.expires_at {
            metrics::counter!("security_codes_verified_total", "result" => "expired").increment(1);
            return Err(SecurityError::CodeExpired);
        }

        if !logs
            .reserve_attempt(log.id, verification.max_attempts)
            .await?
        {
            if logs.get(log.id).await?.is_some_and(|l| l.verified) {
                return Err(SecurityError::NoPendingCode);
            }
            metrics::counter!("security_codes_verified_total", "result" => "locked").increment(1);
            return Err(SecurityError::TooManyAttempts);
        }

        let candidate = code.trim().to_string();
        let code_hash = log.code_hash.clone();
        let matches = task::spawn_blocking(move || verify_hash(&candidate, &code_hash))
            .await
            .map_err(|e| SecurityError::Internal(format!("Code check task failed: {e}")))??;

        if !matches {
            metrics::counter!("security_codes_verified_total", "result" => "mismatch")
                .increment(1);
            let used = logs
                .get(log.id)
                .await?
                .map_or(log.attempts + 1, |l| l.attempts);
            return Err(SecurityError::CodeMismatch {
                attempts_left: (verification.max_attempts - used).max(0),
            });
        }

        if !logs.mark_verified(log.id, now).await? {
            // A concurrent request consumed the same code.
            return Err(SecurityError::NoPendingCode);
        }

        if let Ok(method) = log.channel.parse::<TwoFactorMethod>() {
            self.store
                .users()
                .mark_channels_verified(user_id, method)
                .await?;
        }

        metrics::counter!("security_codes_verified_total", "result" => "ok").increment(1);
        info!(user_id, %action, "Verification code accepted");

        Ok(VerificationGrant {
            action,
            verified_at: now,
            valid_until: now + chrono::Duration::minutes(verification.grant_ttl_minutes),
        })
    }

    async fn ensure_verified(
        &self,
        user: &User,
        action: SensitiveAction,
    ) -> Result<(), SecurityError> {
        if !user.two_factor_enabled {
            return Ok(());
        }

        let grant_ttl = self.config.read().await.security.verification.grant_ttl_minutes;
        let fresh = self
            .store
            .security_logs()
            .latest_verified(user.id, action)
            .await?
            .and_then(|log| log.verified_at)
            .is_some_and(|at| Utc::now() <= at + chrono::Duration::minutes(grant_ttl));

        if fresh {
            Ok(())
        } else {
            Err(SecurityError::VerificationRequired(action))
        }
    }

    async fn settings(&self, user_id: i32) -> Result<SecuritySettings, SecurityError> {
        let user = self.load_user(user_id).await?;
        self.build_settings(&user).await
    }

    async fn update_two_factor_settings(
        &self,
        user_id: i32,
        enabled: bool,
        method: TwoFactorMethod,
    ) -> Result<SecuritySettings, SecurityError> {
        let user = self.load_user(user_id).await?;

        self.ensure_verified(&user, SensitiveAction::SecuritySettings)
            .await?;

        if enabled && !method.channels().any(|c| user.contact_for(c).is_some()) {
            return Err(SecurityError::ChannelUnavailable);
        }

        let updated = self
            .store
            .users()
            .update_two_factor(user.id, enabled, method)
            .await?;

        info!(user_id, enabled, method = %method, "Two-factor settings updated");
        self.build_settings(&updated).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_numeric_with_requested_length() {
        for length in [4, 6, 8] {
            let code = generate_code(length);
            assert_eq!(code.len(), length);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }
}
