use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use tokio::task;

use crate::config::SecurityConfig;
use crate::domain::{Channel, TwoFactorMethod, UserRole};
use crate::entities::users;

/// User data returned from repository (without sensitive password hash)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip)]
    pub api_key: String,
    pub role: UserRole,
    pub two_factor_enabled: bool,
    pub two_factor_method: TwoFactorMethod,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub whatsapp_verified: bool,
    pub is_blocked: bool,
    pub blocked_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Where a code for `channel` would be delivered, if the user has one.
    #[must_use]
    pub fn contact_for(&self, channel: Channel) -> Option<&str> {
        let contact = match channel {
            Channel::Email => Some(self.email.as_str()),
            Channel::Sms | Channel::WhatsApp => self.phone.as_deref(),
        };
        contact.filter(|c| !c.trim().is_empty())
    }
}

impl TryFrom<users::Model> for User {
    type Error = anyhow::Error;

    fn try_from(model: users::Model) -> Result<Self> {
        Ok(Self {
            role: model
                .role
                .parse()
                .with_context(|| format!("Corrupt role for user {}", model.id))?,
            two_factor_method: model
                .two_factor_method
                .parse()
                .with_context(|| format!("Corrupt two-factor method for user {}", model.id))?,
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            api_key: model.api_key,
            two_factor_enabled: model.two_factor_enabled,
            email_verified: model.email_verified,
            phone_verified: model.phone_verified,
            whatsapp_verified: model.whatsapp_verified,
            is_blocked: model.is_blocked,
            blocked_reason: model.blocked_reason,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: UserRole,
}

pub struct UserRepository {
    conn: DatabaseConnection,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Inserts a user. Returns `None` if the email is already taken.
    pub async fn create(&self, new: NewUser, config: &SecurityConfig) -> Result<Option<User>> {
        if self.get_by_email(&new.email).await?.is_some() {
            return Ok(None);
        }

        let password = new.password;
        let config = config.clone();
        let password_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let now = chrono::Utc::now().to_rfc3339();
        let active = users::ActiveModel {
            name: Set(new.name),
            email: Set(new.email),
            phone: Set(new.phone),
            password_hash: Set(password_hash),
            api_key: Set(generate_api_key()),
            role: Set(new.role.as_str().to_string()),
            two_factor_enabled: Set(false),
            two_factor_method: Set(TwoFactorMethod::default().as_str().to_string()),
            email_verified: Set(false),
            phone_verified: Set(false),
            whatsapp_verified: Set(false),
            is_blocked: Set(false),
            blocked_reason: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(User::try_from(model)?)),
            Err(e) if matches!(e.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) => {
                Ok(None)
            }
            Err(e) => Err(e).context("Failed to insert user"),
        }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<User>> {
        let user = users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user by ID")?;

        user.map(User::try_from).transpose()
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user by email")?;

        user.map(User::try_from).transpose()
    }

    /// Looks a user up by email or phone number.
    pub async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(
                Condition::any()
                    .add(users::Column::Email.eq(identifier))
                    .add(users::Column::Phone.eq(identifier)),
            )
            .order_by_asc(users::Column::Id)
            .one(&self.conn)
            .await
            .context("Failed to query user by identifier")?;

        user.map(User::try_from).transpose()
    }

    pub async fn list_all(&self) -> Result<Vec<User>> {
        let rows = users::Entity::find()
            .order_by_asc(users::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list users")?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Checks a password and returns the user on success.
    /// Note: This uses `spawn_blocking` because Argon2 hashing is CPU-intensive
    /// and would block the async runtime if run directly.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query user for password verification")?;

        let Some(user) = user else {
            return Ok(None);
        };

        let password_hash = user.password_hash.clone();
        let password = password.to_string();

        let is_valid = task::spawn_blocking(move || verify_hash(&password, &password_hash))
            .await
            .context("Password verification task panicked")??;

        if is_valid {
            Ok(Some(User::try_from(user)?))
        } else {
            Ok(None)
        }
    }

    pub async fn update_password(
        &self,
        id: i32,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        let user = self.find_model(id).await?;

        let password = new_password.to_string();
        let config = config.clone();
        let new_hash = task::spawn_blocking(move || hash_password(&password, Some(&config)))
            .await
            .context("Password hashing task panicked")??;

        let mut active: users::ActiveModel = user.into();
        active.password_hash = Set(new_hash);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn update_profile(
        &self,
        id: i32,
        name: String,
        phone: Option<String>,
    ) -> Result<User> {
        let user = self.find_model(id).await?;
        let phone_changed = user.phone != phone;

        let mut active: users::ActiveModel = user.into();
        active.name = Set(name);
        if phone_changed {
            // A new number has not been proven yet.
            active.phone_verified = Set(false);
            active.whatsapp_verified = Set(false);
        }
        active.phone = Set(phone);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        User::try_from(active.update(&self.conn).await?)
    }

    pub async fn update_two_factor(
        &self,
        id: i32,
        enabled: bool,
        method: TwoFactorMethod,
    ) -> Result<User> {
        let user = self.find_model(id).await?;

        let mut active: users::ActiveModel = user.into();
        active.two_factor_enabled = Set(enabled);
        active.two_factor_method = Set(method.as_str().to_string());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        User::try_from(active.update(&self.conn).await?)
    }

    /// Records that a code delivered over these channels was entered correctly.
    pub async fn mark_channels_verified(&self, id: i32, method: TwoFactorMethod) -> Result<()> {
        let user = self.find_model(id).await?;

        let mut active: users::ActiveModel = user.into();
        for channel in method.channels() {
            match channel {
                Channel::Email => active.email_verified = Set(true),
                Channel::Sms => active.phone_verified = Set(true),
                Channel::WhatsApp => active.whatsapp_verified = Set(true),
            }
        }
        active.update(&self.conn).await?;

        Ok(())
    }

    pub async fn set_blocked(
        &self,
        id: i32,
        blocked: bool,
        reason: Option<String>,
    ) -> Result<Option<User>> {
        let Some(user) = users::Entity::find_by_id(id).one(&self.conn).await? else {
            return Ok(None);
        };

        let mut active: users::ActiveModel = user.into();
        active.is_blocked = Set(blocked);
        active.blocked_reason = Set(if blocked { reason } else { None });
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        Ok(Some(User::try_from(active.update(&self.conn).await?)?))
    }

    /// Verify API key and return the associated user
    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        let user = users::Entity::find()
            .filter(users::Column::ApiKey.eq(api_key))
            .one(&self.conn)
            .await
            .context("Failed to query user by API key")?;

        user.map(User::try_from).transpose()
    }

    /// Regenerate API key for a user
    pub async fn regenerate_api_key(&self, id: i32) -> Result<String> {
        let user = self.find_model(id).await?;

        let new_api_key = generate_api_key();

        let mut active: users::ActiveModel = user.into();
        active.api_key = Set(new_api_key.clone());
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(&self.conn).await?;

        Ok(new_api_key)
    }

    async fn find_model(&self, id: i32) -> Result<users::Model> {
        users::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query user")?
            .ok_or_else(|| anyhow::anyhow!("User not found: {id}"))
    }
}

/// Hash a secret using Argon2id with optional custom params.
/// If config is None, uses default (high memory) params.
pub fn hash_password(password: &str, config: Option<&SecurityConfig>) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = if let Some(cfg) = config {
        let params = Params::new(
            cfg.argon2_memory_cost_kib,
            cfg.argon2_time_cost,
            cfg.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    } else {
        Argon2::default()
    };

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Checks a secret against a stored PHC hash. The params are read from the hash.
pub fn verify_hash(secret: &str, hash: &str) -> Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Generate a random API key (64 character hex string)
#[must_use]
pub fn generate_api_key() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();

    bytes.iter().fold(String::with_capacity(64), |mut acc, b| {
        use std::fmt::Write;
        let _ = write!(acc, "{b:02x}");
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> SecurityConfig {
        SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        }
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("secreto123", Some(&fast_config())).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_hash("secreto123", &hash).unwrap());
        assert!(!verify_hash("otro", &hash).unwrap());
    }

    #[test]
    fn api_key_is_64_hex_chars() {
        let key = generate_api_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_api_key());
    }
}
