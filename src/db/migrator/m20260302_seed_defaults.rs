use crate::entities::{payment_configs, prelude::*, transfer_discount_config, users};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::Query;

#[derive(DeriveMigrationName)]
pub struct Migration;

pub const DEFAULT_ADMIN_EMAIL: &str = "admin@mercadoboom.mx";

pub const DEFAULT_ADMIN_PASSWORD: &str = "password";

/// Default API key (will be regenerated on first use if desired)
pub const DEFAULT_API_KEY: &str = "mercadoboom_default_api_key_please_regenerate";

fn hash_default_password() -> Result<String, DbErr> {
    use argon2::{
        Argon2,
        password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
    };

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(DEFAULT_ADMIN_PASSWORD.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbErr::Custom(format!("Failed to hash default password: {e}")))
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let now = chrono::Utc::now().to_rfc3339();
        let password_hash = hash_default_password()?;

        let admin = Query::insert()
            .into_table(Users)
            .columns([
                users::Column::Name,
                users::Column::Email,
                users::Column::PasswordHash,
                users::Column::ApiKey,
                users::Column::Role,
                users::Column::TwoFactorEnabled,
                users::Column::TwoFactorMethod,
                users::Column::EmailVerified,
                users::Column::PhoneVerified,
                users::Column::WhatsappVerified,
                users::Column::IsBlocked,
                users::Column::CreatedAt,
                users::Column::UpdatedAt,
            ])
            .values_panic([
                "Administrador".into(),
                DEFAULT_ADMIN_EMAIL.into(),
                password_hash.into(),
                DEFAULT_API_KEY.into(),
                "admin".into(),
                false.into(),
                "email".into(),
                true.into(),
                false.into(),
                false.into(),
                false.into(),
                now.clone().into(),
                now.clone().into(),
            ])
            .to_owned();
        manager.exec_stmt(admin).await?;

        let discount = Query::insert()
            .into_table(TransferDiscountConfig)
            .columns([
                transfer_discount_config::Column::Id,
                transfer_discount_config::Column::DiscountPercentage,
                transfer_discount_config::Column::Message,
                transfer_discount_config::Column::IsActive,
                transfer_discount_config::Column::UpdatedAt,
            ])
            .values_panic([
                1.into(),
                "3.50".into(),
                "Paga con transferencia bancaria y obtén un descuento".into(),
                true.into(),
                now.clone().into(),
            ])
            .to_owned();
        manager.exec_stmt(discount).await?;

        // Gateways start disabled until an admin fills in real credentials.
        let gateways = [
            (
                "mercadopago",
                "Mercado Pago",
                serde_json::json!({
                    "publicKey": "TEST-public-key",
                    "accessToken": "TEST-access-token",
                    "sandbox": true
                }),
            ),
            (
                "bank_transfer",
                "Transferencia bancaria",
                serde_json::json!({
                    "bankName": "Por configurar",
                    "accountHolder": "MercadoBoom",
                    "clabe": "000000000000000000"
                }),
            ),
        ];

        for (gateway, display_name, config) in gateways {
            let insert = Query::insert()
                .into_table(PaymentConfigs)
                .columns([
                    payment_configs::Column::Gateway,
                    payment_configs::Column::DisplayName,
                    payment_configs::Column::IsActive,
                    payment_configs::Column::Config,
                    payment_configs::Column::CreatedAt,
                    payment_configs::Column::UpdatedAt,
                ])
                .values_panic([
                    gateway.into(),
                    display_name.into(),
                    false.into(),
                    config.to_string().into(),
                    now.clone().into(),
                    now.clone().into(),
                ])
                .to_owned();
            manager.exec_stmt(insert).await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(PaymentConfigs).to_owned())
            .await?;
        manager
            .exec_stmt(Query::delete().from_table(TransferDiscountConfig).to_owned())
            .await?;
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(Users)
                    .and_where(Expr::col(users::Column::Email).eq(DEFAULT_ADMIN_EMAIL))
                    .to_owned(),
            )
            .await
    }
}
