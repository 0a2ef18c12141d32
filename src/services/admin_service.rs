//! Domain service behind the admin panel and the storefront display data.
//!
//! Covers payment gateway configuration, the transfer discount, the product
//! catalog, banners and special offers, and user blocking.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::db::{
    Banner, BannerInput, DiscountConfig, OfferInput, PaymentConfig, Product, ProductInput,
    SpecialOffer, User,
};
use crate::domain::PaymentGateway;
use crate::domain::payment::SettingsError;
use crate::services::security_service::SecurityError;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("{0} no encontrado")]
    NotFound(&'static str),

    #[error("Ya existe una configuración para {0}")]
    DuplicateGateway(PaymentGateway),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdminError {
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::DuplicateGateway(_) => Some("DUPLICATE_GATEWAY"),
            Self::Security(e) => e.code(),
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for AdminError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AdminError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Admin view of a gateway config, secrets included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfigView {
    pub id: i32,
    pub gateway: PaymentGateway,
    pub display_name: String,
    pub is_active: bool,
    pub config: Value,
    pub created_at: String,
    pub updated_at: String,
}

impl From<PaymentConfig> for PaymentConfigView {
    fn from(config: PaymentConfig) -> Self {
        Self {
            id: config.id,
            gateway: config.gateway,
            display_name: config.display_name,
            is_active: config.is_active,
            config: config.settings.to_value(),
            created_at: config.created_at,
            updated_at: config.updated_at,
        }
    }
}

/// What shoppers see at checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub gateway: PaymentGateway,
    pub display_name: String,
    pub config: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentConfigRequest {
    pub gateway: PaymentGateway,
    pub display_name: String,
    #[serde(default)]
    pub is_active: bool,
    pub config: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentConfigRequest {
    pub display_name: Option<String>,
    pub is_active: Option<bool>,
    pub config: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountConfigRequest {
    pub discount_percentage: Decimal,
    #[serde(default)]
    pub message: Option<String>,
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerRequest {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub product_id: Option<i32>,
    #[serde(default)]
    pub discount_percentage: Option<Decimal>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

#[async_trait::async_trait]
pub trait AdminService: Send + Sync {
    async fn list_payment_configs(&self) -> Result<Vec<PaymentConfigView>, AdminError>;

    /// Registers a gateway. Requires a `payment_change` grant.
    ///
    /// # Errors
    ///
    /// [`AdminError::Settings`] when `config` does not fit the gateway,
    /// [`AdminError::DuplicateGateway`] when one already exists.
    async fn create_payment_config(
        &self,
        admin: &User,
        request: CreatePaymentConfigRequest,
    ) -> Result<PaymentConfigView, AdminError>;

    /// Requires a `payment_change` grant.
    async fn update_payment_config(
        &self,
        admin: &User,
        config_id: i32,
        request: UpdatePaymentConfigRequest,
    ) -> Result<PaymentConfigView, AdminError>;

    /// Active gateways with secrets stripped.
    async fn payment_methods(&self) -> Result<Vec<PaymentMethod>, AdminError>;

    async fn discount_config(&self) -> Result<DiscountConfig, AdminError>;

    /// Affects orders created afterwards only. Requires a `payment_change` grant.
    async fn update_discount_config(
        &self,
        admin: &User,
        request: DiscountConfigRequest,
    ) -> Result<DiscountConfig, AdminError>;

    async fn list_products(&self, active_only: bool) -> Result<Vec<Product>, AdminError>;

    /// Inactive products are hidden unless `include_inactive`.
    async fn get_product(
        &self,
        product_id: i32,
        include_inactive: bool,
    ) -> Result<Product, AdminError>;

    async fn create_product(&self, request: ProductRequest) -> Result<Product, AdminError>;

    async fn update_product(
        &self,
        product_id: i32,
        request: ProductRequest,
    ) -> Result<Product, AdminError>;

    async fn list_banners(&self, active_only: bool) -> Result<Vec<Banner>, AdminError>;

    async fn create_banner(&self, request: BannerRequest) -> Result<Banner, AdminError>;

    async fn update_banner(
        &self,
        banner_id: i32,
        request: BannerRequest,
    ) -> Result<Banner, AdminError>;

    async fn delete_banner(&self, banner_id: i32) -> Result<(), AdminError>;

    async fn list_offers(&self, active_only: bool) -> Result<Vec<SpecialOffer>, AdminError>;

    async fn create_offer(&self, request: OfferRequest) -> Result<SpecialOffer, AdminError>;

    async fn update_offer(
        &self,
        offer_id: i32,
        request: OfferRequest,
    ) -> Result<SpecialOffer, AdminError>;

    async fn delete_offer(&self, offer_id: i32) -> Result<(), AdminError>;

    async fn list_users(&self) -> Result<Vec<User>, AdminError>;

    /// Blocked users can no longer log in or use their API key.
    async fn set_user_blocked(
        &self,
        admin: &User,
        user_id: i32,
        blocked: bool,
        reason: Option<String>,
    ) -> Result<User, AdminError>;
}

fn required_text(value: &str, field: &str, max: usize) -> Result<String, AdminError> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > max {
        return Err(AdminError::Validation(format!(
            "El campo {field} es obligatorio (máximo {max} caracteres)"
        )));
    }
    Ok(value.to_string())
}

fn optional_url(value: Option<String>, field: &str) -> Result<Option<String>, AdminError> {
    let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if ["https://", "http://", "/"].iter().any(|p| url.starts_with(p)) {
        Ok(Some(url))
    } else {
        Err(AdminError::Validation(format!(
            "El campo {field} debe ser una URL"
        )))
    }
}

fn date_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), AdminError> {
    if let (Some(start), Some(end)) = (start, end)
        && end < start
    {
        return Err(AdminError::Validation(
            "La fecha de fin no puede ser anterior a la de inicio".to_string(),
        ));
    }
    Ok(())
}

impl ProductRequest {
    pub fn into_input(self) -> Result<ProductInput, AdminError> {
        if self.price.is_sign_negative() {
            return Err(AdminError::Validation(
                "El precio no puede ser negativo".to_string(),
            ));
        }
        if !crate::domain::money::has_cent_precision(self.price) {
            return Err(AdminError::Validation(
                "El precio admite como máximo dos decimales".to_string(),
            ));
        }
        if self.stock < 0 {
            return Err(AdminError::Validation(
                "El inventario no puede ser negativo".to_string(),
            ));
        }

        Ok(ProductInput {
            name: required_text(&self.name, "name", 200)?,
            description: self.description,
            price: self.price,
            stock: self.stock,
            category: self.category.filter(|c| !c.trim().is_empty()),
            image_url: optional_url(self.image_url, "imageUrl")?,
            is_active: self.is_active,
        })
    }
}

impl BannerRequest {
    pub fn into_input(self) -> Result<BannerInput, AdminError> {
        date_window(self.start_date, self.end_date)?;
        let image_url = optional_url(Some(self.image_url), "imageUrl")?
            .ok_or_else(|| AdminError::Validation("El campo imageUrl es obligatorio".to_string()))?;

        Ok(BannerInput {
            title: required_text(&self.title, "title", 200)?,
            subtitle: self.subtitle,
            image_url,
            link_url: optional_url(self.link_url, "linkUrl")?,
            display_order: self.display_order,
            is_active: self.is_active,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

impl OfferRequest {
    pub fn into_input(self) -> Result<OfferInput, AdminError> {
        date_window(self.start_date, self.end_date)?;
        if let Some(pct) = self.discount_percentage
            && !crate::domain::money::is_valid_percentage(pct)
        {
            return Err(AdminError::Validation(
                "El porcentaje de descuento debe estar entre 0 y 100".to_string(),
            ));
        }
        if self
            .discount_percentage
            .is_some_and(|pct| !crate::domain::money::has_cent_precision(pct))
        {
            return Err(AdminError::Validation(
                "El porcentaje de descuento admite como máximo dos decimales".to_string(),
            ));
        }

        Ok(OfferInput {
            title: required_text(&self.title, "title", 200)?,
            description: self.description,
            image_url: optional_url(self.image_url, "imageUrl")?,
            product_id: self.product_id,
            discount_percentage: self.discount_percentage,
            display_order: self.display_order,
            is_active: self.is_active,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn banner() -> BannerRequest {
        serde_json::from_value(serde_json::json!({
            "title": "Buen Fin",
            "imageUrl": "https://cdn.example.com/buen-fin.jpg"
        }))
        .unwrap()
    }

    #[test]
    fn banner_defaults_to_active() {
        let input = banner().into_input().unwrap();
        assert!(input.is_active);
        assert_eq!(input.display_order, 0);
    }

    #[test]
    fn banner_rejects_inverted_window() {
        let mut request = banner();
        request.start_date = Some(Utc.with_ymd_and_hms(2026, 11, 20, 0, 0, 0).unwrap());
        request.end_date = Some(Utc.with_ymd_and_hms(2026, 11, 10, 0, 0, 0).unwrap());
        assert!(request.into_input().is_err());
    }

    #[test]
    fn banner_requires_url() {
        let mut request = banner();
        request.image_url = "buen-fin.jpg".to_string();
        assert!(request.into_input().is_err());
    }

    #[test]
    fn offer_percentage_must_be_in_range() {
        let request: OfferRequest = serde_json::from_value(serde_json::json!({
            "title": "2x1",
            "discountPercentage": "150"
        }))
        .unwrap();
        assert!(request.into_input().is_err());
    }

    #[test]
    fn product_price_rejects_fractional_cents() {
        let request: ProductRequest = serde_json::from_value(serde_json::json!({
            "name": "Audífonos",
            "price": "199.999",
            "stock": 3
        }))
        .unwrap();
        assert!(request.into_input().is_err());
    }

    #[test]
    fn product_rejects_negative_values() {
        let request: ProductRequest = serde_json::from_value(serde_json::json!({
            "name": "Audífonos",
            "price": "-1.00",
            "stock": 3
        }))
        .unwrap();
        assert!(request.into_input().is_err());
    }
}
