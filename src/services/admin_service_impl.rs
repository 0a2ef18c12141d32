//! `SeaORM` implementation of the `AdminService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::db::{
    Banner, DiscountConfig, PaymentConfigPatch, Product, SpecialOffer, Store, User,
};
use crate::domain::money::{has_cent_precision, is_valid_percentage};
use crate::domain::{GatewaySettings, SensitiveAction, round_money};
use crate::services::admin_service::{
    AdminError, AdminService, BannerRequest, CreatePaymentConfigRequest, DiscountConfigRequest,
    OfferRequest, PaymentConfigView, PaymentMethod, ProductRequest, UpdatePaymentConfigRequest,
};
use crate::services::security_service::SecurityService;

const MAX_DISCOUNT_MESSAGE: usize = 500;

pub struct SeaOrmAdminService {
    store: Store,
    security: Arc<dyn SecurityService>,
}

impl SeaOrmAdminService {
    #[must_use]
    pub fn new(store: Store, security: Arc<dyn SecurityService>) -> Self {
        Self { store, security }
    }

    async fn ensure_product_exists(&self, product_id: Option<i32>) -> Result<(), AdminError> {
        if let Some(id) = product_id
            && self.store.products().get(id).await?.is_none()
        {
            return Err(AdminError::NotFound("Producto"));
        }
        Ok(())
    }
}

#[async_trait]
impl AdminService for SeaOrmAdminService {
    async fn list_payment_configs(&self) -> Result<Vec<PaymentConfigView>, AdminError> {
        let configs = self.store.payment_configs().list(false).await?;
        Ok(configs.into_iter().map(PaymentConfigView::from).collect())
    }

    async fn create_payment_config(
        &self,
        admin: &User,
        request: CreatePaymentConfigRequest,
    ) -> Result<PaymentConfigView, AdminError> {
        self.security
            .ensure_verified(admin, SensitiveAction::PaymentChange)
            .await?;

        let display_name = request.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(AdminError::Validation(
                "El nombre visible es obligatorio".to_string(),
            ));
        }
        let settings = GatewaySettings::parse(request.gateway, &request.config)?;

        let created = self
            .store
            .payment_configs()
            .create(display_name, request.is_active, settings)
            .await?
            .ok_or(AdminError::DuplicateGateway(request.gateway))?;

        info!(
            admin_id = admin.id,
            gateway = %created.gateway,
            active = created.is_active,
            "Payment config created"
        );
        Ok(created.into())
    }

    async fn update_payment_config(
        &self,
        admin: &User,
        config_id: i32,
        request: UpdatePaymentConfigRequest,
    ) -> Result<PaymentConfigView, AdminError> {
        self.security
            .ensure_verified(admin, SensitiveAction::PaymentChange)
            .await?;

        let existing = self
            .store
            .payment_configs()
            .get(config_id)
            .await?
            .ok_or(AdminError::NotFound("Configuración de pago"))?;

        let display_name = request
            .display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let settings = request
            .config
            .map(|value| GatewaySettings::parse(existing.gateway, &value))
            .transpose()?;

        let updated = self
            .store
            .payment_configs()
            .update(
                existing.id,
                PaymentConfigPatch {
                    display_name,
                    is_active: request.is_active,
                    settings,
                },
            )
            .await?
            .ok_or(AdminError::NotFound("Configuración de pago"))?;

        info!(
            admin_id = admin.id,
            gateway = %updated.gateway,
            active = updated.is_active,
            "Payment config updated"
        );
        Ok(updated.into())
    }

    async fn payment_methods(&self) -> Result<Vec<PaymentMethod>, AdminError> {
        let configs = self.store.payment_configs().list(true).await?;
        Ok(configs
            .into_iter()
            .map(|c| PaymentMethod {
                gateway: c.gateway,
                display_name: c.display_name,
                config: c.settings.public_view(),
            })
            .collect())
    }

    async fn discount_config(&self) -> Result<DiscountConfig, AdminError> {
        Ok(self.store.discount().get().await?)
    }

    async fn update_discount_config(
        &self,
        admin: &User,
        request: DiscountConfigRequest,
    ) -> Result<DiscountConfig, AdminError> {
        self.security
            .ensure_verified(admin, SensitiveAction::PaymentChange)
            .await?;

        let raw = request.discount_percentage;
        if !is_valid_percentage(raw) {
            return Err(AdminError::Validation(
                "El porcentaje de descuento debe estar entre 0 y 100".to_string(),
            ));
        }
        if !has_cent_precision(raw) {
            return Err(AdminError::Validation(
                "El porcentaje de descuento admite como máximo dos decimales".to_string(),
            ));
        }
        let percentage = round_money(raw);

        let message = request
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());
        if message
            .as_ref()
            .is_some_and(|m| m.chars().count() > MAX_DISCOUNT_MESSAGE)
        {
            return Err(AdminError::Validation(format!(
                "El mensaje no puede exceder {MAX_DISCOUNT_MESSAGE} caracteres"
            )));
        }

        let updated = self
            .store
            .discount()
            .update(percentage, message, request.is_active, admin.id)
            .await?;

        info!(
            admin_id = admin.id,
            percentage = %updated.discount_percentage,
            active = updated.is_active,
            "Transfer discount updated"
        );
        Ok(updated)
    }

    async fn list_products(&self, active_only: bool) -> Result<Vec<Product>, AdminError> {
        Ok(self.store.products().list(active_only).await?)
    }

    async fn get_product(
        &self,
        product_id: i32,
        include_inactive: bool,
    ) -> Result<Product, AdminError> {
        self.store
            .products()
            .get(product_id)
            .await?
            .filter(|p| include_inactive || p.is_active)
            .ok_or(AdminError::NotFound("Producto"))
    }

    async fn create_product(&self, request: ProductRequest) -> Result<Product, AdminError> {
        let product = self.store.products().create(request.into_input()?).await?;
        info!(product_id = product.id, "Product created");
        Ok(product)
    }

    async fn update_product(
        &self,
        product_id: i32,
        request: ProductRequest,
    ) -> Result<Product, AdminError> {
        let input = request.into_input()?;
        let product = self
            .store
            .products()
            .update(product_id, input)
            .await?
            .ok_or(AdminError::NotFound("Producto"))?;
        info!(product_id, "Product updated");
        Ok(product)
    }

    async fn list_banners(&self, active_only: bool) -> Result<Vec<Banner>, AdminError> {
        Ok(self.store.promotions().list_banners(active_only).await?)
    }

    async fn create_banner(&self, request: BannerRequest) -> Result<Banner, AdminError> {
        Ok(self
            .store
            .promotions()
            .create_banner(request.into_input()?)
            .await?)
    }

    async fn update_banner(
        &self,
        banner_id: i32,
        request: BannerRequest,
    ) -> Result<Banner, AdminError> {
        let input = request.into_input()?;
        self.store
            .promotions()
            .update_banner(banner_id, input)
            .await?
            .ok_or(AdminError::NotFound("Banner"))
    }

    async fn delete_banner(&self, banner_id: i32) -> Result<(), AdminError> {
        if self.store.promotions().delete_banner(banner_id).await? {
            Ok(())
        } else {
            Err(AdminError::NotFound("Banner"))
        }
    }

    async fn list_offers(&self, active_only: bool) -> Result<Vec<SpecialOffer>, AdminError> {
        Ok(self.store.promotions().list_offers(active_only).await?)
    }

    async fn create_offer(&self, request: OfferRequest) -> Result<SpecialOffer, AdminError> {
        let input = request.into_input()?;
        self.ensure_product_exists(input.product_id).await?;
        Ok(self.store.promotions().create_offer(input).await?)
    }

    async fn update_offer(
        &self,
        offer_id: i32,
        request: OfferRequest,
    ) -> Result<SpecialOffer, AdminError> {
        let input = request.into_input()?;
        self.ensure_product_exists(input.product_id).await?;
        self.store
            .promotions()
            .update_offer(offer_id, input)
            .await?
            .ok_or(AdminError::NotFound("Oferta"))
    }

    async fn delete_offer(&self, offer_id: i32) -> Result<(), AdminError> {
        if self.store.promotions().delete_offer(offer_id).await? {
            Ok(())
        } else {
            Err(AdminError::NotFound("Oferta"))
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, AdminError> {
        Ok(self.store.users().list_all().await?)
    }

    async fn set_user_blocked(
        &self,
        admin: &User,
        user_id: i32,
        blocked: bool,
        reason: Option<String>,
    ) -> Result<User, AdminError> {
        if blocked && user_id == admin.id {
            return Err(AdminError::Validation(
                "No puedes bloquear tu propia cuenta".to_string(),
            ));
        }

        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let user = self
            .store
            .users()
            .set_blocked(user_id, blocked, reason)
            .await?
            .ok_or(AdminError::NotFound("Usuario"))?;

        info!(admin_id = admin.id, user_id, blocked, "User block status changed");
        Ok(user)
    }
}
