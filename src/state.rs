use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::notifier::{self, Notifier};
use crate::services::{
    AdminService, AuthService, OrderService, SeaOrmAdminService, SeaOrmAuthService,
    SeaOrmOrderService, SeaOrmSecurityService, SeaOrmTicketService, SecurityService,
    TicketService,
};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub security_service: Arc<dyn SecurityService>,

    pub auth_service: Arc<dyn AuthService>,

    pub order_service: Arc<dyn OrderService>,

    pub ticket_service: Arc<dyn TicketService>,

    pub admin_service: Arc<dyn AdminService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let notifier = notifier::from_config(&config.notifications)?;
        Self::with_notifier(config, notifier).await
    }

    /// Builds the state with a caller-supplied delivery backend.
    pub async fn with_notifier(
        config: Config,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let config = Arc::new(RwLock::new(config));

        let security_service = Arc::new(SeaOrmSecurityService::new(
            store.clone(),
            config.clone(),
            notifier,
        )) as Arc<dyn SecurityService>;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.clone(),
            security_service.clone(),
        )) as Arc<dyn AuthService>;

        let order_service = Arc::new(SeaOrmOrderService::new(
            store.clone(),
            config.clone(),
            security_service.clone(),
        )) as Arc<dyn OrderService>;

        let ticket_service = Arc::new(SeaOrmTicketService::new(store.clone(), config.clone()))
            as Arc<dyn TicketService>;

        let admin_service = Arc::new(SeaOrmAdminService::new(
            store.clone(),
            security_service.clone(),
        )) as Arc<dyn AdminService>;

        Ok(Self {
            config,
            store,
            security_service,
            auth_service,
            order_service,
            ticket_service,
            admin_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
