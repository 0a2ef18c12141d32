use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::discount::DiscountConfig;
pub use repositories::order::{NewOrder, Order, OrderFilter, Transition};
pub use repositories::payment_config::{PaymentConfig, PaymentConfigPatch};
pub use repositories::product::{Product, ProductInput};
pub use repositories::promotion::{Banner, BannerInput, OfferInput, SpecialOffer};
pub use repositories::security_log::SecurityLog;
pub use repositories::ticket::{NewMessage, NewTicket, Ticket, TicketMessage};
pub use repositories::user::{NewUser, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    #[must_use]
    pub fn users(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn products(&self) -> repositories::product::ProductRepository {
        repositories::product::ProductRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn orders(&self) -> repositories::order::OrderRepository {
        repositories::order::OrderRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn security_logs(&self) -> repositories::security_log::SecurityLogRepository {
        repositories::security_log::SecurityLogRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn payment_configs(&self) -> repositories::payment_config::PaymentConfigRepository {
        repositories::payment_config::PaymentConfigRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn discount(&self) -> repositories::discount::DiscountRepository {
        repositories::discount::DiscountRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn tickets(&self) -> repositories::ticket::TicketRepository {
        repositories::ticket::TicketRepository::new(self.conn.clone())
    }

    #[must_use]
    pub fn promotions(&self) -> repositories::promotion::PromotionRepository {
        repositories::promotion::PromotionRepository::new(self.conn.clone())
    }
}
