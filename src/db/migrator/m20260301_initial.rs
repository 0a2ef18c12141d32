use crate::entities::{orders, prelude::*, security_logs, support_tickets, ticket_messages};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{EntityTrait, Schema};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        // Parents before children so the foreign keys resolve.
        create_table_for(manager, &schema, Users).await?;
        create_table_for(manager, &schema, Products).await?;
        create_table_for(manager, &schema, Orders).await?;
        create_table_for(manager, &schema, SecurityLogs).await?;
        create_table_for(manager, &schema, PaymentConfigs).await?;
        create_table_for(manager, &schema, TransferDiscountConfig).await?;
        create_table_for(manager, &schema, SupportTickets).await?;
        create_table_for(manager, &schema, TicketMessages).await?;
        create_table_for(manager, &schema, Banners).await?;
        create_table_for(manager, &schema, SpecialOffers).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_security_logs_user_action")
                    .table(SecurityLogs)
                    .col(security_logs::Column::UserId)
                    .col(security_logs::Column::Action)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_user_id")
                    .table(Orders)
                    .col(orders::Column::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_payment_status")
                    .table(Orders)
                    .col(orders::Column::PaymentStatus)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_support_tickets_user_id")
                    .table(SupportTickets)
                    .col(support_tickets::Column::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_messages_ticket_id")
                    .table(TicketMessages)
                    .col(ticket_messages::Column::TicketId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_table_for(manager, SpecialOffers).await?;
        drop_table_for(manager, Banners).await?;
        drop_table_for(manager, TicketMessages).await?;
        drop_table_for(manager, SupportTickets).await?;
        drop_table_for(manager, TransferDiscountConfig).await?;
        drop_table_for(manager, PaymentConfigs).await?;
        drop_table_for(manager, SecurityLogs).await?;
        drop_table_for(manager, Orders).await?;
        drop_table_for(manager, Products).await?;
        drop_table_for(manager, Users).await
    }
}

async fn create_table_for<E: EntityTrait>(
    manager: &SchemaManager<'_>,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr> {
    manager
        .create_table(
            schema
                .create_table_from_entity(entity)
                .if_not_exists()
                .to_owned(),
        )
        .await
}

async fn drop_table_for<E: EntityTrait>(
    manager: &SchemaManager<'_>,
    entity: E,
) -> Result<(), DbErr> {
    manager
        .drop_table(Table::drop().table(entity).if_exists().to_owned())
        .await
}
