pub use super::banners::Entity as Banners;
pub use super::orders::Entity as Orders;
pub use super::payment_configs::Entity as PaymentConfigs;
pub use super::products::Entity as Products;
pub use super::security_logs::Entity as SecurityLogs;
pub use super::special_offers::Entity as SpecialOffers;
pub use super::support_tickets::Entity as SupportTickets;
pub use super::ticket_messages::Entity as TicketMessages;
pub use super::transfer_discount_config::Entity as TransferDiscountConfig;
pub use super::users::Entity as Users;
