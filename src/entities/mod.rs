pub mod prelude;

pub mod banners;
pub mod orders;
pub mod payment_configs;
pub mod products;
pub mod security_logs;
pub mod special_offers;
pub mod support_tickets;
pub mod ticket_messages;
pub mod transfer_discount_config;
pub mod users;
