pub mod notifier;
pub use notifier::{DeliveryError, Notifier, OutboundMessage};

pub mod security_service;
pub mod security_service_impl;
pub use security_service::{
    CodeDispatch, SecurityError, SecurityService, SecuritySettings, VerificationGrant,
};
pub use security_service_impl::SeaOrmSecurityService;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, RegisterRequest};
pub use auth_service_impl::SeaOrmAuthService;

pub mod order_service;
pub mod order_service_impl;
pub use order_service::{
    CheckoutConfig, CreateOrderRequest, GatewayNotification, OrderError, OrderService,
    TransferQuoteView,
};
pub use order_service_impl::SeaOrmOrderService;

pub mod ticket_service;
pub mod ticket_service_impl;
pub use ticket_service::{
    CreateTicketRequest, PostMessageRequest, TicketError, TicketService, TicketThread,
};
pub use ticket_service_impl::SeaOrmTicketService;

pub mod admin_service;
pub mod admin_service_impl;
pub use admin_service::{AdminError, AdminService};
pub use admin_service_impl::SeaOrmAdminService;
