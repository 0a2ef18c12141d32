use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(unique)]
    pub email: String,

    pub phone: Option<String>,

    /// Argon2id password hash
    pub password_hash: String,

    /// Random API key (64-char hex string)
    #[sea_orm(unique)]
    pub api_key: String,

    /// `customer` or `admin`
    pub role: String,

    pub two_factor_enabled: bool,

    /// External channel-set name, e.g. `email_sms`
    pub two_factor_method: String,

    pub email_verified: bool,

    pub phone_verified: bool,

    pub whatsapp_verified: bool,

    pub is_blocked: bool,

    pub blocked_reason: Option<String>,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::orders::Entity")]
    Orders,
    #[sea_orm(has_many = "super::security_logs::Entity")]
    SecurityLogs,
    #[sea_orm(has_many = "super::support_tickets::Entity")]
    SupportTickets,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::security_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SecurityLogs.def()
    }
}

impl Related<super::support_tickets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupportTickets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
