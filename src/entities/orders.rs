use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub order_number: String,

    pub user_id: i32,

    pub product_id: i32,

    pub quantity: i32,

    pub unit_price: String,

    pub total_amount: String,

    /// Set only for direct-transfer orders
    pub original_amount: Option<String>,

    pub discount_applied: Option<String>,

    /// Percentage in force when the order was created
    pub discount_percentage: Option<String>,

    pub status: String,

    pub payment_status: String,

    pub payment_type: String,

    /// Gateway-side payment id
    pub payment_reference: Option<String>,

    pub transfer_receipt_url: Option<String>,

    pub transfer_verified_at: Option<String>,

    pub transfer_verified_by: Option<i32>,

    pub transfer_notes: Option<String>,

    /// JSON array of status history entries
    pub status_history: String,

    /// JSON shipping address
    pub shipping_address: Option<String>,

    /// Bumped on every state change
    pub version: i32,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Products,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
