use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::{bill, service};

/// One line item of a bill: a service and how many units of it were consumed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bill_lines")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub bill_id: i32,
    pub service_id: i32,
    #[sea_orm(default_value = "1")]
    pub quantity: i16,
    /// `service.price * quantity` at the time the line was created, unless
    /// the caller fixed it explicitly.
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub total: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "bill::Entity",
        from = "Column::BillId",
        to = "bill::Column::Id",
        on_delete = "Cascade"
    )]
    Bill,
    #[sea_orm(
        belongs_to = "service::Entity",
        from = "Column::ServiceId",
        to = "service::Column::Id",
        on_delete = "Restrict"
    )]
    Service,
}

impl Related<bill::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bill.def()
    }
}

impl Related<service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
