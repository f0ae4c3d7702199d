use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;

use super::user;

/// A numbered bill issued to one coworker.
///
/// `number` and `billing_date` are fixed when the bill is created. `amount`
/// always mirrors the sum of the bill's line totals and is maintained by the
/// billing service layer, never written directly by callers.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bills")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// The coworker this bill is issued to.
    pub user_id: i32,
    /// `F<YYYYMM><NNN>`, see `billing::numbering`.
    #[sea_orm(unique, column_type = "String(StringLen::N(16))")]
    pub number: String,
    #[sea_orm(default_value = "false")]
    pub is_paid: bool,
    pub billing_date: NaiveDate,
    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub amount: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "user::Entity",
        from = "Column::UserId",
        to = "user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::bill_line::Entity")]
    BillLine,
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::bill_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
