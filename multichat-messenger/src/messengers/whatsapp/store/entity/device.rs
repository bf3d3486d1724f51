//! `SeaORM` entity for the `devices` table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "devices")]
/// Database row model for a paired device.
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub jid: String,
    pub push_name: Option<String>,
    pub credentials: String,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
