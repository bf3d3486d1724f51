//! `SeaORM` entity for the `contacts` table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "contacts")]
/// Database row model for a synced contact.
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub jid: String,
    pub name: Option<String>,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
