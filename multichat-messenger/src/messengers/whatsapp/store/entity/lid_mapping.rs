//! `SeaORM` entity for the `lid_mappings` table.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "lid_mappings")]
/// Learned link between a hidden user ID (LID) and a phone number.
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub lid: String,
    pub phone_number: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub learning_source: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
