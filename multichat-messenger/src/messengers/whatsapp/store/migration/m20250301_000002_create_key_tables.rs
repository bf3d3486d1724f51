use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // key_records 表
        manager
            .create_table(
                Table::create()
                    .table(KeyRecord::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(KeyRecord::Bucket).string().not_null())
                    .col(ColumnDef::new(KeyRecord::Scope).string().not_null())
                    .col(ColumnDef::new(KeyRecord::Key).string().not_null())
                    .col(ColumnDef::new(KeyRecord::Value).binary().not_null())
                    .primary_key(
                        Index::create()
                            .col(KeyRecord::Bucket)
                            .col(KeyRecord::Scope)
                            .col(KeyRecord::Key),
                    )
                    .to_owned(),
            )
            .await?;

        // lid_mappings 表
        manager
            .create_table(
                Table::create()
                    .table(LidMapping::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LidMapping::Lid)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LidMapping::PhoneNumber).string().not_null())
                    .col(ColumnDef::new(LidMapping::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(LidMapping::UpdatedAt).big_integer().not_null())
                    .col(ColumnDef::new(LidMapping::LearningSource).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_lid_mappings_phone_number")
                    .table(LidMapping::Table)
                    .col(LidMapping::PhoneNumber)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LidMapping::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(KeyRecord::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum KeyRecord {
    #[sea_orm(iden = "key_records")]
    Table,
    Bucket,
    Scope,
    Key,
    Value,
}

#[derive(DeriveIden)]
enum LidMapping {
    #[sea_orm(iden = "lid_mappings")]
    Table,
    Lid,
    PhoneNumber,
    CreatedAt,
    UpdatedAt,
    LearningSource,
}
