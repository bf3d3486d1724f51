use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // devices 表
        manager
            .create_table(
                Table::create()
                    .table(Device::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Device::Jid).string().not_null().primary_key())
                    .col(ColumnDef::new(Device::PushName).string().null())
                    .col(ColumnDef::new(Device::Credentials).string().not_null())
                    .col(ColumnDef::new(Device::CreatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        // contacts 表
        manager
            .create_table(
                Table::create()
                    .table(Contact::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contact::Jid)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contact::Name).string().null())
                    .col(ColumnDef::new(Contact::UpdatedAt).string().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contact::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Device::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Device {
    #[sea_orm(iden = "devices")]
    Table,
    Jid,
    PushName,
    Credentials,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Contact {
    #[sea_orm(iden = "contacts")]
    Table,
    Jid,
    Name,
    UpdatedAt,
}
