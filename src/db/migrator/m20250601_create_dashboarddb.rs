use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // `if_not_exists` adopts tables created by earlier deployments.
        manager
            .create_table(
                Table::create()
                    .table(Dashboarddb::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Dashboarddb::Username)
                            .string_len(255)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Dashboarddb::OwnedServer)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Dashboarddb::PremiumUser)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Dashboarddb::TotalModernAuthPlayers)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Dashboarddb::TotalPlayers)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Dashboarddb::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Dashboarddb {
    Table,
    Username,
    OwnedServer,
    PremiumUser,
    TotalModernAuthPlayers,
    TotalPlayers,
}
