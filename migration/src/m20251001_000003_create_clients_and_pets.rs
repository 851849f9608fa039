use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
    FullName,
    Email,
    Cpf,
    Phone,
    Address,
    AddressNumber,
    Complement,
    District,
    City,
    State,
    Cep,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Pets {
    Table,
    Id,
    ClientId,
    ContractId,
    PlanId,
    Name,
    Species,
    Breed,
    Age,
    Sex,
    Castrated,
    Weight,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Clients::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Clients::FullName).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Clients::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Clients::Cpf)
                            .string_len(14)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Clients::Phone).string_len(32).null())
                    .col(ColumnDef::new(Clients::Address).string_len(255).null())
                    .col(ColumnDef::new(Clients::AddressNumber).string_len(20).null())
                    .col(ColumnDef::new(Clients::Complement).string_len(120).null())
                    .col(ColumnDef::new(Clients::District).string_len(120).null())
                    .col(ColumnDef::new(Clients::City).string_len(120).null())
                    .col(ColumnDef::new(Clients::State).string_len(2).null())
                    .col(ColumnDef::new(Clients::Cep).string_len(9).null())
                    .col(
                        ColumnDef::new(Clients::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Clients::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Pets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Pets::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Pets::ClientId).integer().not_null())
                    .col(ColumnDef::new(Pets::ContractId).integer().null())
                    .col(ColumnDef::new(Pets::PlanId).integer().null())
                    .col(ColumnDef::new(Pets::Name).string_len(120).not_null())
                    .col(ColumnDef::new(Pets::Species).string_len(60).not_null())
                    .col(ColumnDef::new(Pets::Breed).string_len(120).null())
                    .col(ColumnDef::new(Pets::Age).integer().null())
                    .col(ColumnDef::new(Pets::Sex).string_len(20).null())
                    .col(
                        ColumnDef::new(Pets::Castrated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Pets::Weight).double().null())
                    .col(
                        ColumnDef::new(Pets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Pets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pets_client")
                            .from(Pets::Table, Pets::ClientId)
                            .to(Clients::Table, Clients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pets_client")
                    .table(Pets::Table)
                    .col(Pets::ClientId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Pets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Clients::Table).to_owned())
            .await?;
        Ok(())
    }
}
