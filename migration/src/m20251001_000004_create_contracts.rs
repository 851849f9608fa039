use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Clients {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Contracts {
    Table,
    Id,
    ContractNumber,
    ClientId,
    PlanId,
    PendingPaymentId,
    BillingPeriod,
    MonthlyAmountCents,
    AnnualAmountCents,
    Status,
    PaymentMethod,
    CieloCardToken,
    CardBrand,
    SellerId,
    CouponCode,
    StartDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ContractInstallments {
    Table,
    Id,
    ContractId,
    InstallmentNumber,
    DueDate,
    PeriodStart,
    PeriodEnd,
    AmountCents,
    Status,
    PaidAt,
    PaymentMethod,
    CieloPaymentId,
    AttemptCount,
    LastAttemptAt,
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
                    .table(Contracts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contracts::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Contracts::ContractNumber)
                            .string_len(40)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Contracts::ClientId).integer().not_null())
                    .col(ColumnDef::new(Contracts::PlanId).integer().not_null())
                    // one contract per confirmed checkout, whatever the webhook redelivers
                    .col(
                        ColumnDef::new(Contracts::PendingPaymentId)
                            .integer()
                            .null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Contracts::BillingPeriod).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Contracts::MonthlyAmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contracts::AnnualAmountCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Contracts::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Contracts::PaymentMethod).string_len(20).not_null())
                    .col(ColumnDef::new(Contracts::CieloCardToken).string_len(64).null())
                    .col(ColumnDef::new(Contracts::CardBrand).string_len(20).null())
                    .col(ColumnDef::new(Contracts::SellerId).string_len(64).null())
                    .col(ColumnDef::new(Contracts::CouponCode).string_len(64).null())
                    .col(
                        ColumnDef::new(Contracts::StartDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contracts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Contracts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contracts_client")
                            .from(Contracts::Table, Contracts::ClientId)
                            .to(Clients::Table, Clients::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContractInstallments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContractInstallments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::ContractId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::InstallmentNumber)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::DueDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::PeriodStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::PeriodEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::PaymentMethod)
                            .string_len(20)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::CieloPaymentId)
                            .string_len(64)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::AttemptCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::LastAttemptAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(ContractInstallments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_installments_contract")
                            .from(ContractInstallments::Table, ContractInstallments::ContractId)
                            .to(Contracts::Table, Contracts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_installments_contract_number")
                    .table(ContractInstallments::Table)
                    .col(ContractInstallments::ContractId)
                    .col(ContractInstallments::InstallmentNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_installments_status_due")
                    .table(ContractInstallments::Table)
                    .col(ContractInstallments::Status)
                    .col(ContractInstallments::DueDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(ContractInstallments::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Contracts::Table).to_owned())
            .await?;
        Ok(())
    }
}
