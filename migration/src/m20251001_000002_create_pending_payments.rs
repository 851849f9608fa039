use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PendingPayments {
    Table,
    Id,
    CieloPaymentId,
    PaymentMethod,
    PaymentStatus,
    CustomerName,
    CustomerEmail,
    CustomerCpf,
    CustomerPhone,
    Address,
    AddressNumber,
    Complement,
    District,
    City,
    State,
    Cep,
    PlanId,
    BillingPeriod,
    AmountCents,
    Installments,
    PetsData,
    PixQrCode,
    PixCode,
    SellerId,
    CouponCode,
    CouponDiscountCents,
    CardToken,
    CardBrand,
    AuthorizationCode,
    Tid,
    ReturnCode,
    ReturnMessage,
    Processed,
    ProcessedAt,
    ClientId,
    ContractId,
    ExpiresAt,
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
                    .table(PendingPayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PendingPayments::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PendingPayments::CieloPaymentId)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PendingPayments::PaymentMethod)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PendingPayments::PaymentStatus)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PendingPayments::CustomerName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PendingPayments::CustomerEmail)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PendingPayments::CustomerCpf)
                            .string_len(14)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PendingPayments::CustomerPhone).string_len(32).null())
                    .col(ColumnDef::new(PendingPayments::Address).string_len(255).null())
                    .col(ColumnDef::new(PendingPayments::AddressNumber).string_len(20).null())
                    .col(ColumnDef::new(PendingPayments::Complement).string_len(120).null())
                    .col(ColumnDef::new(PendingPayments::District).string_len(120).null())
                    .col(ColumnDef::new(PendingPayments::City).string_len(120).null())
                    .col(ColumnDef::new(PendingPayments::State).string_len(2).null())
                    .col(ColumnDef::new(PendingPayments::Cep).string_len(9).null())
                    .col(ColumnDef::new(PendingPayments::PlanId).integer().not_null())
                    .col(
                        ColumnDef::new(PendingPayments::BillingPeriod)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PendingPayments::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PendingPayments::Installments)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(PendingPayments::PetsData).text().not_null())
                    .col(ColumnDef::new(PendingPayments::PixQrCode).text().null())
                    .col(ColumnDef::new(PendingPayments::PixCode).text().null())
                    .col(ColumnDef::new(PendingPayments::SellerId).string_len(64).null())
                    .col(ColumnDef::new(PendingPayments::CouponCode).string_len(64).null())
                    .col(
                        ColumnDef::new(PendingPayments::CouponDiscountCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PendingPayments::CardToken).string_len(64).null())
                    .col(ColumnDef::new(PendingPayments::CardBrand).string_len(20).null())
                    .col(
                        ColumnDef::new(PendingPayments::AuthorizationCode)
                            .string_len(32)
                            .null(),
                    )
                    .col(ColumnDef::new(PendingPayments::Tid).string_len(64).null())
                    .col(ColumnDef::new(PendingPayments::ReturnCode).string_len(16).null())
                    .col(ColumnDef::new(PendingPayments::ReturnMessage).string_len(255).null())
                    .col(
                        ColumnDef::new(PendingPayments::Processed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PendingPayments::ProcessedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(PendingPayments::ClientId).integer().null())
                    .col(ColumnDef::new(PendingPayments::ContractId).integer().null())
                    .col(
                        ColumnDef::new(PendingPayments::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PendingPayments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PendingPayments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pending_payments_processed")
                    .table(PendingPayments::Table)
                    .col(PendingPayments::Processed)
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
                    .table(PendingPayments::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}
