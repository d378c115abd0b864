use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Discounts {
    Table,
    Id,
    Code,
    DiscountType,
    Value,
    MaxDiscountCents,
    MinimumAmountCents,
    UsageLimit,
    UsedCount,
    ValidFrom,
    ValidUntil,
    IsActive,
    NewCustomersOnly,
    ExistingCustomersOnly,
    MinTier,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum DiscountUsages {
    Table,
    Id,
    DiscountId,
    CustomerId,
    BookingId,
    AmountCents,
    UsedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("discount_type"))
                    .values(vec![Alias::new("percentage"), Alias::new("fixed")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Discounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Discounts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Discounts::Code).string().not_null().unique_key())
                    .col(
                        ColumnDef::new(Discounts::DiscountType)
                            .custom(Alias::new("discount_type"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Discounts::Value).big_integer().not_null())
                    .col(
                        ColumnDef::new(Discounts::MaxDiscountCents)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Discounts::MinimumAmountCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Discounts::UsageLimit).big_integer().null())
                    .col(
                        ColumnDef::new(Discounts::UsedCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Discounts::ValidFrom)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Discounts::ValidUntil)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Discounts::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Discounts::NewCustomersOnly)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Discounts::ExistingCustomersOnly)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Discounts::MinTier)
                            .custom(Alias::new("loyalty_tier"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Discounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Discounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DiscountUsages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DiscountUsages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DiscountUsages::DiscountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscountUsages::CustomerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscountUsages::BookingId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscountUsages::AmountCents)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DiscountUsages::UsedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_discount_usages_discount_id")
                            .from(DiscountUsages::Table, DiscountUsages::DiscountId)
                            .to(Discounts::Table, Discounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One usage row per (discount, booking): the reconciler's idempotency
        // key. A replayed success event conflicts here and inserts nothing.
        manager
            .create_index(
                Index::create()
                    .name("ux_discount_usages_discount_booking")
                    .table(DiscountUsages::Table)
                    .col(DiscountUsages::DiscountId)
                    .col(DiscountUsages::BookingId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_discount_usages_customer_id")
                    .table(DiscountUsages::Table)
                    .col(DiscountUsages::CustomerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DiscountUsages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Discounts::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("discount_type")).to_owned())
            .await?;
        Ok(())
    }
}
