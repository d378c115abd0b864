use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum CustomerLoyalty {
    Table,
    Id,
    CustomerId,
    Points,
    TotalSpentCents,
    TotalBookings,
    Tier,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LoyaltyBadges {
    Table,
    Id,
    CustomerId,
    Name,
    AwardedAt,
}

#[derive(DeriveIden)]
enum LoyaltyRewards {
    Table,
    Id,
    CustomerId,
    MilestoneKind,
    Threshold,
    RewardType,
    RewardValue,
    EarnedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("loyalty_tier"))
                    .values(vec![
                        Alias::new("bronze"),
                        Alias::new("silver"),
                        Alias::new("gold"),
                        Alias::new("platinum"),
                        Alias::new("diamond"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("milestone_kind"))
                    .values(vec![Alias::new("bookings"), Alias::new("spending")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("reward_type"))
                    .values(vec![Alias::new("points"), Alias::new("discount")])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CustomerLoyalty::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomerLoyalty::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CustomerLoyalty::CustomerId)
                            .big_integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(CustomerLoyalty::Points)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CustomerLoyalty::TotalSpentCents)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CustomerLoyalty::TotalBookings)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CustomerLoyalty::Tier)
                            .custom(Alias::new("loyalty_tier"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerLoyalty::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(CustomerLoyalty::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LoyaltyBadges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoyaltyBadges::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LoyaltyBadges::CustomerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LoyaltyBadges::Name).string().not_null())
                    .col(
                        ColumnDef::new(LoyaltyBadges::AwardedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // A badge is awarded once; replayed credits insert nothing.
        manager
            .create_index(
                Index::create()
                    .name("ux_loyalty_badges_customer_name")
                    .table(LoyaltyBadges::Table)
                    .col(LoyaltyBadges::CustomerId)
                    .col(LoyaltyBadges::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LoyaltyRewards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoyaltyRewards::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(LoyaltyRewards::CustomerId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoyaltyRewards::MilestoneKind)
                            .custom(Alias::new("milestone_kind"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoyaltyRewards::Threshold)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoyaltyRewards::RewardType)
                            .custom(Alias::new("reward_type"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoyaltyRewards::RewardValue)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LoyaltyRewards::EarnedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Each milestone pays out once per customer.
        manager
            .create_index(
                Index::create()
                    .name("ux_loyalty_rewards_milestone")
                    .table(LoyaltyRewards::Table)
                    .col(LoyaltyRewards::CustomerId)
                    .col(LoyaltyRewards::MilestoneKind)
                    .col(LoyaltyRewards::Threshold)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoyaltyRewards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LoyaltyBadges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CustomerLoyalty::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("reward_type")).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("milestone_kind")).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("loyalty_tier")).to_owned())
            .await?;
        Ok(())
    }
}
