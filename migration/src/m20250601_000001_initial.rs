use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Services {
    Table,
    Id,
    Name,
    DurationMinutes,
    PriceCents,
}

#[derive(DeriveIden)]
enum Bookings {
    Table,
    Id,
    ServiceId,
    Date,
    Time,
    CustomerId,
    CustomerName,
    CustomerPhone,
    CustomerEmail,
    Status,
    PaymentStatus,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("booking_status"))
                    .values(vec![
                        Alias::new("pending"),
                        Alias::new("confirmed"),
                        Alias::new("cancelled"),
                        Alias::new("postponed"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("payment_status"))
                    .values(vec![
                        Alias::new("pending"),
                        Alias::new("paid"),
                        Alias::new("failed"),
                        Alias::new("refunded"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Services::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Services::Name).string().not_null())
                    .col(
                        ColumnDef::new(Services::DurationMinutes)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Services::PriceCents).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookings::ServiceId).big_integer().not_null())
                    .col(ColumnDef::new(Bookings::Date).date().not_null())
                    .col(ColumnDef::new(Bookings::Time).time().not_null())
                    .col(ColumnDef::new(Bookings::CustomerId).big_integer().null())
                    .col(ColumnDef::new(Bookings::CustomerName).string().not_null())
                    .col(ColumnDef::new(Bookings::CustomerPhone).string().not_null())
                    .col(ColumnDef::new(Bookings::CustomerEmail).string().null())
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .custom(Alias::new("booking_status"))
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::PaymentStatus)
                            .custom(Alias::new("payment_status"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::Notes).string().null())
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Bookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_service_id")
                            .from(Bookings::Table, Bookings::ServiceId)
                            .to(Services::Table, Services::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_date")
                    .table(Bookings::Table)
                    .col(Bookings::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_customer_id")
                    .table(Bookings::Table)
                    .col(Bookings::CustomerId)
                    .to_owned(),
            )
            .await?;

        // Partial unique index: one active booking per slot. Cancelled rows
        // fall out of the index, so a freed slot can be re-booked. Concurrent
        // inserts for the same slot race here, not in application reads.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS ux_bookings_slot \
                 ON bookings (date, time) WHERE status <> 'cancelled'",
            )
            .await?;

        // Seed the treatment catalog.
        manager
            .get_connection()
            .execute_unprepared(
                "INSERT INTO services (name, duration_minutes, price_cents) VALUES \
                 ('Haircut', 45, 5000), \
                 ('Hair Coloring', 120, 15000), \
                 ('Manicure', 30, 3500), \
                 ('Pedicure', 45, 4500), \
                 ('Facial Treatment', 60, 8000) \
                 ON CONFLICT DO NOTHING",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Services::Table).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("payment_status")).to_owned())
            .await?;
        manager
            .drop_type(Type::drop().name(Alias::new("booking_status")).to_owned())
            .await?;
        Ok(())
    }
}
