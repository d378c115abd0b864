pub use sea_orm_migration::prelude::*;

mod m20250601_000001_initial;
mod m20250601_000002_add_loyalty;
mod m20250601_000003_add_discounts;
mod m20250601_000004_add_payment_transactions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250601_000001_initial::Migration),
            Box::new(m20250601_000002_add_loyalty::Migration),
            Box::new(m20250601_000003_add_discounts::Migration),
            Box::new(m20250601_000004_add_payment_transactions::Migration),
        ]
    }
}
