pub use sea_orm_migration::prelude::*;

mod m20251001_000001_create_plans_and_coupons;
mod m20251001_000002_create_pending_payments;
mod m20251001_000003_create_clients_and_pets;
mod m20251001_000004_create_contracts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_plans_and_coupons::Migration),
            Box::new(m20251001_000002_create_pending_payments::Migration),
            Box::new(m20251001_000003_create_clients_and_pets::Migration),
            Box::new(m20251001_000004_create_contracts::Migration),
        ]
    }
}
