pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_users;
mod m20261001_000002_create_listings;
mod m20261002_000001_create_deals;
mod m20261002_000002_create_deal_events;
mod m20261002_000003_create_deal_documents;
mod m20261003_000001_create_scheduled_calls;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_users::Migration),
            Box::new(m20261001_000002_create_listings::Migration),
            Box::new(m20261002_000001_create_deals::Migration),
            Box::new(m20261002_000002_create_deal_events::Migration),
            Box::new(m20261002_000003_create_deal_documents::Migration),
            Box::new(m20261003_000001_create_scheduled_calls::Migration),
        ]
    }
}
