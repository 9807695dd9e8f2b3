//! Database fixtures for service-level tests

use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};

use crate::entities::listings::{self, ListingStatus};
use crate::entities::users;

/// In-memory SQLite on a single connection, migrated
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await.expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    db
}

pub async fn user(db: &DatabaseConnection, name: &str) -> users::Model {
    users::ActiveModel {
        name: Set(name.to_string()),
        email: Set(format!("{}@example.com", name.to_lowercase())),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

pub async fn published_listing(db: &DatabaseConnection, seller_id: i32) -> listings::Model {
    listings::ActiveModel {
        seller_id: Set(seller_id),
        title: Set("Shopify store, 4 years".to_string()),
        status: Set(ListingStatus::Published),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert listing")
}
