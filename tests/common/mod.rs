#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use dealflow_backend::entities::listings::{self, ListingStatus};
use dealflow_backend::entities::users;
use dealflow_backend::router::build_router;
use dealflow_backend::services::notifications::{Notification, Notifier};
use dealflow_backend::AppState;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, DbErr, Set};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

/// Fresh in-memory SQLite database with all migrations applied.
/// A single pooled connection keeps every query on the same in-memory database.
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub notifications: UnboundedReceiver<Notification>,
}

pub async fn spawn_app() -> TestApp {
    let db = setup_test_db().await.expect("Failed to set up test DB");
    let (notifier, notifications) = Notifier::channel();

    let state = AppState {
        db: db.clone(),
        notifier,
    };

    TestApp {
        router: build_router(state),
        db,
        notifications,
    }
}

pub async fn create_user(db: &DatabaseConnection, name: &str) -> users::Model {
    users::ActiveModel {
        name: Set(name.to_string()),
        email: Set(format!("{}@example.com", name.to_lowercase())),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

pub async fn create_listing(
    db: &DatabaseConnection,
    seller_id: i32,
    title: &str,
    status: ListingStatus,
) -> listings::Model {
    listings::ActiveModel {
        seller_id: Set(seller_id),
        title: Set(title.to_string()),
        status: Set(status),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert listing")
}

/// Buyer, seller, outsider and a published listing owned by the seller
pub struct Marketplace {
    pub buyer: users::Model,
    pub seller: users::Model,
    pub outsider: users::Model,
    pub listing: listings::Model,
}

pub async fn seed_marketplace(db: &DatabaseConnection) -> Marketplace {
    let buyer = create_user(db, "Bianca").await;
    let seller = create_user(db, "Samir").await;
    let outsider = create_user(db, "Uma").await;
    let listing = create_listing(db, seller.id, "Niche SaaS, $8k MRR", ListingStatus::Published).await;

    Marketplace {
        buyer,
        seller,
        outsider,
        listing,
    }
}

/// Send a request as `user_id` (no identity header when `None`) and decode the JSON reply
pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    user_id: Option<i32>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(id) = user_id {
        builder = builder.header("x-user-id", id.to_string());
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

pub async fn open_deal(app: &TestApp, market: &Marketplace, body: Value) -> Value {
    let (status, json) = send(&app.router, Method::POST, "/deals", Some(market.buyer.id), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "deal creation failed: {}", json);
    json
}
