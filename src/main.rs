use std::sync::Arc;

use dealflow_backend::config::AppConfig;
use dealflow_backend::router::build_router;
use dealflow_backend::services::notifications::{
    spawn_dispatcher, LogSink, NotificationDispatcher, NotificationSink, Notifier, WebhookSink,
};
use dealflow_backend::AppState;
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dealflow_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    // Connect to database
    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    if config.run_migrations {
        tracing::info!("Running migrations...");
        migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");
    }

    // Notification dispatcher runs detached from request handling
    let sink: Arc<dyn NotificationSink> = match config.mail_webhook_url.clone() {
        Some(url) => {
            tracing::info!(url = %url, "Delivering notifications through mail webhook");
            Arc::new(WebhookSink::new(url))
        }
        None => {
            tracing::warn!("MAIL_WEBHOOK_URL not set, notifications will only be logged");
            Arc::new(LogSink)
        }
    };
    let (notifier, rx) = Notifier::channel();
    spawn_dispatcher(
        NotificationDispatcher::new(db.clone(), sink, config.mail_from.clone()),
        rx,
    );

    let state = AppState { db, notifier };
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .expect("Failed to bind listener");

    tracing::info!(
        "Server listening on {}",
        listener.local_addr().expect("listener has a local address")
    );

    axum::serve(listener, app).await.expect("Server error");
}
