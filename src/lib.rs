// src/lib.rs

use sea_orm::DatabaseConnection;
use services::notifications::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub notifier: Notifier,
}

pub mod entities {
    pub mod prelude;
    pub mod users;
    pub mod listings;
    pub mod deals;
    pub mod deal_events;
    pub mod deal_documents;
    pub mod scheduled_calls;
}

pub mod services {
    pub mod stage_machine;
    pub mod timeline;
    pub mod deal_store;
    pub mod listing_lookup;
    pub mod documents;
    pub mod call_machine;
    pub mod calls;
    pub mod notifications;

    #[cfg(test)]
    pub(crate) mod test_support;
}

pub mod models {
    pub mod deal;
    pub mod document;
    pub mod call;
}

pub mod handlers {
    pub mod auth;
    pub mod health;
    pub mod deals;
    pub mod documents;
    pub mod calls;
}

pub mod config;
pub mod error;
pub mod router;
