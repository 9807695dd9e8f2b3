use axum::{
    routing::{get, patch},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{calls, deals, documents, health};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        // Deal pipeline
        .route("/deals", get(deals::list_deals).post(deals::create_deal))
        .route("/deals/{id}", get(deals::get_deal).patch(deals::update_deal))
        .route("/deals/{id}/timeline", get(deals::get_deal_timeline))
        .route(
            "/deals/{id}/documents",
            get(documents::list_documents).post(documents::add_document),
        )
        // Scheduled calls
        .route("/calls", get(calls::list_calls).post(calls::create_call))
        .route("/calls/{id}", patch(calls::update_call))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
