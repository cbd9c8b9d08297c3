use std::sync::Arc;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{config::Config, gateway, payment, payment::coordinator::PaymentCoordinator};

#[derive(Clone, axum::extract::FromRef)]
pub struct AppState {
    pub config: Arc<Config>,
    pub coordinator: Arc<PaymentCoordinator>,
}

impl AppState {
    pub fn new(config: Config, coordinator: Arc<PaymentCoordinator>) -> Self {
        Self {
            config: Arc::new(config),
            coordinator,
        }
    }

    pub fn into_router(self) -> Router {
        let callback = gateway::api::router(&self.config.pages);
        Router::new()
            .nest("/api", payment::api::router().merge(callback))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self)
    }
}
