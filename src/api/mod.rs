use axum::{Router, routing::get};
use reqwest::Client;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::openfoodfacts::OpenFoodFactsClient;
use crate::spoonacular::SpoonacularClient;

pub mod handlers;
pub mod models;

/// Shared, read-only state handed to every handler.
pub struct AppState {
    pub spoonacular: SpoonacularClient,
    pub openfoodfacts: OpenFoodFactsClient,
    pub byname_concurrency: usize,
}

impl AppState {
    pub fn from_config(config: &Config) -> anyhow::Result<AppState> {
        let http = Client::builder().timeout(config.upstream_timeout).build()?;
        Ok(AppState {
            spoonacular: SpoonacularClient::new(
                http.clone(),
                &config.spoonacular_base_url,
                &config.spoonacular_api_key,
            ),
            openfoodfacts: OpenFoodFactsClient::new(http, &config.openfoodfacts_base_url),
            byname_concurrency: config.byname_concurrency.max(1),
        })
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::home_handler))
        .route("/spoon/:query", get(handlers::spoon_handler))
        .route("/recipe/:id", get(handlers::recipe_handler))
        .route("/recipe/:id/summary", get(handlers::full_recipe_handler))
        .route("/byname/:query", get(handlers::byname_handler))
        .route("/suggestions", get(handlers::suggestions_handler))
        .route("/product/:barcode", get(handlers::product_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
