use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header::CACHE_CONTROL},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use crate::aggregator::{AggregateError, Aggregator};
use crate::error::{ApiError, UpstreamError};
use crate::full_recipe;
use crate::openfoodfacts::{ProductLookup, is_valid_barcode};
use crate::spoonacular::SearchQuery;
use crate::suggestions::{self, SuggestionRequest, Suggestions};

use super::AppState;
use super::models::{SpoonParams, SuggestionParams};

/// Number of detail calls that failed and were left out of a by-name result.
pub const DROPPED_DETAILS_HEADER: &str = "x-dropped-details";

const FULL_RECIPE_CACHE: &str = "public, s-maxage=3600, stale-while-revalidate=86400";

pub async fn home_handler() -> &'static str {
    "Gluca backend is running! Use /spoon/<query>?type=breakfast&number=5 to search recipes."
}

pub async fn spoon_handler(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
    Query(params): Query<SpoonParams>,
) -> Result<Json<Value>, ApiError> {
    let search = SearchQuery::new(query, params.number()?).with_type(params.meal_type());

    let payload = state
        .spoonacular
        .search(&search)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch recipes", e))?;

    Ok(Json(payload))
}

fn recipe_id(id: &str) -> Result<u64, ApiError> {
    id.trim()
        .parse()
        .map_err(|_| ApiError::Validation(format!("recipe id must be numeric, got {id:?}")))
}

pub async fn recipe_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = recipe_id(&id)?;

    let detail = state
        .spoonacular
        .recipe_information(id)
        .await
        .map_err(|e| ApiError::upstream("Failed to fetch recipe information", e))?;

    Ok(Json(detail))
}

/// Recipe information normalized into a [`full_recipe::FullRecipe`].
pub async fn full_recipe_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = recipe_id(&id)?;

    let recipe = full_recipe::full_recipe(&state.spoonacular, id)
        .await
        .map_err(|e| {
            let (status, message) = match &e {
                UpstreamError::Status { status: 402, .. } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "Spoonacular rate limit reached.",
                ),
                UpstreamError::Status { status: 404, .. } => (
                    StatusCode::NOT_FOUND,
                    "Recipe details unavailable. This recipe may have been removed.",
                ),
                _ => (StatusCode::BAD_GATEWAY, "Failed to fetch recipe."),
            };
            ApiError::Upstream {
                status,
                message,
                source: e,
            }
        })?;

    Ok((
        [(CACHE_CONTROL, HeaderValue::from_static(FULL_RECIPE_CACHE))],
        Json(recipe),
    )
        .into_response())
}

/// Search by name and expand every hit into its full recipe. Hits whose
/// detail call fails are left out; their count goes into
/// [`DROPPED_DETAILS_HEADER`].
pub async fn byname_handler(
    State(state): State<Arc<AppState>>,
    Path(query): Path<String>,
) -> Result<Response, ApiError> {
    let aggregator = Aggregator::new(&state.spoonacular, state.byname_concurrency);

    let aggregation = aggregator
        .recipes_by_name(&query)
        .await
        .map_err(|e| match e {
            AggregateError::Search(source) => ApiError::upstream("Search failed", source),
            AggregateError::NoResults(_) => ApiError::NotFound("No recipe found for that name"),
        })?;

    let dropped = aggregation.dropped_count();
    if dropped > 0 {
        log::warn!(
            "byname {query:?}: returning {} recipes, {dropped} dropped",
            aggregation.fetched_count()
        );
    }
    let details = aggregation.into_details();

    Ok((
        [(DROPPED_DETAILS_HEADER, HeaderValue::from(dropped))],
        Json(details),
    )
        .into_response())
}

pub async fn suggestions_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestionParams>,
) -> Result<Json<Suggestions>, ApiError> {
    let request = SuggestionRequest::try_from(params)?;

    let suggestions = suggestions::suggest(&state.spoonacular, &request)
        .await
        .map_err(|e| {
            let (status, message) = match &e {
                UpstreamError::Status { status: 402, .. } => (
                    StatusCode::TOO_MANY_REQUESTS,
                    "Spoonacular rate limit reached. Try again later.",
                ),
                UpstreamError::Status { .. } => {
                    (StatusCode::BAD_GATEWAY, "Spoonacular request failed.")
                }
                UpstreamError::Transport(_) => {
                    (StatusCode::BAD_GATEWAY, "Failed to reach Spoonacular.")
                }
            };
            ApiError::Upstream {
                status,
                message,
                source: e,
            }
        })?;

    Ok(Json(suggestions))
}

pub async fn product_handler(
    State(state): State<Arc<AppState>>,
    Path(barcode): Path<String>,
) -> Result<Json<ProductLookup>, ApiError> {
    if !is_valid_barcode(&barcode) {
        return Err(ApiError::Validation(
            "A valid numeric barcode is required.".to_string(),
        ));
    }

    let lookup = state
        .openfoodfacts
        .lookup(&barcode)
        .await
        .map_err(|e| ApiError::Upstream {
            status: StatusCode::BAD_GATEWAY,
            message: "Failed to reach Open Food Facts.",
            source: e,
        })?;

    Ok(Json(lookup))
}
