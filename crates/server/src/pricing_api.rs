//! Evaluation endpoint plus read endpoints for the four rule collections.
//! The read endpoints serve the same contract `craftquote-client` consumes,
//! so a fleet of servers can chain off one rule master.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use craftquote_core::pricing::scope::ScopeKey;
use craftquote_core::pricing::{EvaluationRequest, PricingEngine};
use craftquote_core::repository::RepositoryError;
use craftquote_core::{PricingError, TemplateId};
use craftquote_db::repositories::SqlRuleRepository;

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<dyn PricingEngine>,
    pub rules: Arc<SqlRuleRepository>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/pricing/evaluate", post(evaluate))
        .route("/api/v1/pricing/rules", get(list_rules))
        .route("/api/v1/pricing/surcharges", get(list_surcharges))
        .route("/api/v1/pricing/tiers", get(list_tiers))
        .route("/api/v1/pricing/thresholds", get(list_thresholds))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

fn error_body(error: &'static str, message: impl Into<String>) -> Json<ErrorBody> {
    Json(ErrorBody { error, message: message.into() })
}

async fn evaluate(
    State(state): State<ApiState>,
    Json(request): Json<EvaluationRequest>,
) -> Response {
    match state.engine.evaluate(&request).await {
        Ok(result) => {
            info!(
                event_name = "pricing.api.evaluated",
                template_id = %result.template_id.0,
                final_price = result.final_price,
                "evaluation served"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(error) => pricing_error_response(error),
    }
}

fn pricing_error_response(error: PricingError) -> Response {
    match &error {
        PricingError::ThresholdExceeded { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, error_body("threshold_exceeded", error.to_string()))
                .into_response()
        }
        PricingError::UnknownTemplate { .. } => {
            (StatusCode::NOT_FOUND, error_body("unknown_template", error.to_string()))
                .into_response()
        }
        PricingError::RepositoryUnavailable { .. } => {
            warn!(event_name = "pricing.api.repository_unavailable", error = %error, "evaluation aborted");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                error_body("repository_unavailable", error.to_string()),
            )
                .into_response()
        }
        PricingError::InvalidConfiguration { .. } => {
            warn!(event_name = "pricing.api.invalid_configuration", error = %error, "evaluation aborted");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("invalid_configuration", error.to_string()),
            )
                .into_response()
        }
    }
}

fn repository_error_response(error: RepositoryError) -> Response {
    match &error {
        RepositoryError::Unavailable { .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, error_body("repository_unavailable", error.to_string()))
                .into_response()
        }
        RepositoryError::Decode { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            error_body("invalid_configuration", error.to_string()),
        )
            .into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ScopeQuery {
    template_id: Option<String>,
    product_type: Option<String>,
}

impl ScopeQuery {
    fn into_scope(self) -> Result<ScopeKey, Response> {
        let product_type = match self.product_type {
            None => None,
            Some(raw) => Some(raw.parse().map_err(|error| {
                (StatusCode::BAD_REQUEST, error_body("bad_request", format!("{error}")))
                    .into_response()
            })?),
        };
        Ok(ScopeKey { template_id: self.template_id.map(TemplateId), product_type })
    }
}

async fn list_rules(State(state): State<ApiState>, Query(query): Query<ScopeQuery>) -> Response {
    let scope = match query.into_scope() {
        Ok(scope) => scope,
        Err(response) => return response,
    };
    match state.rules.list_pricing_rules(&scope).await {
        Ok(rules) => (StatusCode::OK, Json(rules)).into_response(),
        Err(error) => repository_error_response(error),
    }
}

async fn list_surcharges(
    State(state): State<ApiState>,
    Query(query): Query<ScopeQuery>,
) -> Response {
    let scope = match query.into_scope() {
        Ok(scope) => scope,
        Err(response) => return response,
    };
    match state.rules.list_material_surcharges(&scope).await {
        Ok(surcharges) => (StatusCode::OK, Json(surcharges)).into_response(),
        Err(error) => repository_error_response(error),
    }
}

async fn list_tiers(State(state): State<ApiState>, Query(query): Query<ScopeQuery>) -> Response {
    let scope = match query.into_scope() {
        Ok(scope) => scope,
        Err(response) => return response,
    };
    match state.rules.list_quantity_tiers(&scope).await {
        Ok(tiers) => (StatusCode::OK, Json(tiers)).into_response(),
        Err(error) => repository_error_response(error),
    }
}

async fn list_thresholds(
    State(state): State<ApiState>,
    Query(query): Query<ScopeQuery>,
) -> Response {
    let scope = match query.into_scope() {
        Ok(scope) => scope,
        Err(response) => return response,
    };
    match state.rules.list_size_thresholds(&scope).await {
        Ok(thresholds) => (StatusCode::OK, Json(thresholds)).into_response(),
        Err(error) => repository_error_response(error),
    }
}
