//! Route set generation and slope classification endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use walkroute_core::{save_route_set, ColorPolicy, Error, RouteRequest, RouteSet};

use crate::fallback::fallback_route_set;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RouteSetResponse {
    #[serde(flatten)]
    pub set: RouteSet,
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<String>,
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "invalid_input",
            "message": message.into(),
        })),
    )
        .into_response()
}

fn check_request(request: &RouteRequest, max_routes: u32, default_policy: ColorPolicy) -> Result<(), Error> {
    request.validate()?;
    if request.num_routes > max_routes {
        return Err(Error::InvalidInput(format!(
            "num_routes must be at most {max_routes}"
        )));
    }
    request.color_policy.unwrap_or(default_policy).validate()
}

async fn save_artifacts(set: &RouteSet, root: &str) -> Option<String> {
    let set = set.clone();
    let root = PathBuf::from(root);
    match tokio::task::spawn_blocking(move || save_route_set(&set, root)).await {
        Ok(Ok(dir)) => Some(dir.display().to_string()),
        Ok(Err(err)) => {
            tracing::warn!("Failed to save route set artifacts: {}", err);
            None
        }
        Err(err) => {
            tracing::warn!("Artifact writer panicked: {}", err);
            None
        }
    }
}

/// Generate a route set; collaborator failures yield the fallback set.
pub async fn create_routeset(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RouteRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    if let Err(err) = check_request(
        &request,
        state.config.max_routes_per_request,
        state.config.color_policy,
    ) {
        return bad_request(err.to_string());
    }

    match state.generator().generate(&request).await {
        Ok(set) => {
            let artifacts_dir = match &state.config.output_dir {
                Some(root) => save_artifacts(&set, root).await,
                None => None,
            };
            tracing::info!("Generated {} with {} route(s)", set.id, set.routes.len());
            Json(RouteSetResponse {
                set,
                fallback: false,
                error: None,
                artifacts_dir,
            })
            .into_response()
        }
        Err(err) if err.is_input_error() => bad_request(err.to_string()),
        Err(err) => {
            tracing::warn!("Route generation failed ({}), serving fallback: {}", err.kind(), err);
            let policy = request
                .color_policy
                .unwrap_or(state.config.color_policy);
            Json(RouteSetResponse {
                set: fallback_route_set(&policy),
                fallback: true,
                error: Some(ErrorBody::from(&err)),
                artifacts_dir: None,
            })
            .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub slopes: Vec<f64>,
    #[serde(default)]
    pub color_policy: Option<ColorPolicy>,
}

/// Map slopes to colors with the server default or a supplied policy.
pub async fn classify_slopes(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let policy = request.color_policy.unwrap_or(state.config.color_policy);
    if let Err(err) = policy.validate() {
        return bad_request(err.to_string());
    }
    Json(json!({ "colors": policy.colors(&request.slopes) })).into_response()
}

pub async fn get_color_policy(State(state): State<Arc<AppState>>) -> Json<ColorPolicy> {
    Json(state.config.color_policy)
}
