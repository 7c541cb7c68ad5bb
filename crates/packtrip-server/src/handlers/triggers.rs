//! Manual generation triggers and the administrative reset.
//!
//! The trigger endpoints are the force path: they bypass the automatic
//! consensus thresholds, which is exactly what a "do it anyway" button
//! needs. The generation itself is idempotent, so mashing the button
//! cannot double-generate.

use axum::{
  Json,
  extract::{Path, State},
};
use packtrip_core::store::TripStore;
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, error::ApiError};

/// `POST /trips/:trip_id/generate-options`
pub async fn generate_options<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
  state.engine.force_generate_options(&trip_id).await?;
  Ok(Json(json!({ "status": "ok" })))
}

#[derive(Debug, Default, Deserialize)]
pub struct DetailedPlanBody {
  /// Explicit menu choice; without it a unanimous winner must exist.
  pub option_id: Option<String>,
}

/// `POST /trips/:trip_id/generate-detailed-plan`
pub async fn generate_detailed_plan<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
  body: Option<Json<DetailedPlanBody>>,
) -> Result<Json<serde_json::Value>, ApiError> {
  let option_id = body.and_then(|Json(b)| b.option_id);
  state.engine.force_generate_detailed_plan(&trip_id, option_id.as_deref()).await?;
  Ok(Json(json!({ "status": "ok" })))
}

#[derive(Debug, Deserialize)]
pub struct ResetBody {
  /// Must echo the trip id back.
  pub confirm: String,
}

/// `POST /trips/:trip_id/reset` — demo/debug escape hatch.
pub async fn reset<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
  Json(body): Json<ResetBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
  state.engine.reset_trip(&trip_id, &body.confirm).await?;
  Ok(Json(json!({ "status": "reset" })))
}
