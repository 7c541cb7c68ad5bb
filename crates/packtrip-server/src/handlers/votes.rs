//! Handlers for `/trips/:trip_id/votes`.

use axum::{
  Json,
  extract::{Path, State},
};
use packtrip_core::{
  model::{Vote, VoteAction},
  store::TripStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

/// `GET /trips/:trip_id/votes`
pub async fn list<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
) -> Result<Json<Vec<Vote>>, ApiError> {
  let votes = state.engine.store().list_votes(&trip_id).await.map_err(ApiError::store)?;
  Ok(Json(votes))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_id:   i64,
  pub option_id: String,
  pub reaction:  String,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
  pub action: VoteAction,
  pub vote:   Vote,
}

/// `POST /trips/:trip_id/votes` — toggle semantics: re-submitting an
/// identical vote removes it. Winner detection runs after the commit.
pub async fn create<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
  Json(body): Json<CreateBody>,
) -> Result<Json<VoteResponse>, ApiError> {
  let (action, vote) = state
    .engine
    .submit_vote(&trip_id, body.user_id, &body.option_id, &body.reaction)
    .await?;
  Ok(Json(VoteResponse { action, vote }))
}
