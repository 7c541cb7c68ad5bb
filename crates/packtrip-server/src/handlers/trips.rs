//! Handlers for `/trips` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/trips` | Body: a `NewTrip` |
//! | `GET`  | `/trips/:trip_id` | 404 if not found |
//! | `POST` | `/trips/join/:token` | Body: `{"user_id": …}` |
//! | `GET`  | `/trips/:trip_id/participants` | Users populated |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use packtrip_core::{
  model::{NewTrip, Participant, ParticipantRole, Trip},
  store::TripStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

/// `POST /trips`
pub async fn create<S: TripStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewTrip>,
) -> Result<impl IntoResponse, ApiError> {
  if body.trip_id.trim().is_empty() {
    return Err(ApiError::BadRequest("trip_id must not be empty".to_owned()));
  }
  let trip = state.engine.store().create_trip(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(trip)))
}

/// `GET /trips/:trip_id`
pub async fn get_one<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
) -> Result<Json<Trip>, ApiError> {
  let trip = state
    .engine
    .store()
    .get_trip(&trip_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("trip not found: {trip_id}")))?;
  Ok(Json(trip))
}

#[derive(Debug, Deserialize)]
pub struct JoinBody {
  pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
  pub trip:        Trip,
  pub participant: Participant,
}

/// `POST /trips/join/:token` — join via invite link, always as a traveler.
pub async fn join<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(token): Path<String>,
  Json(body): Json<JoinBody>,
) -> Result<Json<JoinResponse>, ApiError> {
  let store = state.engine.store();
  let trip = store
    .get_trip_by_invite_token(&token)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("unknown invite token".to_owned()))?;
  let participant = store
    .upsert_participant(&trip.trip_id, body.user_id, ParticipantRole::Traveler)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(JoinResponse { trip, participant }))
}

/// `GET /trips/:trip_id/participants`
pub async fn participants<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
) -> Result<Json<Vec<Participant>>, ApiError> {
  let participants =
    state.engine.store().list_participants(&trip_id).await.map_err(ApiError::store)?;
  Ok(Json(participants))
}
