//! Handlers for `/trips/:trip_id/preferences`.

use axum::{
  Json,
  extract::{Path, State},
};
use packtrip_core::{
  event::ServerEvent,
  model::{Preferences, PreferencesUpdate},
  store::TripStore,
};
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

/// `GET /trips/:trip_id/preferences`
pub async fn list<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
) -> Result<Json<Vec<Preferences>>, ApiError> {
  let prefs = state.engine.store().list_preferences(&trip_id).await.map_err(ApiError::store)?;
  Ok(Json(prefs))
}

/// `GET /trips/:trip_id/preferences/:user_id`
pub async fn get_one<S: TripStore>(
  State(state): State<AppState<S>>,
  Path((trip_id, user_id)): Path<(String, i64)>,
) -> Result<Json<Preferences>, ApiError> {
  let prefs = state
    .engine
    .store()
    .get_preferences(&trip_id, user_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| {
      ApiError::NotFound(format!("no preferences for user {user_id} in trip {trip_id}"))
    })?;
  Ok(Json(prefs))
}

#[derive(Debug, Deserialize)]
pub struct SetBody {
  pub user_id:     i64,
  #[serde(flatten)]
  pub update:      PreferencesUpdate,
  /// Free-text preference statement, retained verbatim.
  pub raw_message: Option<String>,
}

/// `POST /trips/:trip_id/preferences` — merge structured fields into the
/// `(user, trip)` row and broadcast after the commit.
pub async fn set<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
  Json(body): Json<SetBody>,
) -> Result<Json<Preferences>, ApiError> {
  let store = state.engine.store();
  store
    .get_trip(&trip_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("trip not found: {trip_id}")))?;

  let prefs = store
    .apply_preferences(&trip_id, body.user_id, body.update, body.raw_message)
    .await
    .map_err(ApiError::store)?;
  store
    .mark_preferences_submitted(&trip_id, body.user_id)
    .await
    .map_err(ApiError::store)?;

  state
    .engine
    .hub()
    .publish(&trip_id, &ServerEvent::PreferencesUpdate { user_id: body.user_id }, None)
    .await;
  Ok(Json(prefs))
}

#[derive(Debug, Serialize)]
pub struct MissingEntry {
  pub user_id:      i64,
  pub display_name: Option<String>,
}

/// `GET /trips/:trip_id/preferences/missing` — participants who have not
/// submitted any preference signal yet.
pub async fn missing<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
) -> Result<Json<Vec<MissingEntry>>, ApiError> {
  let participants =
    state.engine.store().list_participants(&trip_id).await.map_err(ApiError::store)?;
  let missing = participants
    .into_iter()
    .filter(|p| !p.has_submitted_preferences)
    .map(|p| MissingEntry {
      user_id:      p.user_id,
      display_name: p.user.map(|u| u.display_name),
    })
    .collect();
  Ok(Json(missing))
}
