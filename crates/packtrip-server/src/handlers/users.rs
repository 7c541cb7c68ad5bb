//! Handlers for `/users` endpoints.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use packtrip_core::{
  model::{NewUser, User},
  store::TripStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// `POST /users` — the store derives a unique username from the display
/// name.
pub async fn create<S: TripStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
  if body.display_name.trim().is_empty() {
    return Err(ApiError::BadRequest("display_name must not be empty".to_owned()));
  }
  let user = state.engine.store().create_user(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/:id`
pub async fn get_one<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
  let user = state
    .engine
    .store()
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user not found: {id}")))?;
  Ok(Json(user))
}

#[derive(Debug, Deserialize)]
pub struct HomeCityBody {
  pub home_city: String,
}

/// `PUT /users/:id/home-city` — backfill for the hotels/flights departure
/// lookup.
pub async fn set_home_city<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<HomeCityBody>,
) -> Result<StatusCode, ApiError> {
  state
    .engine
    .store()
    .set_home_city(id, &body.home_city)
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
