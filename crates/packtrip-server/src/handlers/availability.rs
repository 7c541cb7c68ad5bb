//! Handlers for `/trips/:trip_id/availability`.

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::NaiveDate;
use packtrip_core::{model::Availability, store::TripStore};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// `GET /trips/:trip_id/availability`
pub async fn list<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
) -> Result<Json<Vec<Availability>>, ApiError> {
  let marks = state.engine.store().list_availability(&trip_id).await.map_err(ApiError::store)?;
  Ok(Json(marks))
}

#[derive(Debug, Deserialize)]
pub struct SetBody {
  pub user_id:   i64,
  pub date:      NaiveDate,
  pub available: bool,
}

/// `POST /trips/:trip_id/availability` — upsert one mark; consensus
/// detection runs after the commit.
pub async fn set_one<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
  Json(body): Json<SetBody>,
) -> Result<Json<Availability>, ApiError> {
  let mark = state
    .engine
    .submit_availability(&trip_id, body.user_id, body.date, body.available)
    .await?;
  Ok(Json(mark))
}

#[derive(Debug, Deserialize)]
pub struct BatchEntry {
  pub date:      NaiveDate,
  pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct BatchBody {
  pub user_id: i64,
  pub dates:   Vec<BatchEntry>,
}

/// `POST /trips/:trip_id/availability/batch` — one commit, one broadcast,
/// one consensus check for a whole calendar sweep.
pub async fn set_batch<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
  Json(body): Json<BatchBody>,
) -> Result<Json<Vec<Availability>>, ApiError> {
  let dates = body.dates.into_iter().map(|e| (e.date, e.available)).collect();
  let marks = state.engine.submit_availability_batch(&trip_id, body.user_id, dates).await?;
  Ok(Json(marks))
}
