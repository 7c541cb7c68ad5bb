//! Handlers for the `/trips/:trip_id/messages` feed.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use packtrip_core::{model::Message, store::TripStore};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

/// `GET /trips/:trip_id/messages` — the full feed in insertion order.
pub async fn list<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
  let messages = state.engine.store().list_messages(&trip_id).await.map_err(ApiError::store)?;
  Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_id: i64,
  pub content: String,
}

/// `POST /trips/:trip_id/messages` — store, broadcast, then run intent
/// classification and preference capture.
pub async fn create<S: TripStore>(
  State(state): State<AppState<S>>,
  Path(trip_id): Path<String>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  if body.content.trim().is_empty() {
    return Err(ApiError::BadRequest("content must not be empty".to_owned()));
  }
  let message = state.engine.ingest_user_message(&trip_id, body.user_id, &body.content).await?;
  Ok((StatusCode::CREATED, Json(message)))
}
