//! HTTP and websocket surface for PackTrip.
//!
//! Exposes an axum [`Router`] backed by a [`packtrip_engine::Engine`] over
//! any [`packtrip_core::store::TripStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.

pub mod error;
pub mod handlers;
pub mod seed;
pub mod ws;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use packtrip_core::store::TripStore;
use packtrip_engine::Engine;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `PACKTRIP_*` environment overrides.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: std::path::PathBuf,

  pub openai_api_key:   String,
  #[serde(default = "default_openai_base_url")]
  pub openai_base_url:  String,
  #[serde(default = "default_openai_model")]
  pub openai_model:     String,
  pub getimg_api_key:   String,
  #[serde(default = "default_getimg_base_url")]
  pub getimg_base_url:  String,
  /// External planner exposing `POST /plan_itinerary` and
  /// `POST /find_hotels_flights`.
  pub planner_base_url: String,

  /// Departure fallback when no participant has a home city.
  #[serde(default = "default_departure_city")]
  pub default_departure_city: String,

  /// Seed the demo trip on first start.
  #[serde(default)]
  pub seed_demo: bool,
}

fn default_openai_base_url() -> String {
  "https://api.openai.com/v1".to_owned()
}

fn default_openai_model() -> String {
  "gpt-4o".to_owned()
}

fn default_getimg_base_url() -> String {
  "https://api.getimg.ai".to_owned()
}

fn default_departure_city() -> String {
  "London".to_owned()
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub engine: Arc<Engine<S>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { engine: self.engine.clone() }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full PackTrip router: JSON API under `/api`, the realtime
/// channel at `/ws`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: TripStore + 'static,
{
  Router::new()
    // Trips
    .route("/api/trips", post(handlers::trips::create::<S>))
    .route("/api/trips/{trip_id}", get(handlers::trips::get_one::<S>))
    .route("/api/trips/join/{token}", post(handlers::trips::join::<S>))
    .route("/api/trips/{trip_id}/participants", get(handlers::trips::participants::<S>))
    // Users
    .route("/api/users", post(handlers::users::create::<S>))
    .route("/api/users/{id}", get(handlers::users::get_one::<S>))
    .route("/api/users/{id}/home-city", put(handlers::users::set_home_city::<S>))
    // Feed
    .route(
      "/api/trips/{trip_id}/messages",
      get(handlers::messages::list::<S>).post(handlers::messages::create::<S>),
    )
    // Votes
    .route(
      "/api/trips/{trip_id}/votes",
      get(handlers::votes::list::<S>).post(handlers::votes::create::<S>),
    )
    // Availability
    .route(
      "/api/trips/{trip_id}/availability",
      get(handlers::availability::list::<S>).post(handlers::availability::set_one::<S>),
    )
    .route("/api/trips/{trip_id}/availability/batch", post(handlers::availability::set_batch::<S>))
    // Preferences
    .route(
      "/api/trips/{trip_id}/preferences",
      get(handlers::preferences::list::<S>).post(handlers::preferences::set::<S>),
    )
    .route("/api/trips/{trip_id}/preferences/missing", get(handlers::preferences::missing::<S>))
    .route("/api/trips/{trip_id}/preferences/{user_id}", get(handlers::preferences::get_one::<S>))
    // Manual triggers and admin
    .route("/api/trips/{trip_id}/generate-options", post(handlers::triggers::generate_options::<S>))
    .route(
      "/api/trips/{trip_id}/generate-detailed-plan",
      post(handlers::triggers::generate_detailed_plan::<S>),
    )
    .route("/api/trips/{trip_id}/reset", post(handlers::triggers::reset::<S>))
    // Realtime
    .route("/ws", get(ws::handler::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;

  use async_trait::async_trait;
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use packtrip_core::{
    model::PreferencesUpdate,
    payload::{Activity, DayPlan, DetailedItinerary, PreliminaryPlan},
  };
  use packtrip_engine::{EngineConfig, Hub, Services};
  use packtrip_services::{
    ClassifierService, ImageService, ItineraryService, TravelSearchService,
    types::{
      IntentAnalysis, OptionsRequest, PlanRequest, TravelSearchRequest, TravelSearchResult,
    },
  };
  use packtrip_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  struct NullClassifier;

  #[async_trait]
  impl ClassifierService for NullClassifier {
    async fn analyze_intent(&self, _message: &str) -> packtrip_services::Result<IntentAnalysis> {
      Ok(IntentAnalysis::general())
    }

    async fn extract_preferences(
      &self,
      _message: &str,
    ) -> packtrip_services::Result<Option<PreferencesUpdate>> {
      Ok(None)
    }

    async fn has_preference_content(&self, _message: &str) -> packtrip_services::Result<bool> {
      Ok(false)
    }

    async fn calendar_reply(
      &self,
      _message: &str,
      _destination: Option<&str>,
      _participant_count: usize,
    ) -> packtrip_services::Result<String> {
      Ok("Mark your availability below!".to_owned())
    }
  }

  struct StubItinerary;

  #[async_trait]
  impl ItineraryService for StubItinerary {
    async fn propose_options(
      &self,
      _request: &OptionsRequest,
    ) -> packtrip_services::Result<Vec<PreliminaryPlan>> {
      let day = DayPlan {
        activities: vec![Activity {
          name:              "Old town walk".to_owned(),
          description:       "A walk".to_owned(),
          location:          "Old town".to_owned(),
          duration_estimate: None,
          cost:              Some(20),
        }],
      };
      Ok(vec![PreliminaryPlan {
        name:          "Culture & History".to_owned(),
        summary:       "Museums and tapas".to_owned(),
        duration_days: 3,
        start_date:    "2026-10-01".parse().unwrap(),
        end_date:      "2026-10-03".parse().unwrap(),
        day_plans:     vec![day.clone(), day.clone(), day],
      }])
    }

    async fn detailed_plan(
      &self,
      request: &PlanRequest,
    ) -> packtrip_services::Result<DetailedItinerary> {
      Ok(DetailedItinerary {
        name:       request.option_title.clone(),
        city_plans: vec![],
      })
    }
  }

  struct StubImage;

  #[async_trait]
  impl ImageService for StubImage {
    async fn illustrate(&self, _prompt: &str) -> packtrip_services::Result<String> {
      Ok("https://example.com/option.jpg".to_owned())
    }
  }

  struct StubTravel;

  #[async_trait]
  impl TravelSearchService for StubTravel {
    async fn search(
      &self,
      _request: &TravelSearchRequest,
    ) -> packtrip_services::Result<TravelSearchResult> {
      Ok(TravelSearchResult::default())
    }
  }

  async fn make_state() -> AppState<SqliteStore> {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let services = Services {
      classifier: Arc::new(NullClassifier),
      itinerary:  Arc::new(StubItinerary),
      image:      Arc::new(StubImage),
      travel:     Arc::new(StubTravel),
    };
    let engine = Engine::new(store, Hub::new(), services, EngineConfig::default());
    AppState { engine: Arc::new(engine) }
  }

  async fn oneshot_json(
    state: AppState<SqliteStore>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = router(state).oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn seed_trip(state: &AppState<SqliteStore>) -> Value {
    let (status, trip) = oneshot_json(
      state.clone(),
      "POST",
      "/api/trips",
      Some(json!({ "trip_id": "BCN-1", "title": "Barcelona", "destination": "Barcelona" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    trip
  }

  async fn seed_user(state: &AppState<SqliteStore>, name: &str) -> i64 {
    let (status, user) = oneshot_json(
      state.clone(),
      "POST",
      "/api/users",
      Some(json!({ "display_name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    user["id"].as_i64().unwrap()
  }

  #[tokio::test]
  async fn create_and_fetch_trip() {
    let state = make_state().await;
    let trip = seed_trip(&state).await;
    assert_eq!(trip["state"], "COLLECTING_DATES");
    assert!(trip["invite_token"].as_str().is_some_and(|t| !t.is_empty()));

    let (status, fetched) = oneshot_json(state, "GET", "/api/trips/BCN-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "Barcelona");
  }

  #[tokio::test]
  async fn unknown_trip_is_404_with_error_body() {
    let state = make_state().await;
    let (status, body) = oneshot_json(state, "GET", "/api/trips/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());
  }

  #[tokio::test]
  async fn empty_trip_id_is_rejected() {
    let state = make_state().await;
    let (status, _) = oneshot_json(
      state,
      "POST",
      "/api/trips",
      Some(json!({ "trip_id": "  ", "title": "Nowhere" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn join_via_invite_token() {
    let state = make_state().await;
    let trip = seed_trip(&state).await;
    let token = trip["invite_token"].as_str().unwrap().to_owned();
    let user_id = seed_user(&state, "Bob Smith").await;

    let (status, joined) = oneshot_json(
      state.clone(),
      "POST",
      &format!("/api/trips/join/{token}"),
      Some(json!({ "user_id": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["trip"]["trip_id"], "BCN-1");
    assert_eq!(joined["participant"]["role"], "traveler");

    let (_, participants) =
      oneshot_json(state, "GET", "/api/trips/BCN-1/participants", None).await;
    assert_eq!(participants.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn posted_message_lands_in_the_feed() {
    let state = make_state().await;
    seed_trip(&state).await;
    let user_id = seed_user(&state, "Alice Johnson").await;

    let (status, _) = oneshot_json(
      state.clone(),
      "POST",
      "/api/trips/BCN-1/messages",
      Some(json!({ "user_id": user_id, "content": "hey everyone" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, feed) = oneshot_json(state, "GET", "/api/trips/BCN-1/messages", None).await;
    let feed = feed.as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["content"], "hey everyone");
    assert_eq!(feed[0]["type"], "user");
  }

  #[tokio::test]
  async fn batch_availability_drives_the_consensus_prompt() {
    let state = make_state().await;
    seed_trip(&state).await;
    let alice = seed_user(&state, "Alice Johnson").await;
    let bob = seed_user(&state, "Bob Smith").await;

    let dates = json!([
      { "date": "2026-10-01", "available": true },
      { "date": "2026-10-02", "available": true },
      { "date": "2026-10-03", "available": true },
    ]);
    for user_id in [alice, bob] {
      let (status, marks) = oneshot_json(
        state.clone(),
        "POST",
        "/api/trips/BCN-1/availability/batch",
        Some(json!({ "user_id": user_id, "dates": dates })),
      )
      .await;
      assert_eq!(status, StatusCode::OK);
      assert_eq!(marks.as_array().unwrap().len(), 3);
    }

    let (_, feed) = oneshot_json(state, "GET", "/api/trips/BCN-1/messages", None).await;
    let prompts: Vec<&Value> = feed
      .as_array()
      .unwrap()
      .iter()
      .filter(|m| m["metadata"]["type"] == "generate_options_prompt")
      .collect();
    assert_eq!(prompts.len(), 1);
  }

  #[tokio::test]
  async fn forced_generation_posts_the_option_menu() {
    let state = make_state().await;
    seed_trip(&state).await;
    seed_user(&state, "Alice Johnson").await;

    let (status, _) = oneshot_json(
      state.clone(),
      "POST",
      "/api/trips/BCN-1/generate-options",
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, trip) = oneshot_json(state.clone(), "GET", "/api/trips/BCN-1", None).await;
    assert_eq!(trip["state"], "VOTING_HIGH_LEVEL");

    let (_, feed) = oneshot_json(state, "GET", "/api/trips/BCN-1/messages", None).await;
    let menu = feed
      .as_array()
      .unwrap()
      .iter()
      .find(|m| m["metadata"]["type"] == "trip_options")
      .expect("option menu in feed");
    assert_eq!(menu["metadata"]["options"][0]["option_id"], "option_1");
  }

  #[tokio::test]
  async fn mutations_on_unknown_trips_are_404_not_500() {
    let state = make_state().await;
    let user_id = seed_user(&state, "Alice Johnson").await;

    let (status, body) = oneshot_json(
      state.clone(),
      "POST",
      "/api/trips/ghost/preferences",
      Some(json!({ "user_id": user_id, "raw_message": "beach please" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().is_some());

    let (status, _) = oneshot_json(
      state.clone(),
      "POST",
      "/api/trips/ghost/votes",
      Some(json!({ "user_id": user_id, "option_id": "option_1", "reaction": "agree" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = oneshot_json(
      state,
      "POST",
      "/api/trips/ghost/availability",
      Some(json!({ "user_id": user_id, "date": "2026-10-01", "available": true })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn reset_requires_the_trip_id_as_confirmation() {
    let state = make_state().await;
    seed_trip(&state).await;

    let (status, _) = oneshot_json(
      state.clone(),
      "POST",
      "/api/trips/BCN-1/reset",
      Some(json!({ "confirm": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = oneshot_json(
      state,
      "POST",
      "/api/trips/BCN-1/reset",
      Some(json!({ "confirm": "BCN-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "reset");
  }
}
