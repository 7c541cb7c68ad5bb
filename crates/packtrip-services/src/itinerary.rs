//! The itinerary-planning boundary.
//!
//! Option proposals come from an OpenAI JSON-mode completion; the detailed
//! day-by-day plan comes from the external planner API. Both calls can take
//! minutes — the caller configures the (long) timeout, reflecting genuine
//! generation latency.

use std::time::Duration;

use async_trait::async_trait;
use packtrip_core::payload::{DetailedItinerary, PreliminaryPlan};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::{
  error::{Result, ServiceError},
  openai::OpenAiClient,
  types::{OptionsRequest, PlanRequest},
};

#[async_trait]
pub trait ItineraryService: Send + Sync {
  /// Propose 1+ distinct high-level plans for the group. An empty result is
  /// a failed generation; the caller aborts without side effects.
  async fn propose_options(&self, request: &OptionsRequest) -> Result<Vec<PreliminaryPlan>>;

  /// Expand the winning option into a finalised day-by-day itinerary.
  async fn detailed_plan(&self, request: &PlanRequest) -> Result<DetailedItinerary>;
}

// ─── HTTP implementation ─────────────────────────────────────────────────────

const PROPOSE_SYSTEM: &str = "You are PackTrip AI, a travel planning expert \
specializing in group dynamics. Generate 3 distinct trip itinerary options \
that resolve conflicts between the group's individual preferences: one \
focused on common ground, one a balanced compromise, one satisfying \
different people in different parts of the trip. Each plan chooses start \
and end dates within the consensus dates, varies duration between 3 and 7 \
days, and lists concrete day-by-day activities with locations and costs in \
whole euros. Respond with a JSON object: {\"plans\": [{\"name\": string, \
\"summary\": string, \"duration_days\": int, \"start_date\": \"YYYY-MM-DD\", \
\"end_date\": \"YYYY-MM-DD\", \"day_plans\": [{\"activities\": [{\"name\": \
string, \"description\": string, \"location\": string, \
\"duration_estimate\": string or null, \"cost\": int or null}]}]}]}.";

#[derive(Deserialize)]
struct ProposedPlans {
  plans: Vec<PreliminaryPlan>,
}

pub struct PlannerClient {
  openai:   Arc<OpenAiClient>,
  http:     Client,
  base_url: String,
}

impl PlannerClient {
  /// `timeout` bounds the external planner call; itinerary generation is
  /// slow (the upstream default is 200 seconds).
  pub fn new(
    openai: Arc<OpenAiClient>,
    base_url: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self> {
    let http = Client::builder().timeout(timeout).build()?;
    Ok(Self { openai, http, base_url: base_url.into() })
  }
}

#[async_trait]
impl ItineraryService for PlannerClient {
  async fn propose_options(&self, request: &OptionsRequest) -> Result<Vec<PreliminaryPlan>> {
    let user = format!(
      "Generate 3 trip options.\n\
       Destination: {}\nBudget: {}\nAvailable dates: {}\nGroup size: {}\n\
       Individual preferences, grouped by person:\n{}",
      request.destination,
      request.budget.map_or("unspecified".to_owned(), |b| format!("{b} EUR")),
      serde_json::to_string(&request.consensus_dates)?,
      request.grouped_preferences.len(),
      serde_json::to_string_pretty(&request.grouped_preferences)?,
    );

    let proposed: ProposedPlans = self.openai.chat_json(PROPOSE_SYSTEM, &user, 3000).await?;
    debug!(count = proposed.plans.len(), "itinerary options proposed");
    Ok(proposed.plans)
  }

  async fn detailed_plan(&self, request: &PlanRequest) -> Result<DetailedItinerary> {
    let payload = json!({
      "conversation_id": request.trip_id,
      "traveler_input": {
        "country": request.destination,
        "cities": [request.destination],
        "arrival_date": request.start_date,
        "departure_date": request.end_date,
        "theme": request.option_title,
        "summary": request.option_summary,
        "preferences": if request.raw_preferences.is_empty() {
          None
        } else {
          Some(&request.raw_preferences)
        },
      },
    });

    let response = self
      .http
      .post(format!("{}/plan_itinerary", self.base_url))
      .json(&payload)
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status().as_u16();
      let body = response.text().await.unwrap_or_default();
      return Err(ServiceError::Status { status, body });
    }

    #[derive(Deserialize)]
    struct PlanReply {
      itinerary: DetailedItinerary,
    }
    let reply: PlanReply = response.json().await?;
    Ok(reply.itinerary)
  }
}
