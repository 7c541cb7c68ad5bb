//! The intent/preference classifier boundary.
//!
//! Chat messages are classified for intent (calendar vs. preferences vs.
//! general) and independently scanned for preference content. Failures are
//! the caller's to absorb; the documented fallback is
//! [`IntentAnalysis::general`].

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use packtrip_core::{consensus::resolve_bare_month, model::PreferencesUpdate};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::{
  error::Result,
  openai::OpenAiClient,
  types::{IntentAnalysis, IntentKind},
};

#[async_trait]
pub trait ClassifierService: Send + Sync {
  /// Classify a message's intent and extract any month/year mention.
  async fn analyze_intent(&self, message: &str) -> Result<IntentAnalysis>;

  /// Extract structured preference fields. `None` when the message carries
  /// no extractable structure.
  async fn extract_preferences(&self, message: &str) -> Result<Option<PreferencesUpdate>>;

  /// Does the message carry any preference signal at all, structured or
  /// not? Drives raw-text retention.
  async fn has_preference_content(&self, message: &str) -> Result<bool>;

  /// A short conversational nudge toward the shared calendar.
  async fn calendar_reply(
    &self,
    message: &str,
    destination: Option<&str>,
    participant_count: usize,
  ) -> Result<String>;
}

// ─── OpenAI-backed implementation ────────────────────────────────────────────

const INTENT_SYSTEM: &str = "You analyze travel planning messages. Classify the \
message and extract date information. Respond with a JSON object: \
{\"intent\": \"calendar\"|\"preferences\"|\"general\", \
\"date_mentions\": [strings], \"confidence\": 0.0-1.0, \
\"extracted_month\": 1-12 or null, \"extracted_year\": year or null}. \
\"calendar\" when dates or times are mentioned, \"preferences\" when travel \
preferences are mentioned, \"general\" otherwise. Extract a month number when \
a month or season is named; leave the year null unless the user stated one.";

const EXTRACT_SYSTEM: &str = "You extract travel preferences from a message. \
Respond with a JSON object of only the fields clearly present, null otherwise: \
{\"budget_preference\": \"low\"|\"medium\"|\"high\", \
\"accommodation_type\": \"hotel\"|\"hostel\"|\"airbnb\"|\"other\", \
\"travel_style\": \"adventure\"|\"cultural\"|\"relaxing\"|\"party\"|\"family\"|\"business\", \
\"activities\": [strings], \"dietary_restrictions\": string, \
\"special_requirements\": string}. All fields null when nothing is stated.";

const DETECT_SYSTEM: &str = "You detect whether a message contains any travel \
preference or desire: activities, food, accommodation, budget, style, or \
specific requests. Date-only coordination and greetings do not count. \
Respond with a JSON object {\"has_preferences\": true|false}.";

const CALENDAR_SYSTEM: &str = "You are PackTrip AI, a travel planning \
assistant. The user mentioned dates. Reply in 2-3 friendly sentences: \
acknowledge the date mention and ask everyone to mark their availability on \
the shared calendar.";

#[derive(Deserialize)]
struct DetectReply {
  has_preferences: bool,
}

pub struct OpenAiClassifier {
  client: Arc<OpenAiClient>,
}

impl OpenAiClassifier {
  pub fn new(client: Arc<OpenAiClient>) -> Self { Self { client } }
}

#[async_trait]
impl ClassifierService for OpenAiClassifier {
  async fn analyze_intent(&self, message: &str) -> Result<IntentAnalysis> {
    let today = Utc::now().date_naive();
    let user = format!("Current date: {}-{:02}. Analyze this message: {message}", today.year(), today.month());
    let mut analysis: IntentAnalysis =
      self.client.chat_json(INTENT_SYSTEM, &user, 300).await?;

    // A bare month resolves to its next future occurrence.
    if let (Some(month), None) = (analysis.extracted_month, analysis.extracted_year) {
      analysis.extracted_year = Some(resolve_bare_month(month, today));
    }
    debug!(intent = ?analysis.intent, confidence = analysis.confidence, "intent classified");
    Ok(analysis)
  }

  async fn extract_preferences(&self, message: &str) -> Result<Option<PreferencesUpdate>> {
    let user = format!("Extract preferences from: {message}");
    let extracted: PreferencesUpdate = self.client.chat_json(EXTRACT_SYSTEM, &user, 300).await?;
    Ok(if extracted.is_empty() { None } else { Some(extracted) })
  }

  async fn has_preference_content(&self, message: &str) -> Result<bool> {
    let user = format!("Does this message contain travel preferences? Message: {message}");
    let reply: DetectReply = self.client.chat_json(DETECT_SYSTEM, &user, 50).await?;
    Ok(reply.has_preferences)
  }

  async fn calendar_reply(
    &self,
    message: &str,
    destination: Option<&str>,
    participant_count: usize,
  ) -> Result<String> {
    let user = format!(
      "Trip destination: {}. Participants: {participant_count}. User said: {message}",
      destination.unwrap_or("not decided yet"),
    );
    self.client.chat_text(CALENDAR_SYSTEM, &user, 150, 0.7).await
  }
}
