//! Structured message metadata.
//!
//! The feed's `metadata` column is schemaless on the wire but every payload
//! carries a `type` discriminator string that clients branch on. Here that is
//! modelled as an internally-tagged enum with one variant per discriminator;
//! the exact strings are load-bearing and must never change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Itinerary structures ────────────────────────────────────────────────────

/// A single activity within a day. Cost is in whole currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
  pub name:        String,
  pub description: String,
  pub location:    String,
  /// Rough length estimate, e.g. `"3 hours"`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_estimate: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cost:        Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
  pub activities: Vec<Activity>,
}

/// A high-level itinerary proposal as returned by the planning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreliminaryPlan {
  pub name:          String,
  pub summary:       String,
  pub duration_days: u32,
  pub start_date:    NaiveDate,
  pub end_date:      NaiveDate,
  pub day_plans:     Vec<DayPlan>,
}

/// A display-ready option assembled from a [`PreliminaryPlan`]: stable
/// ordinal id, derived price, illustrative image, and the structured plan
/// carried through for later detailed planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryOption {
  pub option_id:   String,
  pub title:       String,
  pub description: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub price:       Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub image:       Option<String>,
  pub highlights:  Vec<String>,
  pub plan:        PreliminaryPlan,
}

/// The finalised day-by-day plan, grouped by city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityPlan {
  pub city:      String,
  pub day_plans: Vec<DayPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedItinerary {
  pub name:       String,
  pub city_plans: Vec<CityPlan>,
}

// ─── The tagged union ────────────────────────────────────────────────────────

/// Every structured payload a feed message can carry.
///
/// Variant order matches the trip lifecycle for readability only; nothing
/// depends on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
  /// Transient "working on it" placeholder, deleted once superseded.
  StatusPending {
    status: String,
  },

  /// Agent nudge toward the shared calendar after a date mention.
  CalendarSuggestion {
    #[serde(skip_serializing_if = "Option::is_none")]
    month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    year:  Option<i32>,
  },

  /// Invitation to manually trigger option generation. At most one per trip.
  GenerateOptionsPrompt {
    consensus_dates: Vec<NaiveDate>,
    #[serde(default)]
    triggered:       bool,
  },

  /// The active option menu the group votes on.
  TripOptions {
    options:         Vec<ItineraryOption>,
    consensus_dates: Vec<NaiveDate>,
  },

  /// Invitation to manually trigger detailed planning. At most one per trip.
  DetailedPlanPrompt {
    option_id: String,
    #[serde(default)]
    triggered: bool,
  },

  /// The finalised itinerary attached to a `detailed_plan` message.
  DetailedPlan {
    itinerary: DetailedItinerary,
  },

  /// Summary of the hotels/flights lookup that closes out planning.
  HotelsFlightsPlan {
    departure_city: String,
    flights_found:  usize,
    hotels_found:   usize,
  },
}

impl MessagePayload {
  /// The wire discriminator, as used in store-level dedup queries.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::StatusPending { .. } => "status_pending",
      Self::CalendarSuggestion { .. } => "calendar_suggestion",
      Self::GenerateOptionsPrompt { .. } => "generate_options_prompt",
      Self::TripOptions { .. } => "trip_options",
      Self::DetailedPlanPrompt { .. } => "detailed_plan_prompt",
      Self::DetailedPlan { .. } => "detailed_plan",
      Self::HotelsFlightsPlan { .. } => "hotels_flights_plan",
    }
  }

  /// Marks a prompt as consumed so clients suppress its call-to-action.
  /// No-op for non-prompt payloads.
  pub fn mark_triggered(&mut self) {
    match self {
      Self::GenerateOptionsPrompt { triggered, .. }
      | Self::DetailedPlanPrompt { triggered, .. } => *triggered = true,
      _ => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
  }

  #[test]
  fn discriminator_strings_are_exact() {
    let cases: Vec<(MessagePayload, &str)> = vec![
      (
        MessagePayload::StatusPending { status: "generating_options".into() },
        "status_pending",
      ),
      (
        MessagePayload::CalendarSuggestion { month: Some(10), year: Some(2026) },
        "calendar_suggestion",
      ),
      (
        MessagePayload::GenerateOptionsPrompt {
          consensus_dates: vec![date("2026-10-02")],
          triggered:       false,
        },
        "generate_options_prompt",
      ),
      (
        MessagePayload::TripOptions { options: vec![], consensus_dates: vec![] },
        "trip_options",
      ),
      (
        MessagePayload::DetailedPlanPrompt { option_id: "option_1".into(), triggered: false },
        "detailed_plan_prompt",
      ),
      (
        MessagePayload::HotelsFlightsPlan {
          departure_city: "London".into(),
          flights_found:  2,
          hotels_found:   5,
        },
        "hotels_flights_plan",
      ),
    ];

    for (payload, expected) in cases {
      assert_eq!(payload.kind(), expected);
      let v = serde_json::to_value(&payload).unwrap();
      assert_eq!(v["type"], expected, "wire tag must match kind()");
      let back: MessagePayload = serde_json::from_value(v).unwrap();
      assert_eq!(back, payload);
    }
  }

  #[test]
  fn triggered_defaults_to_false_on_decode() {
    let v = serde_json::json!({
      "type": "generate_options_prompt",
      "consensus_dates": ["2026-10-02", "2026-10-03", "2026-10-05"],
    });
    let payload: MessagePayload = serde_json::from_value(v).unwrap();
    match payload {
      MessagePayload::GenerateOptionsPrompt { triggered, consensus_dates } => {
        assert!(!triggered);
        assert_eq!(consensus_dates.len(), 3);
      }
      other => panic!("unexpected payload: {other:?}"),
    }
  }

  #[test]
  fn mark_triggered_only_touches_prompts() {
    let mut prompt =
      MessagePayload::DetailedPlanPrompt { option_id: "option_2".into(), triggered: false };
    prompt.mark_triggered();
    assert!(matches!(prompt, MessagePayload::DetailedPlanPrompt { triggered: true, .. }));

    let mut pending = MessagePayload::StatusPending { status: "x".into() };
    pending.mark_triggered();
    assert!(matches!(pending, MessagePayload::StatusPending { .. }));
  }
}
