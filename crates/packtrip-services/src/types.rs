//! Request/response shapes at the service boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ─── Classifier ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
  Calendar,
  Preferences,
  General,
}

/// Intent classification of one chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentAnalysis {
  pub intent:          IntentKind,
  #[serde(default)]
  pub date_mentions:   Vec<String>,
  pub confidence:      f32,
  /// 1-12 when a month was identified.
  #[serde(default)]
  pub extracted_month: Option<u32>,
  /// Stated year, or resolved to the month's next future occurrence.
  #[serde(default)]
  pub extracted_year:  Option<i32>,
}

impl IntentAnalysis {
  /// The neutral fallback when classification fails: general intent with
  /// zero confidence.
  pub fn general() -> Self {
    Self {
      intent:          IntentKind::General,
      date_mentions:   Vec::new(),
      confidence:      0.0,
      extracted_month: None,
      extracted_year:  None,
    }
  }
}

// ─── Itinerary planning ──────────────────────────────────────────────────────

/// One participant's raw preference text, kept grouped per person so the
/// planner can reason about per-person conflicts.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedPreferences {
  pub user_id:         i64,
  pub user_name:       String,
  pub raw_preferences: Vec<String>,
}

/// Context for generating the option menu.
#[derive(Debug, Clone, Serialize)]
pub struct OptionsRequest {
  pub destination:         String,
  pub budget:              Option<i64>,
  pub consensus_dates:     Vec<NaiveDate>,
  pub grouped_preferences: Vec<GroupedPreferences>,
}

/// Context for generating the detailed plan from the winning option.
#[derive(Debug, Clone, Serialize)]
pub struct PlanRequest {
  pub trip_id:         String,
  pub destination:     String,
  pub option_title:    String,
  pub option_summary:  String,
  pub start_date:      NaiveDate,
  pub end_date:        NaiveDate,
  pub raw_preferences: Vec<String>,
}

// ─── Hotels & flights ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TravelSearchRequest {
  pub departure_city: String,
  pub destination:    String,
  pub start_date:     NaiveDate,
  pub end_date:       NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlightRoute {
  pub carrier: String,
  pub summary: String,
  #[serde(default)]
  pub price:   Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HotelListing {
  pub name:  String,
  #[serde(default)]
  pub area:  Option<String>,
  #[serde(default)]
  pub price_per_night: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TravelSearchResult {
  #[serde(default)]
  pub flights: Vec<FlightRoute>,
  #[serde(default)]
  pub hotels:  Vec<HotelListing>,
}
