//! Domain entities for the trip-planning coordinator.
//!
//! These are the store-agnostic shapes shared by every layer: the storage
//! backend persists them, the engine reasons over them, and the API
//! serialises them to clients unchanged.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::Error, payload::MessagePayload};

// ─── Trip lifecycle ──────────────────────────────────────────────────────────

/// The authoritative phase of a trip.
///
/// Phases only move forward through this sequence. The single exception is
/// the administrative reset, which force-sets `CollectingDates` and wipes the
/// trip's accumulated data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripState {
  Init,
  CollectingDates,
  VotingHighLevel,
  DetailedPlanReady,
  HotelsFlightsReady,
}

impl TripState {
  /// Wire representation, stable across clients and the store.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Init => "INIT",
      Self::CollectingDates => "COLLECTING_DATES",
      Self::VotingHighLevel => "VOTING_HIGH_LEVEL",
      Self::DetailedPlanReady => "DETAILED_PLAN_READY",
      Self::HotelsFlightsReady => "HOTELS_FLIGHTS_READY",
    }
  }

  pub fn parse(s: &str) -> Result<Self, Error> {
    match s {
      "INIT" => Ok(Self::Init),
      "COLLECTING_DATES" => Ok(Self::CollectingDates),
      "VOTING_HIGH_LEVEL" => Ok(Self::VotingHighLevel),
      "DETAILED_PLAN_READY" => Ok(Self::DetailedPlanReady),
      "HOTELS_FLIGHTS_READY" => Ok(Self::HotelsFlightsReady),
      other => Err(Error::UnknownTripState(other.to_owned())),
    }
  }

  /// `true` iff moving from `self` to `next` respects the forward-only rule.
  pub fn can_advance_to(&self, next: TripState) -> bool { next >= *self }
}

/// A shared planning session, keyed externally by `trip_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
  pub trip_id:      String,
  pub title:        String,
  pub destination:  Option<String>,
  pub start_date:   Option<NaiveDate>,
  pub end_date:     Option<NaiveDate>,
  pub budget:       Option<i64>,
  pub state:        TripState,
  /// Capability-style secret embedded in join links. Treat as sensitive.
  pub invite_token: String,
  pub created_at:   DateTime<Utc>,
}

/// Input for trip creation. The store assigns `invite_token` and timestamps;
/// `trip_id` is caller-visible and must be unique.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTrip {
  pub trip_id:     String,
  pub title:       String,
  pub destination: Option<String>,
  pub start_date:  Option<NaiveDate>,
  pub end_date:    Option<NaiveDate>,
  pub budget:      Option<i64>,
}

// ─── Users and participants ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub id:           i64,
  /// Derived from the display name at creation; unique.
  pub username:     String,
  pub display_name: String,
  pub home_city:    Option<String>,
  /// Presentation only; never interpreted server-side.
  pub color:        String,
}

/// Input for user creation. The store derives a unique `username` from the
/// display name and assigns the id.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
  pub display_name: String,
  pub home_city:    Option<String>,
  pub color:        Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
  Organizer,
  Traveler,
}

impl ParticipantRole {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Organizer => "organizer",
      Self::Traveler => "traveler",
    }
  }
}

/// A user's membership record within one trip. Exactly one row per
/// `(trip, user)` pair, maintained by upsert-on-join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
  pub trip_id:                    String,
  pub user_id:                    i64,
  pub role:                       ParticipantRole,
  pub is_online:                  bool,
  pub has_submitted_preferences:  bool,
  pub has_submitted_availability: bool,
  pub joined_at:                  DateTime<Utc>,
  /// Populated by list endpoints so clients need no second fetch.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user:                       Option<User>,
}

// ─── Availability and votes ──────────────────────────────────────────────────

/// One user's yes/no for one calendar date in one trip. At most one row per
/// `(trip, user, date)`; re-submission overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Availability {
  pub trip_id:   String,
  pub user_id:   i64,
  pub date:      NaiveDate,
  pub available: bool,
}

/// The reaction kind that feeds winner detection. Anything else is
/// presentation-only colour.
pub const AGREE_REACTION: &str = "agree";

/// A reaction against one generated option. Presence is the whole signal;
/// there is no weight. Toggle semantics: re-submitting an identical
/// `(user, option, reaction)` removes the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
  pub trip_id:   String,
  pub user_id:   i64,
  pub option_id: String,
  pub reaction:  String,
  pub timestamp: DateTime<Utc>,
}

/// Outcome of a vote submission under toggle semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
  Added,
  Removed,
}

// ─── Preferences ─────────────────────────────────────────────────────────────

/// Structured and raw preference signals for one `(user, trip)` pair.
///
/// The raw message list is append-only and always retained, even when
/// structured extraction produced nothing; it is the durable input to the
/// generation pipelines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
  pub user_id:              i64,
  pub trip_id:              String,
  pub budget_preference:    Option<String>,
  pub accommodation_type:   Option<String>,
  pub travel_style:         Option<String>,
  pub activities:           Option<Vec<String>>,
  pub dietary_restrictions: Option<String>,
  pub special_requirements: Option<String>,
  pub raw_preferences:      Vec<String>,
}

/// Structured fields only, as produced by extraction or the preferences
/// endpoint. `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesUpdate {
  pub budget_preference:    Option<String>,
  pub accommodation_type:   Option<String>,
  pub travel_style:         Option<String>,
  pub activities:           Option<Vec<String>>,
  pub dietary_restrictions: Option<String>,
  pub special_requirements: Option<String>,
}

impl PreferencesUpdate {
  pub fn is_empty(&self) -> bool {
    self.budget_preference.is_none()
      && self.accommodation_type.is_none()
      && self.travel_style.is_none()
      && self.activities.is_none()
      && self.dietary_restrictions.is_none()
      && self.special_requirements.is_none()
  }
}

// ─── Messages ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
  User,
  Agent,
  System,
  DetailedPlan,
}

impl MessageKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::User => "user",
      Self::Agent => "agent",
      Self::System => "system",
      Self::DetailedPlan => "detailed_plan",
    }
  }

  pub fn parse(s: &str) -> Result<Self, Error> {
    match s {
      "user" => Ok(Self::User),
      "agent" => Ok(Self::Agent),
      "system" => Ok(Self::System),
      "detailed_plan" => Ok(Self::DetailedPlan),
      other => Err(Error::UnknownMessageKind(other.to_owned())),
    }
  }
}

/// One entry in a trip's append-only feed. `user_id` is `None` for system
/// and agent messages. Entries are never updated after insertion except to
/// flip a prompt payload's `triggered` flag, and only ephemeral pending
/// placeholders are ever deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
  pub id:        i64,
  pub trip_id:   String,
  pub user_id:   Option<i64>,
  #[serde(rename = "type")]
  pub kind:      MessageKind,
  pub content:   String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub metadata:  Option<MessagePayload>,
  pub timestamp: DateTime<Utc>,
}

/// Input for feed appends. The store assigns `id` and `timestamp`.
#[derive(Debug, Clone)]
pub struct NewMessage {
  pub trip_id:  String,
  pub user_id:  Option<i64>,
  pub kind:     MessageKind,
  pub content:  String,
  pub metadata: Option<MessagePayload>,
}

impl NewMessage {
  /// An agent-authored message (no user attribution).
  pub fn agent(trip_id: &str, content: impl Into<String>, metadata: Option<MessagePayload>) -> Self {
    Self {
      trip_id: trip_id.to_owned(),
      user_id: None,
      kind: MessageKind::Agent,
      content: content.into(),
      metadata,
    }
  }

  /// A system message shown in the transcript without an author.
  pub fn system(trip_id: &str, content: impl Into<String>) -> Self {
    Self {
      trip_id: trip_id.to_owned(),
      user_id: None,
      kind: MessageKind::System,
      content: content.into(),
      metadata: None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn trip_state_round_trips_through_wire_strings() {
    for state in [
      TripState::Init,
      TripState::CollectingDates,
      TripState::VotingHighLevel,
      TripState::DetailedPlanReady,
      TripState::HotelsFlightsReady,
    ] {
      assert_eq!(TripState::parse(state.as_str()).unwrap(), state);
    }
    assert!(TripState::parse("PLANNING").is_err());
  }

  #[test]
  fn trip_state_is_forward_only() {
    assert!(TripState::CollectingDates.can_advance_to(TripState::VotingHighLevel));
    assert!(TripState::VotingHighLevel.can_advance_to(TripState::VotingHighLevel));
    assert!(!TripState::VotingHighLevel.can_advance_to(TripState::CollectingDates));
    assert!(!TripState::HotelsFlightsReady.can_advance_to(TripState::DetailedPlanReady));
  }

  #[test]
  fn message_kind_serialises_as_type_field() {
    let msg = Message {
      id:        1,
      trip_id:   "t1".into(),
      user_id:   None,
      kind:      MessageKind::DetailedPlan,
      content:   "plan".into(),
      metadata:  None,
      timestamp: Utc::now(),
    };
    let v = serde_json::to_value(&msg).unwrap();
    assert_eq!(v["type"], "detailed_plan");
  }
}
