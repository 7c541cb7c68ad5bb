//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`,
//! and structured payloads as compact JSON with the `type` tag included.

use chrono::{DateTime, NaiveDate, Utc};
use packtrip_core::{
  model::{
    Availability, Message, MessageKind, Participant, ParticipantRole, Preferences, Trip,
    TripState, User, Vote,
  },
  payload::MessagePayload,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  s.parse().map_err(|_| Error::DateParse(format!("bad date: {s:?}")))
}

// ─── ParticipantRole ─────────────────────────────────────────────────────────

pub fn decode_role(s: &str) -> Result<ParticipantRole> {
  match s {
    "organizer" => Ok(ParticipantRole::Organizer),
    "traveler" => Ok(ParticipantRole::Traveler),
    other => Err(Error::DateParse(format!("unknown role: {other:?}"))),
  }
}

// ─── MessagePayload ──────────────────────────────────────────────────────────

pub fn encode_payload(p: &MessagePayload) -> Result<String> {
  Ok(serde_json::to_string(p)?)
}

pub fn decode_payload(s: &str) -> Result<MessagePayload> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `trips` row.
pub struct RawTrip {
  pub trip_id:      String,
  pub title:        String,
  pub destination:  Option<String>,
  pub start_date:   Option<String>,
  pub end_date:     Option<String>,
  pub budget:       Option<i64>,
  pub state:        String,
  pub invite_token: String,
  pub created_at:   String,
}

impl RawTrip {
  pub fn into_trip(self) -> Result<Trip> {
    Ok(Trip {
      trip_id:      self.trip_id,
      title:        self.title,
      destination:  self.destination,
      start_date:   self.start_date.as_deref().map(decode_date).transpose()?,
      end_date:     self.end_date.as_deref().map(decode_date).transpose()?,
      budget:       self.budget,
      state:        TripState::parse(&self.state).map_err(Error::Core)?,
      invite_token: self.invite_token,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from a `trip_participants` row joined with `users`.
pub struct RawParticipant {
  pub trip_id:                    String,
  pub user_id:                    i64,
  pub role:                       String,
  pub is_online:                  bool,
  pub has_submitted_preferences:  bool,
  pub has_submitted_availability: bool,
  pub joined_at:                  String,
  pub username:                   String,
  pub display_name:               String,
  pub home_city:                  Option<String>,
  pub color:                      String,
}

impl RawParticipant {
  pub fn into_participant(self) -> Result<Participant> {
    Ok(Participant {
      trip_id:                    self.trip_id.clone(),
      user_id:                    self.user_id,
      role:                       decode_role(&self.role)?,
      is_online:                  self.is_online,
      has_submitted_preferences:  self.has_submitted_preferences,
      has_submitted_availability: self.has_submitted_availability,
      joined_at:                  decode_dt(&self.joined_at)?,
      user:                       Some(User {
        id:           self.user_id,
        username:     self.username,
        display_name: self.display_name,
        home_city:    self.home_city,
        color:        self.color,
      }),
    })
  }
}

/// Raw strings read directly from a `messages` row.
pub struct RawMessage {
  pub id:           i64,
  pub trip_id:      String,
  pub user_id:      Option<i64>,
  pub kind:         String,
  pub content:      String,
  pub payload_json: Option<String>,
  pub timestamp:    String,
}

impl RawMessage {
  pub fn into_message(self) -> Result<Message> {
    Ok(Message {
      id:        self.id,
      trip_id:   self.trip_id,
      user_id:   self.user_id,
      kind:      MessageKind::parse(&self.kind).map_err(Error::Core)?,
      content:   self.content,
      metadata:  self.payload_json.as_deref().map(decode_payload).transpose()?,
      timestamp: decode_dt(&self.timestamp)?,
    })
  }
}

/// Raw strings read directly from a `date_availability` row.
pub struct RawAvailability {
  pub trip_id:   String,
  pub user_id:   i64,
  pub date:      String,
  pub available: bool,
}

impl RawAvailability {
  pub fn into_availability(self) -> Result<Availability> {
    Ok(Availability {
      trip_id:   self.trip_id,
      user_id:   self.user_id,
      date:      decode_date(&self.date)?,
      available: self.available,
    })
  }
}

/// Raw strings read directly from a `votes` row.
pub struct RawVote {
  pub trip_id:   String,
  pub user_id:   i64,
  pub option_id: String,
  pub reaction:  String,
  pub timestamp: String,
}

impl RawVote {
  pub fn into_vote(self) -> Result<Vote> {
    Ok(Vote {
      trip_id:   self.trip_id,
      user_id:   self.user_id,
      option_id: self.option_id,
      reaction:  self.reaction,
      timestamp: decode_dt(&self.timestamp)?,
    })
  }
}

/// Raw strings read directly from a `user_preferences` row.
pub struct RawPreferences {
  pub trip_id:              String,
  pub user_id:              i64,
  pub budget_preference:    Option<String>,
  pub accommodation_type:   Option<String>,
  pub travel_style:         Option<String>,
  pub activities:           Option<String>,
  pub dietary_restrictions: Option<String>,
  pub special_requirements: Option<String>,
  pub raw_preferences:      String,
}

impl RawPreferences {
  pub fn into_preferences(self) -> Result<Preferences> {
    Ok(Preferences {
      trip_id:              self.trip_id,
      user_id:              self.user_id,
      budget_preference:    self.budget_preference,
      accommodation_type:   self.accommodation_type,
      travel_style:         self.travel_style,
      activities:           self.activities.as_deref().map(serde_json::from_str).transpose()?,
      dietary_restrictions: self.dietary_restrictions,
      special_requirements: self.special_requirements,
      raw_preferences:      serde_json::from_str(&self.raw_preferences)?,
    })
  }
}

// ─── Username derivation ─────────────────────────────────────────────────────

/// Slugify a display name into a username candidate: lowercase alphanumerics
/// with single hyphens between words. Uniqueness is the store's problem.
pub fn username_slug(display_name: &str) -> String {
  let mut slug = String::with_capacity(display_name.len());
  let mut last_was_hyphen = true; // suppress leading hyphens
  for c in display_name.chars() {
    if c.is_alphanumeric() {
      slug.extend(c.to_lowercase());
      last_was_hyphen = false;
    } else if !last_was_hyphen {
      slug.push('-');
      last_was_hyphen = true;
    }
  }
  let slug = slug.trim_end_matches('-').to_owned();
  if slug.is_empty() { "traveler".to_owned() } else { slug }
}
