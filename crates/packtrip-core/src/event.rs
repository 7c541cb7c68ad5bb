//! Real-time wire frames.
//!
//! Client frames arrive over the websocket; server events are fanned out to
//! every subscriber of a trip room by the broadcast hub, which stamps each
//! one with a `timestamp` field at publish time.

use serde::{Deserialize, Serialize};

use crate::model::{Availability, Message, TripState, Vote, VoteAction};

// ─── Client → server ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
  JoinTrip {
    #[serde(rename = "tripId")]
    trip_id: String,
    #[serde(rename = "userId")]
    user_id: i64,
  },
  LeaveTrip,
  Typing,
}

// ─── Server → client ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
  NewMessage {
    message: Message,
  },
  MessageDeleted {
    message_id: i64,
  },
  /// The only in-place message mutation: a prompt's `triggered` flag flip.
  UpdateMessage {
    message: Message,
  },
  UserJoined {
    #[serde(rename = "userId")]
    user_id: i64,
  },
  UserLeft {
    #[serde(rename = "userId")]
    user_id: i64,
  },
  Typing {
    #[serde(rename = "userId")]
    user_id: i64,
  },
  VoteUpdate {
    vote:   Vote,
    action: VoteAction,
  },
  AvailabilityUpdate {
    availability: Availability,
  },
  AvailabilityBatchUpdate {
    #[serde(rename = "userId")]
    user_id: i64,
    dates:   Vec<Availability>,
  },
  PreferencesUpdate {
    #[serde(rename = "userId")]
    user_id: i64,
  },
  OptionsGenerated {
    state: TripState,
  },
  UserReset {
    #[serde(rename = "tripId")]
    trip_id: String,
  },
}
