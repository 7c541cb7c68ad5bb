//! The `TripStore` trait.
//!
//! Implemented by storage backends (e.g. `packtrip-store-sqlite`). The
//! engine and the API depend on this abstraction, not on any concrete
//! backend.
//!
//! The feed is the durable record consensus idempotency derives from, so
//! besides plain CRUD the trait carries the two queries the engines dedup
//! against ([`TripStore::has_payload_message`],
//! [`TripStore::latest_payload_message`]) and one compound write
//! ([`TripStore::finalize_generation`]) that must commit atomically.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  model::{
    Availability, Message, NewMessage, NewTrip, NewUser, Participant, ParticipantRole,
    Preferences, PreferencesUpdate, Trip, TripState, User, Vote, VoteAction,
  },
  payload::MessagePayload,
};

/// Abstraction over a trip-planning store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (tokio with `axum`).
pub trait TripStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Trips ─────────────────────────────────────────────────────────────

  /// Create and persist a trip in `COLLECTING_DATES`, assigning a fresh
  /// invite token. Fails if `trip_id` is taken.
  fn create_trip(
    &self,
    input: NewTrip,
  ) -> impl Future<Output = Result<Trip, Self::Error>> + Send + '_;

  /// Retrieve a trip by its external key. Returns `None` if not found.
  fn get_trip<'a>(
    &'a self,
    trip_id: &'a str,
  ) -> impl Future<Output = Result<Option<Trip>, Self::Error>> + Send + 'a;

  /// Resolve an invite token to its trip. Returns `None` if not found.
  fn get_trip_by_invite_token<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<Option<Trip>, Self::Error>> + Send + 'a;

  /// Advance the trip phase. Rejects backward transitions; the reset
  /// operation is the only sanctioned way back.
  fn set_trip_state<'a>(
    &'a self,
    trip_id: &'a str,
    state: TripState,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create a user, deriving a unique username from the display name.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Backfill a user's home city. Identity fields are otherwise immutable.
  fn set_home_city<'a>(
    &'a self,
    user_id: i64,
    home_city: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Participants ──────────────────────────────────────────────────────

  /// Idempotently join `user_id` to a trip. A second join with a different
  /// role leaves the existing row untouched.
  fn upsert_participant<'a>(
    &'a self,
    trip_id: &'a str,
    user_id: i64,
    role: ParticipantRole,
  ) -> impl Future<Output = Result<Participant, Self::Error>> + Send + 'a;

  /// All participants of a trip, each with its `user` populated.
  fn list_participants<'a>(
    &'a self,
    trip_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Participant>, Self::Error>> + Send + 'a;

  fn set_online<'a>(
    &'a self,
    trip_id: &'a str,
    user_id: i64,
    online: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn mark_preferences_submitted<'a>(
    &'a self,
    trip_id: &'a str,
    user_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn mark_availability_submitted<'a>(
    &'a self,
    trip_id: &'a str,
    user_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Feed ──────────────────────────────────────────────────────────────

  /// Append to the trip feed. The store assigns `id` and `timestamp`.
  fn append_message(
    &self,
    input: NewMessage,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  /// The full feed in insertion-timestamp order.
  fn list_messages<'a>(
    &'a self,
    trip_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Message>, Self::Error>> + Send + 'a;

  /// Hard-delete a message. Only ever used for pending placeholders.
  fn delete_message(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Does a message with the given payload discriminator exist for this
  /// trip? The idempotency check behind at-most-once prompting.
  fn has_payload_message<'a>(
    &'a self,
    trip_id: &'a str,
    payload_kind: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// The most recent message carrying the given payload discriminator —
  /// e.g. the active `trip_options` menu.
  fn latest_payload_message<'a>(
    &'a self,
    trip_id: &'a str,
    payload_kind: &'a str,
  ) -> impl Future<Output = Result<Option<Message>, Self::Error>> + Send + 'a;

  /// Replace a message's payload in place. Only used to flip a prompt's
  /// `triggered` flag.
  fn update_message_payload(
    &self,
    id: i64,
    payload: MessagePayload,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + '_;

  /// Atomically: append `final_message`, advance the trip to `state`, and
  /// delete the pending placeholder (when given). A generation either lands
  /// completely or not at all; the placeholder is never deleted without the
  /// result committing alongside it.
  fn finalize_generation<'a>(
    &'a self,
    trip_id: &'a str,
    final_message: NewMessage,
    state: TripState,
    pending_id: Option<i64>,
  ) -> impl Future<Output = Result<Message, Self::Error>> + Send + 'a;

  // ── Availability ──────────────────────────────────────────────────────

  /// Upsert one `(trip, user, date)` mark.
  fn upsert_availability(
    &self,
    mark: Availability,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Upsert a batch of marks for one user in one round trip.
  fn upsert_availability_batch<'a>(
    &'a self,
    trip_id: &'a str,
    user_id: i64,
    dates: Vec<(NaiveDate, bool)>,
  ) -> impl Future<Output = Result<Vec<Availability>, Self::Error>> + Send + 'a;

  fn list_availability<'a>(
    &'a self,
    trip_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Availability>, Self::Error>> + Send + 'a;

  // ── Votes ─────────────────────────────────────────────────────────────

  /// Toggle a `(user, option, reaction)` vote: remove it if present,
  /// create it otherwise.
  fn toggle_vote<'a>(
    &'a self,
    trip_id: &'a str,
    user_id: i64,
    option_id: &'a str,
    reaction: &'a str,
  ) -> impl Future<Output = Result<(VoteAction, Vote), Self::Error>> + Send + 'a;

  fn list_votes<'a>(
    &'a self,
    trip_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Vote>, Self::Error>> + Send + 'a;

  // ── Preferences ───────────────────────────────────────────────────────

  /// Merge structured fields (non-`None` only) into the `(user, trip)`
  /// preferences row, creating it on first write, and append `raw_message`
  /// to the retained raw list when given.
  fn apply_preferences<'a>(
    &'a self,
    trip_id: &'a str,
    user_id: i64,
    update: PreferencesUpdate,
    raw_message: Option<String>,
  ) -> impl Future<Output = Result<Preferences, Self::Error>> + Send + 'a;

  fn get_preferences<'a>(
    &'a self,
    trip_id: &'a str,
    user_id: i64,
  ) -> impl Future<Output = Result<Option<Preferences>, Self::Error>> + Send + 'a;

  fn list_preferences<'a>(
    &'a self,
    trip_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Preferences>, Self::Error>> + Send + 'a;

  // ── Administrative reset ──────────────────────────────────────────────

  /// Wipe the trip's availability, votes, messages, and preferences, reset
  /// participant submission flags, force the state back to
  /// `COLLECTING_DATES`, and seed `welcome` as the fresh transcript. All in
  /// one transaction.
  fn reset_trip<'a>(
    &'a self,
    trip_id: &'a str,
    welcome: Vec<NewMessage>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
