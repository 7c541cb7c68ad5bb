//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use packtrip_core::{
  model::{
    Availability, MessageKind, NewMessage, NewTrip, NewUser, ParticipantRole, PreferencesUpdate,
    TripState, VoteAction,
  },
  payload::MessagePayload,
  store::TripStore,
};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

fn date(s: &str) -> NaiveDate {
  s.parse().unwrap()
}

fn new_trip(trip_id: &str) -> NewTrip {
  NewTrip {
    trip_id:     trip_id.to_owned(),
    title:       "Barcelona Trip Planning".to_owned(),
    destination: Some("Barcelona".to_owned()),
    start_date:  None,
    end_date:    None,
    budget:      Some(3600),
  }
}

fn new_user(name: &str) -> NewUser {
  NewUser { display_name: name.to_owned(), home_city: None, color: None }
}

/// The availability, vote, and preferences tables all reference `users`,
/// so rows need a real user behind them.
async fn seed_user(s: &SqliteStore, name: &str) -> i64 {
  s.create_user(new_user(name)).await.unwrap().id
}

// ─── Trips ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_trip() {
  let s = store().await;

  let trip = s.create_trip(new_trip("t1")).await.unwrap();
  assert_eq!(trip.state, TripState::CollectingDates);
  assert!(!trip.invite_token.is_empty());

  let fetched = s.get_trip("t1").await.unwrap().unwrap();
  assert_eq!(fetched.trip_id, "t1");
  assert_eq!(fetched.destination.as_deref(), Some("Barcelona"));
  assert_eq!(fetched.invite_token, trip.invite_token);
}

#[tokio::test]
async fn get_trip_missing_returns_none() {
  let s = store().await;
  assert!(s.get_trip("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_trip_id_is_rejected() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  assert!(matches!(
    s.create_trip(new_trip("t1")).await,
    Err(Error::TripIdTaken(id)) if id == "t1"
  ));
}

#[tokio::test]
async fn invite_token_resolves_its_trip() {
  let s = store().await;
  let trip = s.create_trip(new_trip("t1")).await.unwrap();
  s.create_trip(new_trip("t2")).await.unwrap();

  let resolved = s.get_trip_by_invite_token(&trip.invite_token).await.unwrap().unwrap();
  assert_eq!(resolved.trip_id, "t1");
  assert!(s.get_trip_by_invite_token("bogus").await.unwrap().is_none());
}

#[tokio::test]
async fn state_transitions_are_forward_only() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();

  s.set_trip_state("t1", TripState::VotingHighLevel).await.unwrap();
  s.set_trip_state("t1", TripState::DetailedPlanReady).await.unwrap();
  // Re-asserting the current state is fine.
  s.set_trip_state("t1", TripState::DetailedPlanReady).await.unwrap();

  let err = s.set_trip_state("t1", TripState::CollectingDates).await.unwrap_err();
  assert!(matches!(err, Error::BackwardTransition { .. }));
  let trip = s.get_trip("t1").await.unwrap().unwrap();
  assert_eq!(trip.state, TripState::DetailedPlanReady);
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn usernames_are_slugged_and_deduplicated() {
  let s = store().await;

  let first = s.create_user(new_user("Alice Johnson")).await.unwrap();
  let second = s.create_user(new_user("Alice Johnson")).await.unwrap();
  let third = s.create_user(new_user("Alice Johnson")).await.unwrap();

  assert_eq!(first.username, "alice-johnson");
  assert_eq!(second.username, "alice-johnson-2");
  assert_eq!(third.username, "alice-johnson-3");
}

#[tokio::test]
async fn set_home_city_backfills() {
  let s = store().await;
  let user = s.create_user(new_user("Bob Smith")).await.unwrap();
  assert!(user.home_city.is_none());

  s.set_home_city(user.id, "Manchester").await.unwrap();
  let fetched = s.get_user(user.id).await.unwrap().unwrap();
  assert_eq!(fetched.home_city.as_deref(), Some("Manchester"));

  assert!(matches!(s.set_home_city(999, "Leeds").await, Err(Error::UserNotFound(999))));
}

// ─── Participants ────────────────────────────────────────────────────────────

#[tokio::test]
async fn join_is_idempotent_and_keeps_the_original_role() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  let user = s.create_user(new_user("Alice Johnson")).await.unwrap();

  let joined = s.upsert_participant("t1", user.id, ParticipantRole::Organizer).await.unwrap();
  assert_eq!(joined.role, ParticipantRole::Organizer);
  assert_eq!(joined.user.as_ref().unwrap().username, "alice-johnson");

  // A second join with a different role leaves the row untouched.
  let rejoined = s.upsert_participant("t1", user.id, ParticipantRole::Traveler).await.unwrap();
  assert_eq!(rejoined.role, ParticipantRole::Organizer);
  assert_eq!(s.list_participants("t1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn submission_flags_and_presence() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  let user = s.create_user(new_user("Bob Smith")).await.unwrap();
  s.upsert_participant("t1", user.id, ParticipantRole::Traveler).await.unwrap();

  s.set_online("t1", user.id, true).await.unwrap();
  s.mark_preferences_submitted("t1", user.id).await.unwrap();
  s.mark_availability_submitted("t1", user.id).await.unwrap();

  let p = &s.list_participants("t1").await.unwrap()[0];
  assert!(p.is_online);
  assert!(p.has_submitted_preferences);
  assert!(p.has_submitted_availability);

  s.set_online("t1", user.id, false).await.unwrap();
  assert!(!s.list_participants("t1").await.unwrap()[0].is_online);
}

// ─── Feed ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn messages_round_trip_with_payloads() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();

  let payload = MessagePayload::GenerateOptionsPrompt {
    consensus_dates: vec![date("2026-10-01"), date("2026-10-02"), date("2026-10-04")],
    triggered:       false,
  };
  let posted = s
    .append_message(NewMessage::agent("t1", "Ready to generate?", Some(payload.clone())))
    .await
    .unwrap();
  assert_eq!(posted.kind, MessageKind::Agent);
  assert_eq!(posted.metadata, Some(payload));

  let messages = s.list_messages("t1").await.unwrap();
  assert_eq!(messages.len(), 1);
  assert_eq!(messages[0].id, posted.id);
}

#[tokio::test]
async fn feed_is_in_insertion_order() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();

  for i in 0..5 {
    s.append_message(NewMessage::system("t1", format!("m{i}"))).await.unwrap();
  }
  let contents: Vec<String> =
    s.list_messages("t1").await.unwrap().into_iter().map(|m| m.content).collect();
  assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);
}

#[tokio::test]
async fn payload_kind_queries_find_the_latest() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();

  assert!(!s.has_payload_message("t1", "status_pending").await.unwrap());

  s.append_message(NewMessage::agent(
    "t1",
    "working…",
    Some(MessagePayload::StatusPending { status: "generating_options".to_owned() }),
  ))
  .await
  .unwrap();
  let second = s
    .append_message(NewMessage::agent(
      "t1",
      "still working…",
      Some(MessagePayload::StatusPending { status: "generating_detailed_plan".to_owned() }),
    ))
    .await
    .unwrap();

  assert!(s.has_payload_message("t1", "status_pending").await.unwrap());
  let latest = s.latest_payload_message("t1", "status_pending").await.unwrap().unwrap();
  assert_eq!(latest.id, second.id);
  assert!(s.latest_payload_message("t1", "trip_options").await.unwrap().is_none());
}

#[tokio::test]
async fn payload_kinds_are_scoped_per_trip() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  s.create_trip(new_trip("t2")).await.unwrap();

  s.append_message(NewMessage::agent(
    "t1",
    "menu",
    Some(MessagePayload::TripOptions { options: vec![], consensus_dates: vec![] }),
  ))
  .await
  .unwrap();

  assert!(s.has_payload_message("t1", "trip_options").await.unwrap());
  assert!(!s.has_payload_message("t2", "trip_options").await.unwrap());
}

#[tokio::test]
async fn update_message_payload_flips_triggered_in_place() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();

  let posted = s
    .append_message(NewMessage::agent(
      "t1",
      "Ready?",
      Some(MessagePayload::DetailedPlanPrompt {
        option_id: "option_1".to_owned(),
        triggered: false,
      }),
    ))
    .await
    .unwrap();

  let mut payload = posted.metadata.clone().unwrap();
  payload.mark_triggered();
  let updated = s.update_message_payload(posted.id, payload).await.unwrap();

  assert_eq!(updated.id, posted.id);
  assert_eq!(updated.content, "Ready?");
  assert!(matches!(
    updated.metadata,
    Some(MessagePayload::DetailedPlanPrompt { triggered: true, .. })
  ));

  let err = s
    .update_message_payload(
      9999,
      MessagePayload::StatusPending { status: "x".to_owned() },
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MessageNotFound(9999)));
}

#[tokio::test]
async fn finalize_generation_commits_atomically() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();

  let pending = s
    .append_message(NewMessage::agent(
      "t1",
      "working…",
      Some(MessagePayload::StatusPending { status: "generating_options".to_owned() }),
    ))
    .await
    .unwrap();

  let final_message = NewMessage::agent(
    "t1",
    "here you go",
    Some(MessagePayload::TripOptions { options: vec![], consensus_dates: vec![] }),
  );
  let posted = s
    .finalize_generation("t1", final_message, TripState::VotingHighLevel, Some(pending.id))
    .await
    .unwrap();

  let messages = s.list_messages("t1").await.unwrap();
  assert_eq!(messages.len(), 1);
  assert_eq!(messages[0].id, posted.id);
  let trip = s.get_trip("t1").await.unwrap().unwrap();
  assert_eq!(trip.state, TripState::VotingHighLevel);
}

#[tokio::test]
async fn finalize_generation_refuses_backward_state() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  s.set_trip_state("t1", TripState::DetailedPlanReady).await.unwrap();

  let pending = s
    .append_message(NewMessage::agent(
      "t1",
      "working…",
      Some(MessagePayload::StatusPending { status: "generating_options".to_owned() }),
    ))
    .await
    .unwrap();

  let err = s
    .finalize_generation(
      "t1",
      NewMessage::agent("t1", "late", None),
      TripState::VotingHighLevel,
      Some(pending.id),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BackwardTransition { .. }));

  // Nothing committed: the pending placeholder survives, the late message
  // never landed.
  let messages = s.list_messages("t1").await.unwrap();
  assert_eq!(messages.len(), 1);
  assert_eq!(messages[0].id, pending.id);
}

// ─── Availability ────────────────────────────────────────────────────────────

#[tokio::test]
async fn availability_resubmission_overwrites() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  let user = seed_user(&s, "Alice Johnson").await;

  let mark = Availability {
    trip_id:   "t1".to_owned(),
    user_id:   user,
    date:      date("2026-10-01"),
    available: true,
  };
  s.upsert_availability(mark.clone()).await.unwrap();
  s.upsert_availability(Availability { available: false, ..mark }).await.unwrap();

  let marks = s.list_availability("t1").await.unwrap();
  assert_eq!(marks.len(), 1);
  assert!(!marks[0].available);
}

#[tokio::test]
async fn availability_batch_upserts_all_dates() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  let user = seed_user(&s, "Alice Johnson").await;

  let marks = s
    .upsert_availability_batch("t1", user, vec![
      (date("2026-10-01"), true),
      (date("2026-10-02"), true),
      (date("2026-10-03"), false),
    ])
    .await
    .unwrap();
  assert_eq!(marks.len(), 3);

  // Re-batching flips in place, never duplicates.
  s.upsert_availability_batch("t1", user, vec![(date("2026-10-03"), true)]).await.unwrap();
  let stored = s.list_availability("t1").await.unwrap();
  assert_eq!(stored.len(), 3);
  assert!(stored.iter().all(|m| m.available));
}

// ─── Votes ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn vote_toggle_adds_then_removes() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  let user = seed_user(&s, "Alice Johnson").await;

  let (action, vote) = s.toggle_vote("t1", user, "option_1", "agree").await.unwrap();
  assert_eq!(action, VoteAction::Added);
  assert_eq!(vote.option_id, "option_1");
  assert_eq!(s.list_votes("t1").await.unwrap().len(), 1);

  let (action, _) = s.toggle_vote("t1", user, "option_1", "agree").await.unwrap();
  assert_eq!(action, VoteAction::Removed);
  assert!(s.list_votes("t1").await.unwrap().is_empty());

  let (action, _) = s.toggle_vote("t1", user, "option_1", "agree").await.unwrap();
  assert_eq!(action, VoteAction::Added);
}

#[tokio::test]
async fn vote_toggle_keys_on_the_full_tuple() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  let user = seed_user(&s, "Alice Johnson").await;

  s.toggle_vote("t1", user, "option_1", "agree").await.unwrap();
  // Different reaction and different option are independent rows.
  s.toggle_vote("t1", user, "option_1", "love").await.unwrap();
  s.toggle_vote("t1", user, "option_2", "agree").await.unwrap();

  assert_eq!(s.list_votes("t1").await.unwrap().len(), 3);
}

// ─── Preferences ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn preferences_merge_and_append_raw_text() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  let user = seed_user(&s, "Alice Johnson").await;

  let first = s
    .apply_preferences(
      "t1",
      user,
      PreferencesUpdate {
        travel_style: Some("cultural".to_owned()),
        ..PreferencesUpdate::default()
      },
      Some("I love museums".to_owned()),
    )
    .await
    .unwrap();
  assert_eq!(first.travel_style.as_deref(), Some("cultural"));
  assert_eq!(first.raw_preferences, vec!["I love museums"]);

  // Second write: new field merges in, untouched field survives, raw
  // text appends.
  let second = s
    .apply_preferences(
      "t1",
      user,
      PreferencesUpdate {
        dietary_restrictions: Some("vegetarian".to_owned()),
        ..PreferencesUpdate::default()
      },
      Some("no meat please".to_owned()),
    )
    .await
    .unwrap();
  assert_eq!(second.travel_style.as_deref(), Some("cultural"));
  assert_eq!(second.dietary_restrictions.as_deref(), Some("vegetarian"));
  assert_eq!(second.raw_preferences, vec!["I love museums", "no meat please"]);

  let stored = s.get_preferences("t1", user).await.unwrap().unwrap();
  assert_eq!(stored.raw_preferences.len(), 2);
}

#[tokio::test]
async fn empty_update_still_retains_raw_text() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  let user = seed_user(&s, "Alice Johnson").await;

  let prefs = s
    .apply_preferences(
      "t1",
      user,
      PreferencesUpdate::default(),
      Some("something nice to eat".to_owned()),
    )
    .await
    .unwrap();
  assert!(prefs.travel_style.is_none());
  assert_eq!(prefs.raw_preferences, vec!["something nice to eat"]);
}

#[tokio::test]
async fn preferences_are_scoped_per_trip() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  s.create_trip(new_trip("t2")).await.unwrap();
  let user = seed_user(&s, "Alice Johnson").await;

  // The same user planning two trips keeps two independent rows.
  s.apply_preferences("t1", user, PreferencesUpdate::default(), Some("beach".to_owned()))
    .await
    .unwrap();
  s.apply_preferences("t2", user, PreferencesUpdate::default(), Some("mountains".to_owned()))
    .await
    .unwrap();

  let first = s.get_preferences("t1", user).await.unwrap().unwrap();
  let second = s.get_preferences("t2", user).await.unwrap().unwrap();
  assert_eq!(first.raw_preferences, vec!["beach"]);
  assert_eq!(second.raw_preferences, vec!["mountains"]);
}

// ─── Administrative reset ────────────────────────────────────────────────────

#[tokio::test]
async fn reset_wipes_and_reseeds_one_trip_only() {
  let s = store().await;
  s.create_trip(new_trip("t1")).await.unwrap();
  s.create_trip(new_trip("t2")).await.unwrap();
  let user = s.create_user(new_user("Alice Johnson")).await.unwrap();
  s.upsert_participant("t1", user.id, ParticipantRole::Organizer).await.unwrap();
  s.mark_availability_submitted("t1", user.id).await.unwrap();

  s.set_trip_state("t1", TripState::VotingHighLevel).await.unwrap();
  s.upsert_availability(Availability {
    trip_id:   "t1".to_owned(),
    user_id:   user.id,
    date:      date("2026-10-01"),
    available: true,
  })
  .await
  .unwrap();
  s.toggle_vote("t1", user.id, "option_1", "agree").await.unwrap();
  s.apply_preferences("t1", user.id, PreferencesUpdate::default(), Some("tapas".to_owned()))
    .await
    .unwrap();
  s.append_message(NewMessage::system("t1", "old transcript")).await.unwrap();
  s.append_message(NewMessage::system("t2", "untouched")).await.unwrap();

  s.reset_trip("t1", vec![
    NewMessage::system("t1", "Welcome back!"),
    NewMessage::agent("t1", "Mark your dates below.", None),
  ])
  .await
  .unwrap();

  let trip = s.get_trip("t1").await.unwrap().unwrap();
  assert_eq!(trip.state, TripState::CollectingDates);
  assert!(s.list_availability("t1").await.unwrap().is_empty());
  assert!(s.list_votes("t1").await.unwrap().is_empty());
  assert!(s.list_preferences("t1").await.unwrap().is_empty());
  assert!(!s.list_participants("t1").await.unwrap()[0].has_submitted_availability);

  let messages = s.list_messages("t1").await.unwrap();
  assert_eq!(messages.len(), 2);
  assert_eq!(messages[0].content, "Welcome back!");

  // The neighbouring trip is untouched.
  assert_eq!(s.list_messages("t2").await.unwrap().len(), 1);
}
