//! Demo data seeding.
//!
//! Creates the Barcelona demo trip with three participants and an opening
//! transcript, so a fresh install has something to click on. Skipped when
//! the trip already exists.

use packtrip_core::{
  model::{MessageKind, NewMessage, NewTrip, NewUser, ParticipantRole},
  store::TripStore,
};
use tracing::info;

pub const DEMO_TRIP_ID: &str = "BCN-2026-001";

pub async fn seed_demo<S: TripStore>(store: &S) -> Result<(), S::Error> {
  if store.get_trip(DEMO_TRIP_ID).await?.is_some() {
    return Ok(());
  }

  store
    .create_trip(NewTrip {
      trip_id:     DEMO_TRIP_ID.to_owned(),
      title:       "Barcelona Trip Planning".to_owned(),
      destination: Some("Barcelona".to_owned()),
      start_date:  None,
      end_date:    None,
      budget:      Some(3600),
    })
    .await?;

  let roster = [
    ("Alice Johnson", "#3B82F6", ParticipantRole::Organizer),
    ("Bob Smith", "#10B981", ParticipantRole::Traveler),
    ("Carol Williams", "#8B5CF6", ParticipantRole::Traveler),
  ];
  let mut user_ids = Vec::new();
  for (name, color, role) in roster {
    let user = store
      .create_user(NewUser {
        display_name: name.to_owned(),
        home_city:    None,
        color:        Some(color.to_owned()),
      })
      .await?;
    store.upsert_participant(DEMO_TRIP_ID, user.id, role).await?;
    user_ids.push(user.id);
  }

  let transcript = [
    (
      None,
      MessageKind::System,
      "Welcome to PackTrip AI! I'm your travel concierge. I'll help you plan \
       the perfect Barcelona trip with your friends.",
    ),
    (
      Some(user_ids[0]),
      MessageKind::User,
      "Hey everyone! I'm thinking Barcelona in October, budget around €1200. \
       What do you think? 🌟",
    ),
    (
      Some(user_ids[1]),
      MessageKind::User,
      "Perfect! October works for me. I'm flexible on dates but prefer \
       mid-month. Budget looks good too! 👍",
    ),
    (
      None,
      MessageKind::Agent,
      "Excellent! Barcelona in October is a fantastic choice. Now let's \
       coordinate your dates - I need everyone to mark their availability on \
       the calendar below. Click on the dates you're available to travel!",
    ),
  ];
  for (user_id, kind, content) in transcript {
    store
      .append_message(NewMessage {
        trip_id: DEMO_TRIP_ID.to_owned(),
        user_id,
        kind,
        content: content.to_owned(),
        metadata: None,
      })
      .await?;
  }

  info!(trip_id = DEMO_TRIP_ID, "demo trip seeded");
  Ok(())
}
