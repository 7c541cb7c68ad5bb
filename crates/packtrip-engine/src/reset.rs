//! The administrative reset.
//!
//! A demo/debug escape hatch, not a lifecycle transition: wipes the trip's
//! accumulated data, forces the state back to `COLLECTING_DATES`, and
//! reseeds a canonical welcome transcript. The caller must echo the trip id
//! back as confirmation.

use packtrip_core::{event::ServerEvent, model::NewMessage, store::TripStore};
use tracing::info;

use crate::{Engine, Error, Result};

impl<S: TripStore> Engine<S> {
  pub async fn reset_trip(&self, trip_id: &str, confirm: &str) -> Result<()> {
    if confirm != trip_id {
      return Err(Error::ResetNotConfirmed);
    }
    let _guard = self.locks.acquire(trip_id).await;

    let trip = self.require_trip(trip_id).await?;
    let welcome = welcome_transcript(trip_id, trip.destination.as_deref());
    self.store.reset_trip(trip_id, welcome).await.map_err(Error::store)?;
    info!(trip_id, "trip reset to date collection");

    self
      .hub
      .publish(trip_id, &ServerEvent::UserReset { trip_id: trip_id.to_owned() }, None)
      .await;
    Ok(())
  }
}

fn welcome_transcript(trip_id: &str, destination: Option<&str>) -> Vec<NewMessage> {
  let place = destination.unwrap_or("your destination");
  vec![
    NewMessage::system(
      trip_id,
      format!(
        "Welcome to PackTrip AI! I'm your travel concierge. I'll help you \
         plan the perfect {place} trip with your friends."
      ),
    ),
    NewMessage::agent(
      trip_id,
      format!(
        "Let's start by coordinating your dates - I need everyone to mark \
         their availability on the calendar below. Click on the dates you're \
         available to travel to {place}!"
      ),
      None,
    ),
  ]
}
