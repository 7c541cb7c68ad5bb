//! The availability consensus engine.
//!
//! Watches per-user per-date marks accumulate and decides when the group
//! has agreed on enough dates to move to option generation. The automatic
//! path prompts the group at most once; the forced path generates
//! immediately and bypasses every threshold.

use chrono::NaiveDate;
use packtrip_core::{
  consensus::{MIN_CONSENSUS_DATES, MIN_RESPONDENTS, consensus_dates, respondent_count},
  event::ServerEvent,
  model::{Availability, NewMessage},
  payload::MessagePayload,
  store::TripStore,
};
use tracing::{debug, info};

use crate::{Engine, Error, Result};

impl<S: TripStore> Engine<S> {
  /// Record one availability mark, keep the participant's submission flag
  /// consistent, broadcast the change, and re-run consensus detection.
  pub async fn submit_availability(
    &self,
    trip_id: &str,
    user_id: i64,
    date: NaiveDate,
    available: bool,
  ) -> Result<Availability> {
    self.require_trip(trip_id).await?;

    let mark = Availability { trip_id: trip_id.to_owned(), user_id, date, available };
    self.store.upsert_availability(mark.clone()).await.map_err(Error::store)?;
    self
      .store
      .mark_availability_submitted(trip_id, user_id)
      .await
      .map_err(Error::store)?;

    self
      .hub
      .publish(trip_id, &ServerEvent::AvailabilityUpdate { availability: mark.clone() }, None)
      .await;

    self.on_availability_changed(trip_id).await?;
    Ok(mark)
  }

  /// Batch variant of [`Engine::submit_availability`]: one store round trip,
  /// one broadcast, one consensus check.
  pub async fn submit_availability_batch(
    &self,
    trip_id: &str,
    user_id: i64,
    dates: Vec<(NaiveDate, bool)>,
  ) -> Result<Vec<Availability>> {
    self.require_trip(trip_id).await?;

    // An empty batch carries no signal: the submission flag stays in step
    // with the presence of actual rows.
    if dates.is_empty() {
      return Ok(Vec::new());
    }

    let marks = self
      .store
      .upsert_availability_batch(trip_id, user_id, dates)
      .await
      .map_err(Error::store)?;
    self
      .store
      .mark_availability_submitted(trip_id, user_id)
      .await
      .map_err(Error::store)?;

    self
      .hub
      .publish(
        trip_id,
        &ServerEvent::AvailabilityBatchUpdate { user_id, dates: marks.clone() },
        None,
      )
      .await;

    self.on_availability_changed(trip_id).await?;
    Ok(marks)
  }

  /// Automatic consensus detection, run after every availability mutation.
  ///
  /// Suppressed below two distinct respondents or three consensus dates;
  /// otherwise issues at most one `generate_options_prompt` per trip. Never
  /// generates by itself.
  pub async fn on_availability_changed(&self, trip_id: &str) -> Result<()> {
    let _guard = self.locks.acquire(trip_id).await;

    let marks = self.store.list_availability(trip_id).await.map_err(Error::store)?;
    if respondent_count(&marks) < MIN_RESPONDENTS {
      return Ok(());
    }
    let dates = consensus_dates(&marks);
    if dates.len() < MIN_CONSENSUS_DATES {
      debug!(trip_id, consensus = dates.len(), "below consensus-date threshold");
      return Ok(());
    }

    // At most one prompt per trip, and no prompt once options exist.
    let already_prompted = self
      .store
      .has_payload_message(trip_id, "generate_options_prompt")
      .await
      .map_err(Error::store)?;
    let already_generated =
      self.store.has_payload_message(trip_id, "trip_options").await.map_err(Error::store)?;
    if already_prompted || already_generated {
      return Ok(());
    }

    info!(trip_id, consensus = dates.len(), "date consensus reached, prompting group");
    let content = format!(
      "🗓️ Everyone who answered agrees on {} dates! Ready for me to put \
       together some itinerary options? Hit **Generate options** when you are.",
      dates.len()
    );
    let prompt = NewMessage::agent(
      trip_id,
      content,
      Some(MessagePayload::GenerateOptionsPrompt { consensus_dates: dates, triggered: false }),
    );
    let message = self.store.append_message(prompt).await.map_err(Error::store)?;
    self.hub.publish(trip_id, &ServerEvent::NewMessage { message }, None).await;
    Ok(())
  }

  /// The forced path: generate options now, with whatever consensus-date
  /// list exists, ignoring both the respondent floor and the date
  /// threshold. Idempotent once an option menu exists.
  pub async fn force_generate_options(&self, trip_id: &str) -> Result<()> {
    let guard = self.locks.acquire(trip_id).await;

    let trip = self.require_trip(trip_id).await?;
    let marks = self.store.list_availability(trip_id).await.map_err(Error::store)?;
    let dates = consensus_dates(&marks);
    info!(trip_id, consensus = dates.len(), "forced option generation");

    self.run_options_pipeline(&trip, &dates).await?;

    // A failed generation posts no menu; leave the call-to-action live so
    // the group can re-trigger.
    if self.store.has_payload_message(trip_id, "trip_options").await.map_err(Error::store)? {
      self.mark_prompt_triggered(trip_id, "generate_options_prompt").await?;
    }

    drop(guard);
    Ok(())
  }

  /// Flip the `triggered` flag on the most recent prompt of `kind`, if any,
  /// and broadcast the edit. The only in-place message mutation.
  pub(crate) async fn mark_prompt_triggered(
    &self,
    trip_id: &str,
    kind: &str,
  ) -> Result<()> {
    let Some(prompt) =
      self.store.latest_payload_message(trip_id, kind).await.map_err(Error::store)?
    else {
      return Ok(());
    };
    let Some(mut payload) = prompt.metadata else { return Ok(()) };
    payload.mark_triggered();
    let updated =
      self.store.update_message_payload(prompt.id, payload).await.map_err(Error::store)?;
    self.hub.publish(trip_id, &ServerEvent::UpdateMessage { message: updated }, None).await;
    Ok(())
  }
}
