//! Chat ingestion and preference extraction.
//!
//! Every inbound user message is stored and broadcast verbatim first, then
//! classified. Classification failures never surface to the sender; the
//! message is already in the feed and the analysis quietly degrades.

use packtrip_core::{
  event::ServerEvent,
  model::{Message, MessageKind, NewMessage},
  payload::MessagePayload,
  store::TripStore,
};
use packtrip_services::types::{IntentAnalysis, IntentKind};
use tracing::{debug, warn};

use crate::{Engine, Error, Result};

impl<S: TripStore> Engine<S> {
  /// Store, broadcast, and analyze one inbound chat message.
  ///
  /// Calendar intent yields an agent nudge toward the shared calendar. Any
  /// preference signal, structured or merely detected, appends the raw text
  /// to the author's preferences; raw text is the durable input to the
  /// generation pipelines even when structured extraction found nothing.
  pub async fn ingest_user_message(
    &self,
    trip_id: &str,
    user_id: i64,
    content: &str,
  ) -> Result<Message> {
    let trip = self.require_trip(trip_id).await?;

    let stored = self
      .store
      .append_message(NewMessage {
        trip_id:  trip_id.to_owned(),
        user_id:  Some(user_id),
        kind:     MessageKind::User,
        content:  content.to_owned(),
        metadata: None,
      })
      .await
      .map_err(Error::store)?;
    self
      .hub
      .publish(trip_id, &ServerEvent::NewMessage { message: stored.clone() }, None)
      .await;

    let analysis = match self.services.classifier.analyze_intent(content).await {
      Ok(analysis) => analysis,
      Err(e) => {
        warn!(trip_id, error = %e, "intent classification failed, treating as general");
        IntentAnalysis::general()
      }
    };

    if analysis.intent == IntentKind::Calendar {
      self.post_calendar_nudge(trip_id, content, &trip.destination, &analysis).await?;
    }

    self.capture_preferences(trip_id, user_id, content).await?;
    Ok(stored)
  }

  async fn post_calendar_nudge(
    &self,
    trip_id: &str,
    content: &str,
    destination: &Option<String>,
    analysis: &IntentAnalysis,
  ) -> Result<()> {
    let participants = self.store.list_participants(trip_id).await.map_err(Error::store)?;
    let reply = match self
      .services
      .classifier
      .calendar_reply(content, destination.as_deref(), participants.len())
      .await
    {
      Ok(reply) => reply,
      Err(e) => {
        warn!(trip_id, error = %e, "calendar reply generation failed, skipping nudge");
        return Ok(());
      }
    };

    let nudge = NewMessage::agent(
      trip_id,
      reply,
      Some(MessagePayload::CalendarSuggestion {
        month: analysis.extracted_month,
        year:  analysis.extracted_year,
      }),
    );
    let message = self.store.append_message(nudge).await.map_err(Error::store)?;
    self.hub.publish(trip_id, &ServerEvent::NewMessage { message }, None).await;
    Ok(())
  }

  async fn capture_preferences(
    &self,
    trip_id: &str,
    user_id: i64,
    content: &str,
  ) -> Result<()> {
    let structured = match self.services.classifier.extract_preferences(content).await {
      Ok(update) => update,
      Err(e) => {
        warn!(trip_id, error = %e, "preference extraction failed");
        None
      }
    };
    let detected = if structured.is_some() {
      true
    } else {
      match self.services.classifier.has_preference_content(content).await {
        Ok(detected) => detected,
        Err(e) => {
          warn!(trip_id, error = %e, "preference detection failed");
          false
        }
      }
    };
    if !detected {
      return Ok(());
    }

    debug!(trip_id, user_id, structured = structured.is_some(), "preference signal captured");
    self
      .store
      .apply_preferences(trip_id, user_id, structured.unwrap_or_default(), Some(content.to_owned()))
      .await
      .map_err(Error::store)?;
    self
      .store
      .mark_preferences_submitted(trip_id, user_id)
      .await
      .map_err(Error::store)?;
    self.hub.publish(trip_id, &ServerEvent::PreferencesUpdate { user_id }, None).await;
    Ok(())
  }
}
