//! Itinerary-options generation.

use chrono::NaiveDate;
use packtrip_core::{
  event::ServerEvent,
  model::{NewMessage, Trip, TripState},
  payload::{ItineraryOption, MessagePayload, PreliminaryPlan},
  store::TripStore,
};
use packtrip_services::types::{GroupedPreferences, OptionsRequest};
use tracing::{info, warn};

use crate::{Engine, Error, Result};

const PENDING_CONTENT: &str = "🔍 Looking for the best trip options based on \
your preferences... This may take a moment!";

impl<S: TripStore> Engine<S> {
  /// Generate and post the option menu. Caller holds the trip lock.
  ///
  /// Idempotent against an existing menu. On planner failure or an empty
  /// plan list, aborts without flipping state, leaving the pending
  /// placeholder in the feed. The group sees no error message; recovery is
  /// a manual re-trigger.
  pub(crate) async fn run_options_pipeline(
    &self,
    trip: &Trip,
    consensus: &[NaiveDate],
  ) -> Result<()> {
    let trip_id = trip.trip_id.as_str();
    if self.store.has_payload_message(trip_id, "trip_options").await.map_err(Error::store)? {
      return Ok(());
    }

    let pending = self
      .store
      .append_message(NewMessage::agent(
        trip_id,
        PENDING_CONTENT,
        Some(MessagePayload::StatusPending { status: "generating_options".to_owned() }),
      ))
      .await
      .map_err(Error::store)?;
    self
      .hub
      .publish(trip_id, &ServerEvent::NewMessage { message: pending.clone() }, None)
      .await;

    let destination =
      trip.destination.clone().unwrap_or_else(|| "Barcelona".to_owned());
    let request = OptionsRequest {
      destination:         destination.clone(),
      budget:              trip.budget,
      consensus_dates:     consensus.to_vec(),
      grouped_preferences: self.grouped_preferences(trip_id).await?,
    };

    let plans = match self.services.itinerary.propose_options(&request).await {
      Ok(plans) if !plans.is_empty() => plans,
      Ok(_) => {
        warn!(trip_id, "planner returned zero options, aborting");
        return Ok(());
      }
      Err(e) => {
        warn!(trip_id, error = %e, "option generation failed, aborting");
        return Ok(());
      }
    };

    let mut options = Vec::with_capacity(plans.len());
    for (i, plan) in plans.into_iter().enumerate() {
      options.push(self.assemble_option(i, plan, &destination).await);
    }

    let content = format!(
      "🎉 **Consensus Reached!**\n\nGreat news! Everyone is available on {} \
       dates. Based on your group's preferences, I've generated {} \
       personalized itinerary options for your {} trip.\n\n✨ **Each option \
       addresses your specific interests and preferences!**\n\nVote for your \
       favorite option below!",
      consensus.len(),
      options.len(),
      destination,
    );
    let final_message = NewMessage::agent(
      trip_id,
      content,
      Some(MessagePayload::TripOptions { options, consensus_dates: consensus.to_vec() }),
    );

    let posted = self
      .store
      .finalize_generation(trip_id, final_message, TripState::VotingHighLevel, Some(pending.id))
      .await
      .map_err(Error::store)?;
    info!(trip_id, message = posted.id, "option menu posted");

    self
      .hub
      .publish(trip_id, &ServerEvent::MessageDeleted { message_id: pending.id }, None)
      .await;
    self.hub.publish(trip_id, &ServerEvent::NewMessage { message: posted }, None).await;
    self
      .hub
      .publish(
        trip_id,
        &ServerEvent::OptionsGenerated { state: TripState::VotingHighLevel },
        None,
      )
      .await;
    Ok(())
  }

  /// Raw preference text grouped per person, so the planner can reason
  /// about per-person conflicts instead of a flattened soup.
  async fn grouped_preferences(&self, trip_id: &str) -> Result<Vec<GroupedPreferences>> {
    let preferences = self.store.list_preferences(trip_id).await.map_err(Error::store)?;
    let participants = self.store.list_participants(trip_id).await.map_err(Error::store)?;

    Ok(
      preferences
        .into_iter()
        .map(|pref| {
          let user_name = participants
            .iter()
            .find(|p| p.user_id == pref.user_id)
            .and_then(|p| p.user.as_ref())
            .map(|u| u.display_name.clone())
            .unwrap_or_else(|| format!("User {}", pref.user_id));
          GroupedPreferences {
            user_id: pref.user_id,
            user_name,
            raw_preferences: pref.raw_preferences,
          }
        })
        .collect(),
    )
  }

  /// Turn one proposed plan into a display-ready option: stable ordinal id,
  /// derived price, highlights, and an illustrative image. Image failure
  /// degrades to a deterministic placeholder, never fails the option.
  async fn assemble_option(
    &self,
    index: usize,
    plan: PreliminaryPlan,
    destination: &str,
  ) -> ItineraryOption {
    let highlights: Vec<String> = plan
      .day_plans
      .iter()
      .take(3)
      .filter_map(|day| day.activities.first())
      .map(|a| a.name.clone())
      .collect();

    let costs: Vec<i64> = plan
      .day_plans
      .iter()
      .flat_map(|day| &day.activities)
      .filter_map(|a| a.cost)
      .collect();
    let price = if costs.is_empty() { None } else { Some(costs.iter().sum()) };

    let image_prompt = format!(
      "Beautiful travel photo that represents the '{}' itinerary in {destination}. \
       Key highlights: {}. Vibrant colors, wide angle, cinematic.",
      plan.name,
      highlights.join(", "),
    );
    let image = match self.services.image.illustrate(&image_prompt).await {
      Ok(url) => url,
      Err(e) => {
        warn!(option = index + 1, error = %e, "image generation failed, using placeholder");
        format!("https://images.unsplash.com/photo-{}?w=400&h=300&fit=crop", 1_500_000_000 + index)
      }
    };

    ItineraryOption {
      option_id: format!("option_{}", index + 1),
      title: plan.name.clone(),
      description: plan.summary.clone(),
      price,
      image: Some(image),
      highlights,
      plan,
    }
  }
}
