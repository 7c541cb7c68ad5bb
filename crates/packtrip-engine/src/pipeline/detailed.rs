//! Detailed-plan generation, chaining into the hotels/flights lookup.

use packtrip_core::{
  event::ServerEvent,
  model::{MessageKind, NewMessage, Trip, TripState},
  payload::{DetailedItinerary, ItineraryOption, MessagePayload},
  store::TripStore,
};
use packtrip_services::types::{PlanRequest, TravelSearchRequest};
use tracing::{info, warn};

use crate::{Engine, Error, Result};

const PENDING_CONTENT: &str = "✨ Creating your detailed trip plan with \
specific venues and activities... This may take a moment!";

impl<S: TripStore> Engine<S> {
  /// Generate and post the detailed plan for the chosen option, then chain
  /// into the hotels/flights lookup. Caller holds the trip lock.
  ///
  /// Idempotent against an existing plan; a plan is never regenerated. On
  /// planner failure, aborts without flipping state, leaving the pending
  /// placeholder in the feed.
  pub(crate) async fn run_detailed_pipeline(
    &self,
    trip: &Trip,
    option: &ItineraryOption,
  ) -> Result<()> {
    let trip_id = trip.trip_id.as_str();
    if self.store.has_payload_message(trip_id, "detailed_plan").await.map_err(Error::store)? {
      return Ok(());
    }

    let pending = self
      .store
      .append_message(NewMessage::agent(
        trip_id,
        PENDING_CONTENT,
        Some(MessagePayload::StatusPending { status: "generating_detailed_plan".to_owned() }),
      ))
      .await
      .map_err(Error::store)?;
    self
      .hub
      .publish(trip_id, &ServerEvent::NewMessage { message: pending.clone() }, None)
      .await;

    let destination =
      trip.destination.clone().unwrap_or_else(|| "Barcelona".to_owned());
    let raw_preferences: Vec<String> = self
      .store
      .list_preferences(trip_id)
      .await
      .map_err(Error::store)?
      .into_iter()
      .flat_map(|p| p.raw_preferences)
      .collect();

    let request = PlanRequest {
      trip_id:        trip_id.to_owned(),
      destination:    destination.clone(),
      option_title:   option.title.clone(),
      option_summary: option.description.clone(),
      start_date:     option.plan.start_date,
      end_date:       option.plan.end_date,
      raw_preferences,
    };

    let itinerary = match self.services.itinerary.detailed_plan(&request).await {
      Ok(itinerary) => itinerary,
      Err(e) => {
        warn!(trip_id, error = %e, "detailed plan generation failed, aborting");
        return Ok(());
      }
    };

    let final_message = NewMessage {
      trip_id:  trip_id.to_owned(),
      user_id:  None,
      kind:     MessageKind::DetailedPlan,
      content:  plan_summary(&itinerary),
      metadata: Some(MessagePayload::DetailedPlan { itinerary }),
    };
    let posted = self
      .store
      .finalize_generation(trip_id, final_message, TripState::DetailedPlanReady, Some(pending.id))
      .await
      .map_err(Error::store)?;
    info!(trip_id, message = posted.id, "detailed plan posted");

    self
      .hub
      .publish(trip_id, &ServerEvent::MessageDeleted { message_id: pending.id }, None)
      .await;
    self.hub.publish(trip_id, &ServerEvent::NewMessage { message: posted }, None).await;

    self.run_travel_pipeline(trip, option, &destination).await
  }

  /// The hotels/flights lookup that closes out planning. A failed search
  /// leaves the trip in `DETAILED_PLAN_READY`; the detailed plan itself is
  /// already committed.
  async fn run_travel_pipeline(
    &self,
    trip: &Trip,
    option: &ItineraryOption,
    destination: &str,
  ) -> Result<()> {
    let trip_id = trip.trip_id.as_str();
    let participants = self.store.list_participants(trip_id).await.map_err(Error::store)?;
    let departure_city = participants
      .iter()
      .find_map(|p| p.user.as_ref().and_then(|u| u.home_city.clone()))
      .unwrap_or_else(|| self.config.default_departure_city.clone());

    let request = TravelSearchRequest {
      departure_city: departure_city.clone(),
      destination:    destination.to_owned(),
      start_date:     option.plan.start_date,
      end_date:       option.plan.end_date,
    };
    let result = match self.services.travel.search(&request).await {
      Ok(result) => result,
      Err(e) => {
        warn!(trip_id, error = %e, "hotels/flights search failed, stopping at detailed plan");
        return Ok(());
      }
    };

    let content = format!(
      "✈️🏨 Travel logistics sorted! Departing from {departure_city}, I found \
       {} flight routes and {} hotel options for your {destination} trip.",
      result.flights.len(),
      result.hotels.len(),
    );
    let final_message = NewMessage::agent(
      trip_id,
      content,
      Some(MessagePayload::HotelsFlightsPlan {
        departure_city,
        flights_found: result.flights.len(),
        hotels_found: result.hotels.len(),
      }),
    );
    let posted = self
      .store
      .finalize_generation(trip_id, final_message, TripState::HotelsFlightsReady, None)
      .await
      .map_err(Error::store)?;
    info!(trip_id, message = posted.id, "hotels/flights summary posted");

    self.hub.publish(trip_id, &ServerEvent::NewMessage { message: posted }, None).await;
    Ok(())
  }
}

fn plan_summary(itinerary: &DetailedItinerary) -> String {
  let lines: Vec<String> = itinerary
    .city_plans
    .iter()
    .map(|cp| format!("• {}: {} days", cp.city, cp.day_plans.len()))
    .collect();
  format!("🎉 **{}**\n\n{}", itinerary.name, lines.join("\n"))
}
