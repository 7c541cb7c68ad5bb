//! The voting consensus engine.
//!
//! Watches agree-reactions accumulate against the active option menu and
//! detects unanimous agreement. Unlike availability consensus, a winner
//! needs the full participant roster behind it, not just the people who
//! happened to vote.

use packtrip_core::{
  consensus::winning_option,
  event::ServerEvent,
  model::{NewMessage, Vote, VoteAction},
  payload::{ItineraryOption, MessagePayload},
  store::TripStore,
};
use tracing::{debug, info};

use crate::{Engine, Error, Result};

/// The active option menu, pulled out of the latest `trip_options` payload.
pub(crate) struct ActiveMenu {
  pub options: Vec<ItineraryOption>,
}

impl ActiveMenu {
  pub fn option_order(&self) -> Vec<String> {
    self.options.iter().map(|o| o.option_id.clone()).collect()
  }

  pub fn find(&self, option_id: &str) -> Option<&ItineraryOption> {
    self.options.iter().find(|o| o.option_id == option_id)
  }
}

impl<S: TripStore> Engine<S> {
  /// Toggle a vote, broadcast the change, and re-run winner detection.
  pub async fn submit_vote(
    &self,
    trip_id: &str,
    user_id: i64,
    option_id: &str,
    reaction: &str,
  ) -> Result<(VoteAction, Vote)> {
    self.require_trip(trip_id).await?;

    let (action, vote) = self
      .store
      .toggle_vote(trip_id, user_id, option_id, reaction)
      .await
      .map_err(Error::store)?;

    self
      .hub
      .publish(trip_id, &ServerEvent::VoteUpdate { vote: vote.clone(), action }, None)
      .await;

    self.on_vote_changed(trip_id).await?;
    Ok((action, vote))
  }

  /// Automatic winner detection, run after every vote mutation.
  ///
  /// No-ops without an active menu, participants, or votes. On a unanimous
  /// winner, issues at most one `detailed_plan_prompt` per trip and never
  /// regenerates an existing plan. Never generates by itself.
  pub async fn on_vote_changed(&self, trip_id: &str) -> Result<()> {
    let _guard = self.locks.acquire(trip_id).await;

    let Some(menu) = self.active_menu(trip_id).await? else {
      return Ok(());
    };
    let participants = self.store.list_participants(trip_id).await.map_err(Error::store)?;
    if participants.is_empty() {
      return Ok(());
    }
    let votes = self.store.list_votes(trip_id).await.map_err(Error::store)?;
    if votes.is_empty() {
      return Ok(());
    }

    let order = menu.option_order();
    let Some(winner) = winning_option(&order, &votes, participants.len()) else {
      debug!(trip_id, votes = votes.len(), "no unanimous winner yet");
      return Ok(());
    };

    // A plan already generated or a prompt already issued both end it here.
    if self.store.has_payload_message(trip_id, "detailed_plan").await.map_err(Error::store)? {
      return Ok(());
    }
    if self
      .store
      .has_payload_message(trip_id, "detailed_plan_prompt")
      .await
      .map_err(Error::store)?
    {
      return Ok(());
    }

    let title = menu.find(winner).map(|o| o.title.as_str()).unwrap_or(winner);
    info!(trip_id, winner, "vote unanimity reached, prompting group");
    let content = format!(
      "🏆 Everyone agrees on **{title}**! Want me to build out the full \
       day-by-day plan? Hit **Create detailed plan** when you're ready."
    );
    let prompt = NewMessage::agent(
      trip_id,
      content,
      Some(MessagePayload::DetailedPlanPrompt { option_id: winner.to_owned(), triggered: false }),
    );
    let message = self.store.append_message(prompt).await.map_err(Error::store)?;
    self.hub.publish(trip_id, &ServerEvent::NewMessage { message }, None).await;
    Ok(())
  }

  /// The forced path into detailed planning. With an explicit `option_id`
  /// the menu entry is used directly; without one there must already be a
  /// unanimous winner. Idempotent once a detailed plan exists.
  pub async fn force_generate_detailed_plan(
    &self,
    trip_id: &str,
    option_id: Option<&str>,
  ) -> Result<()> {
    let guard = self.locks.acquire(trip_id).await;

    let trip = self.require_trip(trip_id).await?;
    let menu = self
      .active_menu(trip_id)
      .await?
      .ok_or_else(|| Error::NoActiveOptions(trip_id.to_owned()))?;

    let chosen = match option_id {
      Some(id) => {
        menu.find(id).ok_or_else(|| Error::UnknownOption(id.to_owned()))?.clone()
      }
      None => {
        let participants =
          self.store.list_participants(trip_id).await.map_err(Error::store)?;
        let votes = self.store.list_votes(trip_id).await.map_err(Error::store)?;
        let order = menu.option_order();
        let winner =
          winning_option(&order, &votes, participants.len()).ok_or(Error::NoWinner)?;
        menu.find(winner).ok_or_else(|| Error::UnknownOption(winner.to_owned()))?.clone()
      }
    };

    info!(trip_id, option = %chosen.option_id, "forced detailed plan generation");
    self.run_detailed_pipeline(&trip, &chosen).await?;

    // Only consume the prompt once a plan actually landed.
    if self.store.has_payload_message(trip_id, "detailed_plan").await.map_err(Error::store)? {
      self.mark_prompt_triggered(trip_id, "detailed_plan_prompt").await?;
    }

    drop(guard);
    Ok(())
  }

  pub(crate) async fn active_menu(&self, trip_id: &str) -> Result<Option<ActiveMenu>> {
    let Some(message) = self
      .store
      .latest_payload_message(trip_id, "trip_options")
      .await
      .map_err(Error::store)?
    else {
      return Ok(None);
    };
    match message.metadata {
      Some(MessagePayload::TripOptions { options, .. }) => Ok(Some(ActiveMenu { options })),
      _ => Ok(None),
    }
  }
}
