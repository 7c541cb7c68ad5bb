//! The consensus-driven coordination core.
//!
//! [`Engine`] owns the broadcast hub, the per-trip lock registry, and the
//! handles to the external services, and implements everything between a
//! store mutation and the resulting fan-out: the availability and voting
//! consensus engines, the generation pipelines, chat ingestion, and the
//! administrative reset.
//!
//! Every "check the feed, then insert" sequence runs under the trip's lock;
//! that serialisation is what makes prompting and generation at-most-once
//! under concurrent triggers.

pub mod availability;
pub mod error;
pub mod hub;
pub mod ingest;
pub mod locks;
pub mod pipeline;
pub mod reset;
pub mod voting;


use std::sync::Arc;

use packtrip_core::{model::Trip, store::TripStore};
use packtrip_services::{
  classifier::ClassifierService, image::ImageService, itinerary::ItineraryService,
  travel::TravelSearchService,
};

pub use error::{Error, Result};
pub use hub::{ConnId, Hub};
pub use locks::TripLocks;

/// Handles to the external collaborators, injectable as trait objects so
/// tests can substitute stubs.
#[derive(Clone)]
pub struct Services {
  pub classifier: Arc<dyn ClassifierService>,
  pub itinerary:  Arc<dyn ItineraryService>,
  pub image:      Arc<dyn ImageService>,
  pub travel:     Arc<dyn TravelSearchService>,
}

/// Engine-level tunables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Used for the hotels/flights lookup when no participant has a home
  /// city on record.
  pub default_departure_city: String,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { default_departure_city: "London".to_owned() }
  }
}

/// The coordination core, generic over the storage backend.
pub struct Engine<S> {
  store:    Arc<S>,
  hub:      Hub,
  locks:    TripLocks,
  services: Services,
  config:   EngineConfig,
}

impl<S: TripStore> Engine<S> {
  pub fn new(store: Arc<S>, hub: Hub, services: Services, config: EngineConfig) -> Self {
    Self { store, hub, locks: TripLocks::default(), services, config }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn hub(&self) -> &Hub { &self.hub }

  /// Resolve a trip or reject the mutation up front, so unknown trip ids
  /// surface as [`Error::TripNotFound`] rather than a storage failure.
  pub(crate) async fn require_trip(&self, trip_id: &str) -> Result<Trip> {
    self
      .store
      .get_trip(trip_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::TripNotFound(trip_id.to_owned()))
  }
}
