//! Boundary clients for the external collaborators.
//!
//! Everything the coordinator treats as opaque lives behind a trait here:
//! the intent/preference classifier, the itinerary planner, the image
//! generator, and the hotels/flights lookup. The engine holds `Arc<dyn …>`
//! handles so tests can substitute stubs, and every HTTP implementation
//! carries a bounded timeout plus retry-with-backoff on transient statuses.

pub mod classifier;
pub mod error;
pub mod image;
pub mod itinerary;
pub mod openai;
pub mod travel;
pub mod types;

pub use classifier::{ClassifierService, OpenAiClassifier};
pub use error::{Result, ServiceError};
pub use image::{GetImgClient, ImageService};
pub use itinerary::{ItineraryService, PlannerClient};
pub use openai::OpenAiClient;
pub use travel::{HttpTravelSearch, TravelSearchService};
pub use types::{
  GroupedPreferences, IntentAnalysis, IntentKind, OptionsRequest, PlanRequest,
  TravelSearchRequest, TravelSearchResult,
};
