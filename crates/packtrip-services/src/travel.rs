//! The hotels/flights lookup boundary.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{
  error::{Result, ServiceError},
  types::{TravelSearchRequest, TravelSearchResult},
};

#[async_trait]
pub trait TravelSearchService: Send + Sync {
  /// Find flight routes and hotel listings for a finalised itinerary.
  async fn search(&self, request: &TravelSearchRequest) -> Result<TravelSearchResult>;
}

/// Client for the external planner's travel-search endpoint.
pub struct HttpTravelSearch {
  http:     Client,
  base_url: String,
}

impl HttpTravelSearch {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
    let http = Client::builder().timeout(timeout).build()?;
    Ok(Self { http, base_url: base_url.into() })
  }
}

#[async_trait]
impl TravelSearchService for HttpTravelSearch {
  async fn search(&self, request: &TravelSearchRequest) -> Result<TravelSearchResult> {
    let response = self
      .http
      .post(format!("{}/find_hotels_flights", self.base_url))
      .json(request)
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status().as_u16();
      let body = response.text().await.unwrap_or_default();
      return Err(ServiceError::Status { status, body });
    }

    let result: TravelSearchResult = response.json().await?;
    debug!(
      flights = result.flights.len(),
      hotels = result.hotels.len(),
      "travel search complete"
    );
    Ok(result)
  }
}
