//! The illustrative-image boundary.
//!
//! Option cards get a generated travel photo. Failure here must never fail
//! option assembly; the pipeline substitutes a deterministic placeholder.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::error::{Result, ServiceError};

#[async_trait]
pub trait ImageService: Send + Sync {
  /// Generate an image for the prompt and return a URL (or data URL).
  async fn illustrate(&self, prompt: &str) -> Result<String>;
}

/// getimg.ai text-to-image client returning base64 data URLs.
pub struct GetImgClient {
  http:     Client,
  base_url: String,
  api_key:  String,
}

impl GetImgClient {
  pub fn new(
    base_url: impl Into<String>,
    api_key: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self> {
    let http = Client::builder().timeout(timeout).build()?;
    Ok(Self { http, base_url: base_url.into(), api_key: api_key.into() })
  }
}

#[async_trait]
impl ImageService for GetImgClient {
  async fn illustrate(&self, prompt: &str) -> Result<String> {
    let payload = json!({
      "prompt": prompt,
      "height": 512,
      "width": 1024,
      "steps": 4,
      "output_format": "jpeg",
      "response_format": "b64",
    });

    let response = self
      .http
      .post(format!("{}/v1/flux-schnell/text-to-image", self.base_url))
      .bearer_auth(&self.api_key)
      .json(&payload)
      .send()
      .await?;

    if !response.status().is_success() {
      let status = response.status().as_u16();
      let body = response.text().await.unwrap_or_default();
      return Err(ServiceError::Status { status, body });
    }

    let reply: serde_json::Value = response.json().await?;
    let b64 = reply["image"]
      .as_str()
      .ok_or_else(|| ServiceError::InvalidResponse("missing image field".into()))?;
    Ok(format!("data:image/jpeg;base64,{b64}"))
  }
}
