//! Minimal OpenAI chat-completions client.
//!
//! Used by the classifier and the option planner. Supports plain text
//! replies and JSON-mode replies decoded into a caller-supplied type.
//! Transient HTTP failures are retried with exponential backoff; business
//! rejections are not.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{MAX_RETRIES, Result, ServiceError, backoff_delay, is_retryable_status};

pub struct OpenAiClient {
  http:     Client,
  base_url: String,
  api_key:  String,
  model:    String,
}

impl OpenAiClient {
  pub fn new(
    base_url: impl Into<String>,
    api_key: impl Into<String>,
    model: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self> {
    let http = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      http,
      base_url: base_url.into(),
      api_key: api_key.into(),
      model: model.into(),
    })
  }

  /// A plain-text completion.
  pub async fn chat_text(
    &self,
    system: &str,
    user: &str,
    max_tokens: u32,
    temperature: f32,
  ) -> Result<String> {
    let body = json!({
      "model": self.model,
      "max_tokens": max_tokens,
      "temperature": temperature,
      "messages": [
        { "role": "system", "content": system },
        { "role": "user", "content": user },
      ],
    });
    self.complete(body).await
  }

  /// A JSON-mode completion decoded into `T`. The system prompt must
  /// describe the expected shape; JSON mode only guarantees syntax.
  pub async fn chat_json<T: DeserializeOwned>(
    &self,
    system: &str,
    user: &str,
    max_tokens: u32,
  ) -> Result<T> {
    let body = json!({
      "model": self.model,
      "max_tokens": max_tokens,
      "temperature": 0.1,
      "response_format": { "type": "json_object" },
      "messages": [
        { "role": "system", "content": system },
        { "role": "user", "content": user },
      ],
    });
    let content = self.complete(body).await?;
    serde_json::from_str(&content)
      .map_err(|e| ServiceError::InvalidResponse(format!("bad JSON payload: {e}")))
  }

  /// Run one chat completion, retrying transient failures, and return the
  /// first choice's message content.
  async fn complete(&self, body: serde_json::Value) -> Result<String> {
    let url = format!("{}/v1/chat/completions", self.base_url);

    let mut attempt = 0u32;
    let response = loop {
      let result = self
        .http
        .post(&url)
        .bearer_auth(&self.api_key)
        .json(&body)
        .send()
        .await;

      match result {
        Ok(resp) if resp.status().is_success() => break resp,
        Ok(resp) => {
          let status = resp.status().as_u16();
          let body_text = resp.text().await.unwrap_or_default();
          if is_retryable_status(status) && attempt < MAX_RETRIES {
            warn!(status, attempt, "transient completion failure, retrying");
            tokio::time::sleep(backoff_delay(attempt)).await;
            attempt += 1;
            continue;
          }
          return Err(ServiceError::Status { status, body: body_text });
        }
        Err(e) if (e.is_timeout() || e.is_connect()) && attempt < MAX_RETRIES => {
          warn!(error = %e, attempt, "completion request failed, retrying");
          tokio::time::sleep(backoff_delay(attempt)).await;
          attempt += 1;
        }
        Err(e) => return Err(ServiceError::Network(e)),
      }
    };

    let payload: serde_json::Value = response.json().await?;
    let content = payload["choices"][0]["message"]["content"]
      .as_str()
      .ok_or_else(|| ServiceError::InvalidResponse("missing message content".into()))?;
    debug!(len = content.len(), "completion received");
    Ok(content.to_owned())
  }
}
