//! Outbound relance webhook.
//!
//! Delivery is fire-once: no retry, and a failure never fails the request that
//! triggered it.

use registrar_core::merge::FollowUpRecipient;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelancePayload {
  pub recipients: Vec<FollowUpRecipient>,
  pub note:       Option<String>,
}

/// Posts relance batches to the configured URL, if any.
#[derive(Debug, Clone)]
pub struct Notifier {
  client: reqwest::Client,
  url:    Option<String>,
}

impl Notifier {
  pub fn new(url: Option<String>) -> Self {
    Self { client: reqwest::Client::new(), url }
  }

  /// Returns whether the webhook accepted the batch.
  pub async fn send_relance(&self, payload: &RelancePayload) -> bool {
    let Some(url) = self.url.as_deref() else {
      tracing::info!(recipients = payload.recipients.len(), "no webhook_url configured; relance not sent");
      return false;
    };

    let result = self
      .client
      .post(url)
      .json(payload)
      .send()
      .await
      .and_then(reqwest::Response::error_for_status);

    match result {
      Ok(_) => {
        tracing::info!(recipients = payload.recipients.len(), "relance webhook delivered");
        true
      }
      Err(e) => {
        tracing::warn!(error = %e, "relance webhook failed");
        false
      }
    }
  }
}
