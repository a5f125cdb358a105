//! Async HTTP client for the public registration endpoints.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use registrar_core::{
  catalog::{ExamType, Formation},
  examen::ExamenRequest,
  inscription::NewInscription,
};
use reqwest::{Client, Response};
use serde::{Deserialize, de::DeserializeOwned};

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

#[derive(Deserialize)]
struct FormationsBody {
  formations: Vec<Formation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExamTypesBody {
  exam_types: Vec<ExamType>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedInscription {
  row_index: i64,
}

#[derive(Deserialize)]
struct InscriptionBody {
  inscription: CreatedInscription,
}

/// What the server hands back for a new exam registration.
#[derive(Debug, Deserialize)]
pub struct CreatedExamen {
  pub id:    i64,
  pub token: String,
  pub url:   String,
}

#[derive(Deserialize)]
struct ExamenBody {
  examen: CreatedExamen,
}

impl ApiClient {
  pub fn new(base_url: String) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }

  /// Decode a success body, or turn the `{error}` body into an error.
  async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
      return resp.json().await.with_context(|| format!("deserialising {what}"));
    }
    let message = resp
      .json::<ErrorBody>()
      .await
      .map(|body| body.error)
      .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown error").to_owned());
    Err(anyhow!("{what} → {status}: {message}"))
  }

  /// `GET /api/formations`
  pub async fn list_formations(&self) -> Result<Vec<Formation>> {
    let resp = self
      .client
      .get(self.url("/formations"))
      .send()
      .await
      .context("GET /formations failed")?;
    let body: FormationsBody = Self::decode(resp, "formations").await?;
    Ok(body.formations)
  }

  /// `GET /api/exam-types`
  pub async fn list_exam_types(&self) -> Result<Vec<ExamType>> {
    let resp = self
      .client
      .get(self.url("/exam-types"))
      .send()
      .await
      .context("GET /exam-types failed")?;
    let body: ExamTypesBody = Self::decode(resp, "exam types").await?;
    Ok(body.exam_types)
  }

  /// `POST /api/inscriptions`, returning the new row index.
  pub async fn submit_inscription(&self, input: &NewInscription) -> Result<i64> {
    let resp = self
      .client
      .post(self.url("/inscriptions"))
      .json(input)
      .send()
      .await
      .context("POST /inscriptions failed")?;
    let body: InscriptionBody = Self::decode(resp, "inscription").await?;
    Ok(body.inscription.row_index)
  }

  /// `POST /api/examens`
  pub async fn submit_examen(&self, input: &ExamenRequest) -> Result<CreatedExamen> {
    let resp = self
      .client
      .post(self.url("/examens"))
      .json(input)
      .send()
      .await
      .context("POST /examens failed")?;
    let body: ExamenBody = Self::decode(resp, "examen").await?;
    Ok(body.examen)
  }
}
