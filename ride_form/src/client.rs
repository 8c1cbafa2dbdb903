use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::form::RidePayload;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("API Error: {body}")]
    Api { status: u16, body: String },
    #[error("unable to reach prediction service: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response from prediction service: {0}")]
    Decode(String),
    #[error("page rendering failed: {0}")]
    Render(#[from] handlebars::RenderError),
}

#[derive(Deserialize)]
struct PredictionOut {
    prediction: String,
}

/// Thin client for the prediction API.
#[derive(Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    api_url: String,
}

impl PredictionClient {
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn predict(&self, payload: &RidePayload) -> Result<String, FormError> {
        let url = format!("{}/predict", self.api_url);
        let resp = self.http.post(&url).json(payload).send().await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!("prediction API returned {}: {}", status, body);
            return Err(FormError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let out: PredictionOut = resp
            .json()
            .await
            .map_err(|e| FormError::Decode(e.to_string()))?;
        Ok(out.prediction)
    }
}
