//! Ride outcome prediction service.
//!
//! Raw rides are run through the [`pipeline`], encoded against the model's
//! feature list, classified by a boosted tree ensemble and decoded back to a
//! ride status string.

pub mod config;
pub mod encode;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod types;

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::model::Model;
use crate::pipeline::FeaturePipeline;
use crate::types::{BatchPredictionOut, FeatureTable, PredictionOut, RawRideRecord};

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub mdl: Arc<Model>,
    pub pipeline: Arc<FeaturePipeline>,
    pub log_pred: bool,
}

impl AppState {
    pub fn new(mdl: Model) -> Self {
        Self {
            mdl: Arc::new(mdl),
            pipeline: Arc::new(FeaturePipeline::new()),
            log_pred: false,
        }
    }

    pub fn with_log_pred(mut self, log_pred: bool) -> Self {
        self.log_pred = log_pred;
        self
    }

    fn predict_table(&self, records: &[RawRideRecord]) -> Result<Vec<String>, ApiError> {
        let table = self.pipeline.transform(records)?;
        if self.log_pred {
            log_vectors(&table, self.mdl.feat_list());
        }
        Ok(self.mdl.predict(&table)?)
    }
}

/// Debug signal so we can confirm we're not sending all-zeros.
fn log_vectors(table: &FeatureTable, feat_list: &[String]) {
    for (i, row) in table.iter().enumerate() {
        let vec = encode::encode_row(row, feat_list);
        let nz = vec.iter().filter(|x| **x != 0.0).count();
        let mean = if vec.is_empty() { 0.0 } else { vec.iter().sum::<f32>() / (vec.len() as f32) };
        let std = if vec.len() < 2 {
            0.0
        } else {
            let m = mean;
            (vec.iter().map(|x| (x - m) * (x - m)).sum::<f32>() / (vec.len() as f32)).sqrt()
        };
        let sample: Vec<String> = feat_list
            .iter()
            .zip(&vec)
            .take(6)
            .map(|(name, v)| format!("{}={:.3}", name, v))
            .collect();
        tracing::info!(
            "row={} vehicle={} in_dim={} nonzero={} mean={:.3} std={:.3} sample=[{}]",
            i, row.vehicle_type, vec.len(), nz, mean, std, sample.join(", ")
        );
    }
}

// ---------- Handlers ----------

async fn health() -> Json<Value> {
    Json(json!({ "status": "API is live" }))
}

async fn predict(
    State(state): State<AppState>,
    Json(payload): Json<RawRideRecord>,
) -> Result<Json<PredictionOut>, ApiError> {
    let mut labels = state.predict_table(std::slice::from_ref(&payload))?;
    // one row in, one label out
    let prediction = labels.remove(0);
    tracing::debug!("predicted {} for ride on {}", prediction, payload.date);
    Ok(Json(PredictionOut { prediction }))
}

async fn predict_batch(
    State(state): State<AppState>,
    Json(payload): Json<Vec<RawRideRecord>>,
) -> Result<Json<BatchPredictionOut>, ApiError> {
    tracing::debug!("batch of {} rides", payload.len());
    let predictions = state.predict_table(&payload)?;
    Ok(Json(BatchPredictionOut { predictions }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/predict", post(predict))
        .route("/predict-batch", post(predict_batch))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(addr: &str, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
