use std::sync::Arc;

use anyhow::Context;
use ride_form::{client::PredictionClient, config::FormConfig, page::Pages, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = FormConfig::from_env()?;
    let client = PredictionClient::new(&cfg.api_url, cfg.timeout())
        .context("failed to build HTTP client")?;
    let pages = Pages::new().context("form template does not compile")?;

    let state = AppState {
        client,
        pages: Arc::new(pages),
    };
    ride_form::serve(&cfg.bind_addr, state).await
}
