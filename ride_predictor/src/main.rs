use ride_predictor::{config::ServerConfig, model::Model, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ServerConfig::from_env()?;
    let mdl = Model::load(&cfg.model_path, &cfg.meta_path)?;

    // Warmup to catch a broken artifact before serving traffic
    let probe = mdl.predict_encoded(&vec![0.0; mdl.in_dim()])?;
    tracing::info!("warmup forward ok (label={})", mdl.decode(probe)?);

    tracing::info!(
        "loaded model; trees={} classes={:?} feat_list[{}]: {:?}",
        mdl.num_trees(),
        mdl.classes(),
        mdl.in_dim(),
        mdl.feat_list()
    );

    let state = AppState::new(mdl).with_log_pred(cfg.log_pred);
    ride_predictor::serve(&cfg.bind_addr, state).await
}
