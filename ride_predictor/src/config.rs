use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub model_path: PathBuf,
    pub meta_path: PathBuf,
    /// Log feature-vector statistics for every prediction.
    pub log_pred: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            model_path: PathBuf::from("models/xgb_model.json"),
            meta_path: PathBuf::from("models/meta.json"),
            log_pred: false,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("config file not found at {}", path))?;
        serde_json::from_str(&data).with_context(|| format!("invalid config JSON in {}", path))
    }

    /// `RIDE_CONFIG` file first, then individual environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = match var("RIDE_CONFIG") {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };

        if let Some(p) = var("MODEL_PATH") {
            cfg.model_path = PathBuf::from(p);
        }
        if let Some(p) = var("META_PATH") {
            cfg.meta_path = PathBuf::from(p);
        }
        if let Some(addr) = var("BIND_ADDR") {
            cfg.bind_addr = addr;
        } else if let Some(port) = var("PORT") {
            let port: u16 = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
            cfg.bind_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(flag) = var("LOG_PRED") {
            cfg.log_pred = flag == "1";
        }
        Ok(cfg)
    }
}
