use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct FormConfig {
    pub bind_addr: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8501".to_string(),
            api_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 60,
        }
    }
}

impl FormConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(addr) = var("FORM_BIND_ADDR") {
            cfg.bind_addr = addr;
        }
        if let Some(url) = var("API_URL") {
            cfg.api_url = url;
        }
        if let Some(secs) = var("API_TIMEOUT_SECS") {
            cfg.timeout_secs = secs
                .parse()
                .with_context(|| format!("API_TIMEOUT_SECS must be whole seconds, got {:?}", secs))?;
        }
        Ok(cfg)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
