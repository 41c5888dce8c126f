use std::net::SocketAddr;
use std::sync::Arc;

use crate::aggregator::{Aggregator, DEFAULT_FAN_OUT, DEFAULT_TARGET_COUNTRY};
use crate::clients::{
    DeezerClient, GeminiClient,
    deezer::DEEZER_API_URL,
    errors::{Error, Result},
    gemini::{DEFAULT_MODEL, GEMINI_API_URL},
};
use crate::resolver::MoodResolver;

/// Address the HTTP API listens on unless `BIND_ADDR` says otherwise.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Runtime settings, normally read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API key (`GOOGLE_API_KEY`), required.
    pub google_api_key: String,
    /// Model name used for keyword extraction.
    pub gemini_model: String,
    /// Base URL of the Gemini API.
    pub gemini_api_url: String,
    /// Base URL of the Deezer API.
    pub deezer_api_url: String,
    /// Upper-cased country code for the locale filter.
    pub target_country: String,
    /// Maximum concurrent per-playlist calls.
    pub fan_out: usize,
    /// Listen address of the HTTP API.
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Wires the catalog and language model clients into a resolver.
    pub fn resolver(&self) -> Result<MoodResolver> {
        let deezer = DeezerClient::new(&self.deezer_api_url)?;
        let gemini = GeminiClient::new(
            &self.gemini_api_url,
            &self.google_api_key,
            &self.gemini_model,
        )?;
        let aggregator = Aggregator::new(Arc::new(deezer), &self.target_country, self.fan_out);
        Ok(MoodResolver::new(Arc::new(gemini), aggregator))
    }
}

/// Explicit values win over the environment, which wins over defaults.
#[derive(Default)]
pub struct ConfigBuilder {
    google_api_key: Option<String>,
    bind_addr: Option<SocketAddr>,
}

impl ConfigBuilder {
    /// Creates a builder with nothing set explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides `GOOGLE_API_KEY`.
    #[must_use]
    pub fn google_api_key(mut self, key: impl Into<String>) -> Self {
        self.google_api_key = Some(key.into());
        self
    }

    /// Overrides `BIND_ADDR`.
    #[must_use]
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    /// Loads `.env` if present, then resolves settings from the process environment.
    pub fn build(self) -> Result<Config> {
        // A missing .env file is fine, variables may come from the process environment
        let _ = dotenvy::dotenv();
        self.build_with(|key| std::env::var(key).ok())
    }

    /// Resolves settings using `env` as the variable lookup.
    pub fn build_with(self, env: impl Fn(&str) -> Option<String>) -> Result<Config> {
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let google_api_key = match self.google_api_key.or_else(|| var("GOOGLE_API_KEY")) {
            Some(key) => key,
            None => {
                return Err(Error::ConfigurationError(
                    "GOOGLE_API_KEY is not set".into(),
                ));
            }
        };

        let fan_out = match var("FAN_OUT") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(0) | Err(_) => {
                    return Err(Error::ConfigurationError(format!(
                        "FAN_OUT must be a positive integer, got {raw:?}"
                    )));
                }
                Ok(n) => n,
            },
            None => DEFAULT_FAN_OUT,
        };

        let bind_addr = match self.bind_addr {
            Some(addr) => addr,
            None => {
                let raw = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
                raw.parse().map_err(|e| {
                    Error::ConfigurationError(format!("invalid BIND_ADDR {raw:?}: {e}"))
                })?
            }
        };

        Ok(Config {
            google_api_key,
            gemini_model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into()),
            gemini_api_url: var("GEMINI_API_URL").unwrap_or_else(|| GEMINI_API_URL.into()),
            deezer_api_url: var("DEEZER_API_URL").unwrap_or_else(|| DEEZER_API_URL.into()),
            target_country: var("TARGET_COUNTRY")
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|| DEFAULT_TARGET_COUNTRY.into()),
            fan_out,
            bind_addr,
        })
    }
}
