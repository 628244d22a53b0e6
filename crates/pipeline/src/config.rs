use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use gie_core::Catalog;
use gie_ml::{OpenAiConfig, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, DEFAULT_TOP_K};

/// Results never carry more than three ranked intents; `GIE_TOP_K` can only
/// narrow that.
pub const MAX_TOP_K: usize = 3;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `None` when no credential is set; the primary classifier is then
    /// reported unavailable and every valid query takes the fallback path.
    pub openai: Option<OpenAiConfig>,
    pub top_k: usize,
    pub catalog_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            openai: None,
            top_k: DEFAULT_TOP_K,
            catalog_path: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let openai = get("OPENAI_API_KEY").map(|api_key| OpenAiConfig {
            api_key,
            model: get("GIE_OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: get("GIE_OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            connect_timeout: Duration::from_secs(
                get("GIE_OPENAI_CONNECT_TIMEOUT_SECONDS")
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(6),
            ),
            timeout: Duration::from_secs(
                get("GIE_OPENAI_TIMEOUT_SECONDS")
                    .and_then(|value| value.parse::<u64>().ok())
                    .unwrap_or(20),
            ),
        });

        let top_k = get("GIE_TOP_K")
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_K)
            .clamp(1, MAX_TOP_K);

        Self {
            openai,
            top_k,
            catalog_path: get("GIE_CATALOG_PATH").map(PathBuf::from),
        }
    }

    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog_path {
            Some(path) => Catalog::from_json_file(path),
            None => Ok(Catalog::builtin()),
        }
    }
}
