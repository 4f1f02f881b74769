//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.flowbridge/config.json`) and environment.
//! Only the NLU section exists today; the chat framework supplies everything else.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::nlu::ApiVersion;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// NLU backend and matching settings.
    #[serde(default)]
    pub nlu: NluConfig,
}

/// NLU backend endpoint, credentials, and middleware options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NluConfig {
    /// API variant: "v1" (query endpoint, embedded status) or "v2" (detectIntent).
    #[serde(default)]
    pub version: ApiVersion,

    /// Base URL without the version segment. Defaults depend on the variant.
    #[serde(default)]
    pub url: Option<String>,

    /// v1 protocol date sent as `?v=` (default "20150910").
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Bearer token. Overridden by FLOWBRIDGE_NLU_TOKEN env.
    #[serde(default)]
    pub token: Option<String>,

    /// Agent project id; required for v2.
    #[serde(default)]
    pub project_id: Option<String>,

    /// Query language (default "en").
    #[serde(default = "default_lang")]
    pub lang: String,

    /// Messages scored below this are never matched (default 0.5).
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Message properties hashed into the backend session id (default user, channel).
    #[serde(default = "default_session_id_props")]
    pub session_id_props: Vec<String>,

    /// Message types passed through without a backend call (default self_message).
    #[serde(default = "default_ignore_types")]
    pub ignore_types: Vec<String>,

    /// Optional request timeout for the HTTP client, in seconds. No timeout when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_protocol() -> String {
    "20150910".to_string()
}

fn default_lang() -> String {
    "en".to_string()
}

fn default_min_confidence() -> f64 {
    0.5
}

fn default_session_id_props() -> Vec<String> {
    vec!["user".to_string(), "channel".to_string()]
}

fn default_ignore_types() -> Vec<String> {
    vec!["self_message".to_string()]
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            version: ApiVersion::default(),
            url: None,
            protocol: default_protocol(),
            token: None,
            project_id: None,
            lang: default_lang(),
            min_confidence: default_min_confidence(),
            session_id_props: default_session_id_props(),
            ignore_types: default_ignore_types(),
            timeout_secs: None,
        }
    }
}

/// Resolve the NLU token: env FLOWBRIDGE_NLU_TOKEN overrides config.
pub fn resolve_nlu_token(config: &NluConfig) -> Option<String> {
    std::env::var("FLOWBRIDGE_NLU_TOKEN")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .token
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("FLOWBRIDGE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".flowbridge").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path, or the default path (or FLOWBRIDGE_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
