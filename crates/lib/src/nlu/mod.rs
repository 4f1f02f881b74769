//! NLU backend abstraction and Dialogflow client.
//!
//! Two API variants are supported. Both are normalized into a single [`Interpretation`]
//! (see `v1.rs` and `v2.rs` for the field mapping of each).

mod client;
mod v1;
mod v2;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::message::Interpretation;

pub use client::DialogflowClient;

/// Which Dialogflow API the client talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    /// `POST /v1/query?v=<protocol>`; status is embedded in the response body.
    #[default]
    V1,
    /// `POST /v2/projects/<project>/agent/sessions/<session>:detectIntent`.
    V2,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1",
            ApiVersion::V2 => "v2",
        }
    }
}

/// One text query for the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub text: String,
    /// Correlates turns of the same conversation on the backend side.
    pub session_id: String,
    pub lang: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NluError {
    /// Could not reach the backend (connect, TLS, timeout, body read).
    #[error("nlu request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Backend answered with a status other than 200.
    #[error("nlu backend returned {status}: {body}")]
    Protocol { status: u16, body: String },
    /// Body was not JSON, or not the expected response shape.
    #[error("nlu response malformed: {0}")]
    Malformed(String),
    /// Well-formed response whose embedded status reports a failure.
    #[error("nlu api error {code} ({error_type}): {details}")]
    Application {
        code: i64,
        error_type: String,
        details: String,
    },
    #[error("nlu client misconfigured: {0}")]
    Config(String),
}

/// Something that turns text into an [`Interpretation`]. Implemented by [`DialogflowClient`].
#[async_trait]
pub trait NluBackend: Send + Sync {
    async fn detect_intent(&self, query: &QueryRequest) -> Result<Interpretation, NluError>;
}

/// Last segment of a context resource name (`projects/p/agent/sessions/s/contexts/shop` -> `shop`).
fn context_short_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}
