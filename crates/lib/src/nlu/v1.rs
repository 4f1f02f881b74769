//! V1 `/query` response normalization.
//!
//! | Interpretation | v1 field |
//! |---|---|
//! | action | `result.action` |
//! | confidence | `result.score` |
//! | intent | `result.metadata.intentName` |
//! | parameters | `result.parameters` |
//! | contexts | `result.contexts[]` (plain name or `{ "name": .. }`) |
//! | fulfillment | `result.fulfillment.speech` / `.messages` |
//! | resolved_query | `result.resolvedQuery` |
//! | lang | `lang` |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::{Fulfillment, Interpretation};
use crate::nlu::{context_short_name, NluError};

#[derive(Debug, Serialize)]
pub(super) struct QueryBody<'a> {
    pub query: &'a str,
    #[serde(rename = "sessionId")]
    pub session_id: &'a str,
    pub lang: &'a str,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    result: Option<QueryResult>,
    #[serde(default)]
    status: Option<Status>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Status {
    code: i64,
    #[serde(default)]
    error_type: String,
    #[serde(default)]
    error_details: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    resolved_query: Option<String>,
    #[serde(default)]
    parameters: Option<Map<String, Value>>,
    #[serde(default)]
    contexts: Option<Vec<Context>>,
    #[serde(default)]
    fulfillment: Option<WireFulfillment>,
    #[serde(default)]
    metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Context {
    Name(String),
    Object { name: String },
}

#[derive(Debug, Deserialize)]
struct WireFulfillment {
    #[serde(default)]
    speech: Option<String>,
    #[serde(default)]
    messages: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    #[serde(default)]
    intent_name: Option<String>,
}

/// Normalize a parsed v1 body. A `status.code` other than 200 is an application error.
pub(super) fn interpret(raw: Value) -> Result<Interpretation, NluError> {
    let data: Response = serde_json::from_value(raw.clone())
        .map_err(|e| NluError::Malformed(format!("v1 response: {}", e)))?;
    if let Some(status) = data.status {
        if status.code != 200 {
            return Err(NluError::Application {
                code: status.code,
                error_type: status.error_type,
                details: status.error_details.unwrap_or_default(),
            });
        }
    }
    let result = data
        .result
        .ok_or_else(|| NluError::Malformed("v1 response has no result".to_string()))?;
    let contexts = result
        .contexts
        .unwrap_or_default()
        .into_iter()
        .map(|c| match c {
            Context::Name(n) | Context::Object { name: n } => context_short_name(&n).to_string(),
        })
        .collect();
    let fulfillment = result.fulfillment.map(|f| Fulfillment {
        speech: f.speech.unwrap_or_default(),
        messages: f.messages.unwrap_or_default(),
    });
    Ok(Interpretation {
        intent: result.metadata.and_then(|m| m.intent_name),
        action: result.action.unwrap_or_default(),
        confidence: result.score,
        parameters: result.parameters.unwrap_or_default(),
        contexts,
        fulfillment,
        lang: data.lang,
        resolved_query: result.resolved_query,
        raw,
    })
}
