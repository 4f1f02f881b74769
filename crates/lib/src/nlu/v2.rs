//! V2 `detectIntent` request/response wire types and normalization.
//!
//! | Interpretation | v2 field |
//! |---|---|
//! | action | `queryResult.action` |
//! | confidence | `queryResult.intentDetectionConfidence` |
//! | intent | `queryResult.intent.displayName` |
//! | parameters | `queryResult.parameters` |
//! | contexts | `queryResult.outputContexts[].name` (last path segment) |
//! | fulfillment | `queryResult.fulfillmentText` / `.fulfillmentMessages` |
//! | resolved_query | `queryResult.queryText` |
//! | lang | `queryResult.languageCode` |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::message::{Fulfillment, Interpretation};
use crate::nlu::{context_short_name, NluError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DetectIntentBody<'a> {
    pub query_input: QueryInput<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct QueryInput<'a> {
    pub text: TextInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TextInput<'a> {
    pub text: &'a str,
    pub language_code: &'a str,
}

impl<'a> DetectIntentBody<'a> {
    pub fn new(text: &'a str, language_code: &'a str) -> Self {
        Self {
            query_input: QueryInput {
                text: TextInput {
                    text,
                    language_code,
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Response {
    #[serde(default)]
    query_result: Option<QueryResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResult {
    #[serde(default)]
    query_text: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    parameters: Option<Map<String, Value>>,
    #[serde(default)]
    fulfillment_text: Option<String>,
    #[serde(default)]
    fulfillment_messages: Option<Vec<Value>>,
    #[serde(default)]
    intent: Option<Intent>,
    #[serde(default)]
    intent_detection_confidence: Option<f64>,
    #[serde(default)]
    output_contexts: Option<Vec<OutputContext>>,
    #[serde(default)]
    language_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Intent {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OutputContext {
    name: String,
}

/// Normalize a parsed v2 body.
pub(super) fn interpret(raw: Value) -> Result<Interpretation, NluError> {
    let data: Response = serde_json::from_value(raw.clone())
        .map_err(|e| NluError::Malformed(format!("v2 response: {}", e)))?;
    let result = data
        .query_result
        .ok_or_else(|| NluError::Malformed("v2 response has no queryResult".to_string()))?;

    // proto3 JSON omits zero values: a matched intent without a confidence field scored 0.
    let confidence = result
        .intent_detection_confidence
        .or_else(|| result.intent.as_ref().map(|_| 0.0));

    let fulfillment = if result.fulfillment_text.is_some() || result.fulfillment_messages.is_some()
    {
        Some(Fulfillment {
            speech: result.fulfillment_text.unwrap_or_default(),
            messages: result.fulfillment_messages.unwrap_or_default(),
        })
    } else {
        None
    };

    Ok(Interpretation {
        intent: result.intent.and_then(|i| i.display_name),
        action: result.action.unwrap_or_default(),
        confidence,
        parameters: result.parameters.unwrap_or_default(),
        contexts: result
            .output_contexts
            .unwrap_or_default()
            .iter()
            .map(|c| context_short_name(&c.name).to_string())
            .collect(),
        fulfillment,
        lang: result.language_code,
        resolved_query: result.query_text,
        raw,
    })
}
