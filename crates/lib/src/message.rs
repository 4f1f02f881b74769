//! Chat message as delivered by the bot framework, plus the fields the resolver attaches to it.
//!
//! Inbound fields (type, text, user, channel) come from the chat platform. Annotation fields are
//! written only by [`Message::annotate`], all at once, from a normalized [`Interpretation`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One incoming chat message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Platform event type (e.g. "direct_message", "self_message").
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    /// Sender id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Channel / conversation id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// True when the platform echoes back a message the bot itself sent. Frameworks send the
    /// snake_case key.
    #[serde(default, rename = "is_echo", alias = "isEcho")]
    pub is_echo: bool,

    /// Intent display name resolved by the NLU backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// Resolved action name; empty until the message has been resolved.
    #[serde(default)]
    pub action: String,
    /// Backend confidence in 0.0–1.0. `None` means no score was reported, which is not the same as 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment: Option<Fulfillment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    /// Raw backend response for downstream consumers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nlp_response: Option<Value>,
}

impl Message {
    pub fn new(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// True once an interpretation has been applied.
    pub fn is_resolved(&self) -> bool {
        self.nlp_response.is_some()
    }

    /// Replace every annotation field with the values from `interp`. Fields the new
    /// interpretation does not carry are cleared, not kept from a previous resolution.
    pub fn annotate(&mut self, interp: Interpretation) {
        self.intent = interp.intent;
        self.action = interp.action;
        self.confidence = interp.confidence;
        self.parameters = interp.parameters;
        self.contexts = interp.contexts;
        self.fulfillment = interp.fulfillment;
        self.lang = interp.lang;
        self.nlp_response = Some(interp.raw);
    }

    /// Value of a top-level message property by its wire name (used for session id derivation).
    pub fn property(&self, name: &str) -> Option<&str> {
        let v = match name {
            "user" => self.user.as_deref(),
            "channel" => self.channel.as_deref(),
            "type" => Some(self.kind.as_str()),
            "text" => Some(self.text.as_str()),
            _ => None,
        };
        v.filter(|s| !s.is_empty())
    }
}

/// Fulfillment returned with the intent: a single speech string and the platform-specific
/// rich messages it was derived from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fulfillment {
    #[serde(default)]
    pub speech: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Value>,
}

impl Fulfillment {
    /// Every non-empty candidate reply, speech first, then the texts found in `messages`
    /// (`speech`, `textToSpeech`, or `text.text[]`), without duplicates.
    pub fn candidates(&self) -> Vec<&str> {
        let mut found: Vec<Option<&str>> = vec![Some(self.speech.as_str())];
        for m in &self.messages {
            found.push(m.get("speech").and_then(Value::as_str));
            found.push(m.get("textToSpeech").and_then(Value::as_str));
            if let Some(texts) = m
                .get("text")
                .and_then(|t| t.get("text"))
                .and_then(Value::as_array)
            {
                found.extend(texts.iter().map(Value::as_str));
            }
        }
        let mut out: Vec<&str> = Vec::new();
        for s in found.into_iter().flatten().map(str::trim) {
            if !s.is_empty() && !out.contains(&s) {
                out.push(s);
            }
        }
        out
    }
}

/// Backend-independent result of one NLU query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Interpretation {
    pub intent: Option<String>,
    pub action: String,
    pub confidence: Option<f64>,
    pub parameters: Map<String, Value>,
    pub contexts: Vec<String>,
    pub fulfillment: Option<Fulfillment>,
    pub lang: Option<String>,
    /// Query text as the backend understood it.
    pub resolved_query: Option<String>,
    pub raw: Value,
}
