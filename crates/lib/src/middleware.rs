//! Middleware entry point: enrich incoming messages via the NLU backend, then match actions.
//!
//! The chat framework calls [`Middleware::receive`] once per incoming message and may then call
//! [`Middleware::action`] / [`Middleware::hears`] any number of times on the enriched message.

use crate::config::NluConfig;
use crate::matcher::{Matcher, Target, DEFAULT_MIN_CONFIDENCE};
use crate::message::Message;
use crate::nlu::{DialogflowClient, NluBackend, NluError, QueryRequest};
use crate::session;

/// Options that do not depend on the backend.
#[derive(Debug, Clone)]
pub struct MiddlewareOptions {
    pub lang: String,
    pub min_confidence: f64,
    pub session_id_props: Vec<String>,
    pub ignore_types: Vec<String>,
}

impl Default for MiddlewareOptions {
    fn default() -> Self {
        Self::from(&NluConfig::default())
    }
}

impl From<&NluConfig> for MiddlewareOptions {
    fn from(cfg: &NluConfig) -> Self {
        Self {
            lang: cfg.lang.clone(),
            min_confidence: cfg.min_confidence,
            session_id_props: cfg.session_id_props.clone(),
            ignore_types: cfg.ignore_types.clone(),
        }
    }
}

pub struct Middleware<B: NluBackend = DialogflowClient> {
    backend: B,
    matcher: Matcher,
    options: MiddlewareOptions,
}

impl Middleware<DialogflowClient> {
    /// Dialogflow-backed middleware from config.
    pub fn from_config(cfg: &NluConfig) -> Result<Self, NluError> {
        let backend = DialogflowClient::from_config(cfg)?;
        Ok(Self::with_backend(backend, MiddlewareOptions::from(cfg)))
    }
}

impl<B: NluBackend> Middleware<B> {
    pub fn with_backend(backend: B, options: MiddlewareOptions) -> Self {
        let min_confidence = if options.min_confidence.is_finite() {
            options.min_confidence
        } else {
            log::warn!(
                "middleware: invalid minimum confidence {}, using {}",
                options.min_confidence,
                DEFAULT_MIN_CONFIDENCE
            );
            DEFAULT_MIN_CONFIDENCE
        };
        Self {
            backend,
            matcher: Matcher::new(min_confidence),
            options,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Resolve the message with a session id derived from its configured properties.
    pub async fn receive<'m>(&self, message: &'m mut Message) -> Result<&'m Message, NluError> {
        let session_id = session::session_id_for(message, &self.options.session_id_props);
        self.receive_with_session(message, session_id).await
    }

    /// Resolve the message in the given backend session. On success the message is annotated and
    /// returned; on error it is left exactly as it was. Ignored types, echoes, and empty text pass
    /// through unchanged without a backend call.
    pub async fn receive_with_session<'m>(
        &self,
        message: &'m mut Message,
        session_id: impl Into<String>,
    ) -> Result<&'m Message, NluError> {
        if let Some(reason) = self.skip_reason(message) {
            log::debug!("middleware: skipping message ({})", reason);
            return Ok(message);
        }
        let query = QueryRequest {
            text: message.text.trim().to_string(),
            session_id: session_id.into(),
            lang: self.options.lang.clone(),
        };
        match self.backend.detect_intent(&query).await {
            Ok(interp) => {
                log::info!(
                    "middleware: resolved action {:?} (confidence {:?})",
                    interp.action,
                    interp.confidence
                );
                message.annotate(interp);
                Ok(message)
            }
            Err(e) => {
                log::warn!("middleware: nlu query failed: {}", e);
                Err(e)
            }
        }
    }

    fn skip_reason(&self, message: &Message) -> Option<&'static str> {
        if self.options.ignore_types.iter().any(|t| *t == message.kind) {
            Some("ignored type")
        } else if message.is_echo {
            Some("echo")
        } else if message.text.trim().is_empty() {
            Some("empty text")
        } else {
            None
        }
    }

    /// True when the resolved action matches `target` and the confidence gate passes.
    pub fn action(&self, target: impl Into<Target>, message: &Message) -> bool {
        self.matcher.action(&target.into(), message)
    }

    /// True when the resolved intent name matches `target` and the confidence gate passes.
    pub fn hears(&self, target: impl Into<Target>, message: &Message) -> bool {
        self.matcher.hears(&target.into(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Interpretation;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records queries and answers each with a fixed result.
    struct FakeBackend {
        answer: Result<Interpretation, String>,
        queries: Mutex<Vec<QueryRequest>>,
    }

    impl FakeBackend {
        fn answering(action: &str, confidence: Option<f64>) -> Self {
            Self {
                answer: Ok(Interpretation {
                    action: action.to_string(),
                    confidence,
                    raw: json!({}),
                    ..Default::default()
                }),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                answer: Err(msg.to_string()),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<QueryRequest> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NluBackend for FakeBackend {
        async fn detect_intent(&self, query: &QueryRequest) -> Result<Interpretation, NluError> {
            self.queries.lock().unwrap().push(query.clone());
            self.answer.clone().map_err(NluError::Malformed)
        }
    }

    fn message() -> Message {
        Message::new("direct_message", "pick an apple")
            .with_user("test_user")
            .with_channel("test_channel")
    }

    #[tokio::test]
    async fn receive_annotates_and_forwards_text_and_session() {
        let mw = Middleware::with_backend(
            FakeBackend::answering("pickFruit", Some(1.0)),
            MiddlewareOptions::default(),
        );
        let mut msg = message();
        let out = mw.receive(&mut msg).await.unwrap();
        assert_eq!(out.action, "pickFruit");
        assert!(mw.action("pickFruit", &msg));

        let calls = mw.backend().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].text, "pick an apple");
        assert_eq!(calls[0].lang, "en");
        assert_eq!(
            calls[0].session_id,
            session::session_id_for(&msg, &MiddlewareOptions::default().session_id_props)
        );
    }

    #[tokio::test]
    async fn explicit_session_is_forwarded() {
        let mw = Middleware::with_backend(
            FakeBackend::answering("pickFruit", None),
            MiddlewareOptions::default(),
        );
        let mut msg = message();
        mw.receive_with_session(&mut msg, "12345").await.unwrap();
        assert_eq!(mw.backend().calls()[0].session_id, "12345");
    }

    #[tokio::test]
    async fn failure_leaves_message_untouched() {
        let mw = Middleware::with_backend(FakeBackend::failing("boom"), MiddlewareOptions::default());
        let mut msg = message();
        let before = msg.clone();
        assert!(mw.receive(&mut msg).await.is_err());
        assert_eq!(msg, before);
        assert!(!mw.action("pickFruit", &msg));
    }

    #[tokio::test]
    async fn skipped_messages_make_no_backend_call() {
        let mw = Middleware::with_backend(
            FakeBackend::answering("pickFruit", Some(1.0)),
            MiddlewareOptions::default(),
        );

        let mut own = message();
        own.kind = "self_message".to_string();
        let mut echo = message();
        echo.is_echo = true;
        let mut blank = message();
        blank.text = "   ".to_string();

        for m in [&mut own, &mut echo, &mut blank] {
            let out = mw.receive(m).await.unwrap();
            assert!(!out.is_resolved());
        }
        assert!(mw.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn framework_echo_is_skipped() {
        let mw = Middleware::with_backend(
            FakeBackend::answering("pickFruit", Some(1.0)),
            MiddlewareOptions::default(),
        );
        let mut echo: Message = serde_json::from_value(json!({
            "type": "message_received",
            "text": "hi",
            "is_echo": true
        }))
        .unwrap();
        assert!(!mw.receive(&mut echo).await.unwrap().is_resolved());
        assert!(mw.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn configured_threshold_applies() {
        let opts = MiddlewareOptions {
            min_confidence: 0.9,
            ..Default::default()
        };
        let mw = Middleware::with_backend(FakeBackend::answering("pickFruit", Some(0.8)), opts);
        let mut msg = message();
        mw.receive(&mut msg).await.unwrap();
        assert!(!mw.action("pickFruit", &msg));
    }

    #[tokio::test]
    async fn compiled_target_is_reused_across_checks() {
        let mw = Middleware::with_backend(
            FakeBackend::answering("pickFruit", Some(1.0)),
            MiddlewareOptions::default(),
        );
        let mut msg = message();
        mw.receive(&mut msg).await.unwrap();
        let target = Target::from(["blah", "pick(.*)"]);
        assert!(mw.action(&target, &msg));
        assert!(mw.action(&target, &msg.clone()));
    }

    #[test]
    fn non_finite_threshold_falls_back_to_default() {
        let opts = MiddlewareOptions {
            min_confidence: f64::NAN,
            ..Default::default()
        };
        let mw = Middleware::with_backend(FakeBackend::answering("x", None), opts);
        assert_eq!(mw.matcher().min_confidence(), DEFAULT_MIN_CONFIDENCE);
    }
}
