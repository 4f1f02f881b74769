//! Dialogflow HTTP client (v1 query endpoint or v2 detectIntent).
//!
//! API variant is set at construction. Each call is one POST; nothing is retried.

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::{self, NluConfig};
use crate::message::Interpretation;
use crate::nlu::{v1, v2, ApiVersion, NluBackend, NluError, QueryRequest};

const DEFAULT_V1_BASE_URL: &str = "https://api.dialogflow.com";
const DEFAULT_V2_BASE_URL: &str = "https://dialogflow.googleapis.com";
const DEFAULT_PROTOCOL: &str = "20150910";

/// Client for the Dialogflow API.
#[derive(Clone)]
pub struct DialogflowClient {
    base_url: String,
    version: ApiVersion,
    protocol: String,
    token: Option<String>,
    project_id: Option<String>,
    client: reqwest::Client,
}

impl DialogflowClient {
    pub fn new(version: ApiVersion, base_url: Option<String>) -> Self {
        Self::with_http_client(version, base_url, reqwest::Client::new())
    }

    fn with_http_client(
        version: ApiVersion,
        base_url: Option<String>,
        client: reqwest::Client,
    ) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| match version {
                ApiVersion::V1 => DEFAULT_V1_BASE_URL.to_string(),
                ApiVersion::V2 => DEFAULT_V2_BASE_URL.to_string(),
            });
        Self {
            base_url,
            version,
            protocol: DEFAULT_PROTOCOL.to_string(),
            token: None,
            project_id: None,
            client,
        }
    }

    /// Build from config: endpoint, token (env FLOWBRIDGE_NLU_TOKEN wins), project, and optional timeout.
    pub fn from_config(cfg: &NluConfig) -> Result<Self, NluError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = cfg.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| NluError::Config(format!("http client: {}", e)))?;
        let mut client = Self::with_http_client(cfg.version, cfg.url.clone(), http)
            .with_protocol(cfg.protocol.clone());
        client.token = config::resolve_nlu_token(cfg);
        client.project_id = cfg
            .project_id
            .as_ref()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        if client.version == ApiVersion::V2 && client.project_id.is_none() {
            return Err(NluError::Config("v2 requires nlu.projectId".to_string()));
        }
        Ok(client)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        let p = protocol.into();
        if !p.trim().is_empty() {
            self.protocol = p;
        }
        self
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /{version}/query?v={protocol} — v1 query.
    async fn query_v1(&self, query: &QueryRequest) -> Result<Interpretation, NluError> {
        let url = format!("{}/{}/query", self.base_url, ApiVersion::V1.as_str());
        let body = v1::QueryBody {
            query: &query.text,
            session_id: &query.session_id,
            lang: &query.lang,
        };
        let req = self
            .client
            .post(&url)
            .query(&[("v", self.protocol.as_str())]);
        let raw = self.send_json(req, &body).await?;
        v1::interpret(raw)
    }

    /// POST /v2/projects/{project}/agent/sessions/{session}:detectIntent — v2 detect intent.
    async fn detect_v2(&self, query: &QueryRequest) -> Result<Interpretation, NluError> {
        let project = self
            .project_id
            .as_deref()
            .ok_or_else(|| NluError::Config("v2 requires a project id".to_string()))?;
        let url = self.detect_intent_url(project, &query.session_id)?;
        let body = v2::DetectIntentBody::new(&query.text, &query.lang);
        let raw = self.send_json(self.client.post(url), &body).await?;
        v2::interpret(raw)
    }

    /// Session ids are caller-supplied, so path segments are percent-encoded through `Url`.
    fn detect_intent_url(&self, project: &str, session_id: &str) -> Result<Url, NluError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| NluError::Config(format!("invalid base url {}: {}", self.base_url, e)))?;
        let session = format!("{}:detectIntent", session_id);
        url.path_segments_mut()
            .map_err(|_| NluError::Config(format!("base url cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend([
                "v2",
                "projects",
                project,
                "agent",
                "sessions",
                session.as_str(),
            ]);
        Ok(url)
    }

    /// Attach auth and body, send, and require a 200 with a JSON body.
    async fn send_json<T: Serialize + ?Sized>(
        &self,
        req: reqwest::RequestBuilder,
        body: &T,
    ) -> Result<Value, NluError> {
        let req = match self.token.as_deref() {
            Some(t) => req.bearer_auth(t),
            None => req,
        };
        let res = req.json(body).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if status != StatusCode::OK {
            return Err(NluError::Protocol {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| NluError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl NluBackend for DialogflowClient {
    async fn detect_intent(&self, query: &QueryRequest) -> Result<Interpretation, NluError> {
        log::debug!(
            "nlu {}: querying session {}",
            self.version.as_str(),
            query.session_id
        );
        match self.version {
            ApiVersion::V1 => self.query_v1(query).await,
            ApiVersion::V2 => self.detect_v2(query).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_per_version() {
        assert_eq!(
            DialogflowClient::new(ApiVersion::V1, None).base_url(),
            "https://api.dialogflow.com"
        );
        assert_eq!(
            DialogflowClient::new(ApiVersion::V2, None).base_url(),
            "https://dialogflow.googleapis.com"
        );
        assert_eq!(
            DialogflowClient::new(ApiVersion::V1, Some("http://127.0.0.1:9/".into())).base_url(),
            "http://127.0.0.1:9"
        );
    }

    #[test]
    fn v2_url_encodes_session_segment() {
        let c = DialogflowClient::new(ApiVersion::V2, Some("http://127.0.0.1:9".into()));
        let url = c.detect_intent_url("fruit-shop", "a/b").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9/v2/projects/fruit-shop/agent/sessions/a%2Fb:detectIntent"
        );
    }

    #[test]
    fn from_config_requires_project_for_v2() {
        let cfg = NluConfig {
            version: ApiVersion::V2,
            ..Default::default()
        };
        assert!(matches!(
            DialogflowClient::from_config(&cfg),
            Err(NluError::Config(_))
        ));
    }

    #[test]
    fn from_config_builds_client_with_timeout() {
        let cfg = NluConfig {
            timeout_secs: Some(5),
            url: Some("http://127.0.0.1:9/".into()),
            ..Default::default()
        };
        let c = DialogflowClient::from_config(&cfg).unwrap();
        assert_eq!(c.base_url(), "http://127.0.0.1:9");
        assert_eq!(c.version(), ApiVersion::V1);
    }

    #[test]
    fn blank_protocol_keeps_default() {
        let c = DialogflowClient::new(ApiVersion::V1, None).with_protocol("  ");
        assert_eq!(c.protocol, "20150910");
    }
}
