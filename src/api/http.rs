use super::{ApiRequest, ApiResponse, Transport};
use crate::error::{ClientError, Result};
use crate::model::ClientConfig;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

/// `Transport` over a pooled reqwest client.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(cfg: &ClientConfig) -> anyhow::Result<Self> {
        // Validate early so a bad --base-url fails before any session work.
        reqwest::Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid base url: {}", cfg.base_url))?;

        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self.http.request(req.method, self.url_for(&req.path));
        if let Some(token) = req.bearer.as_deref() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = req.body.as_ref() {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ClientError::transport(e.to_string()))?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| ClientError::transport(e.to_string()))?;

        Ok(ApiResponse {
            status,
            body: parse_body(text),
        })
    }
}

/// Empty bodies become `null`; non-JSON bodies are kept as a string.
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}
