//! Remote service access.
//!
//! `Transport` is the seam between request building and the wire. `ApiClient` builds every
//! request from the current `Credential`, so nothing outside the session ever carries a token.

mod catalog;
mod http;
#[cfg(test)]
pub(crate) mod testing;

pub use http::HttpTransport;

use crate::error::{ClientError, Result};
use crate::session::Credential;
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Only transport-level failures are errors; HTTP status is data.
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse>;
}

/// Pull the server's message out of an error payload (`detail` for auth/report routes,
/// `error` for the scrape route).
fn server_message(body: &Value) -> Option<String> {
    ["detail", "error"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| body.as_str().filter(|s| !s.trim().is_empty()).map(str::to_string))
}

/// Map a non-2xx response to the error taxonomy.
fn classify(resp: &ApiResponse, fallback: &str) -> ClientError {
    let message = server_message(&resp.body).unwrap_or_else(|| fallback.to_string());
    match resp.status {
        401 | 403 => ClientError::Auth(message),
        status => ClientError::Remote {
            status: Some(status),
            message,
        },
    }
}

#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    credential: Credential,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, credential: Credential) -> Self {
        Self {
            transport,
            credential,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, fallback: &str) -> Result<T> {
        let body = self.execute(Method::GET, path, None, fallback).await?;
        decode(body, fallback)
    }

    pub async fn post<B, T>(&self, path: &str, payload: &B, fallback: &str) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_value(payload)
            .map_err(|e| ClientError::validation(format!("{fallback}: {e}")))?;
        let body = self
            .execute(Method::POST, path, Some(payload), fallback)
            .await?;
        decode(body, fallback)
    }

    /// DELETE with an optional JSON body; the response body is ignored.
    pub async fn delete(&self, path: &str, payload: Option<Value>, fallback: &str) -> Result<()> {
        self.execute(Method::DELETE, path, payload, fallback)
            .await
            .map(|_| ())
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        fallback: &str,
    ) -> Result<Value> {
        // Read the credential per request so a cleared token is never reused.
        let bearer = self.credential.current();
        tracing::debug!(%method, path, authenticated = bearer.is_some(), "sending request");

        let req = ApiRequest {
            method,
            path: path.to_string(),
            bearer,
            body,
        };
        let resp = match self.transport.send(req).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(path, error = %e, "request failed before a response");
                return Err(ClientError::Remote {
                    status: None,
                    message: fallback.to_string(),
                });
            }
        };

        if resp.is_success() {
            Ok(resp.body)
        } else {
            let err = classify(&resp, fallback);
            tracing::debug!(path, status = resp.status, error = %err, "request rejected");
            Err(err)
        }
    }
}

fn decode<T: DeserializeOwned>(body: Value, fallback: &str) -> Result<T> {
    serde_json::from_value(body).map_err(|e| {
        tracing::warn!(error = %e, "unexpected response body");
        ClientError::Remote {
            status: None,
            message: fallback.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::testing::FakeTransport;
    use super::*;
    use serde_json::json;

    fn client(fake: &Arc<FakeTransport>) -> ApiClient {
        ApiClient::new(fake.clone(), Credential::default())
    }

    #[tokio::test]
    async fn detail_is_preferred_over_fallback() {
        let fake = Arc::new(FakeTransport::default());
        fake.respond(Method::GET, "/x", 404, json!({"detail": "Report not found"}));

        let err = client(&fake)
            .get::<Value>("/x", "Failed to fetch report")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ClientError::Remote {
                status: Some(404),
                message: "Report not found".into()
            }
        );
    }

    #[tokio::test]
    async fn error_field_and_fallback() {
        let fake = Arc::new(FakeTransport::default());
        fake.respond(Method::POST, "/s", 400, json!({"error": "Missing keyword or sources."}));
        fake.respond(Method::POST, "/t", 500, json!({"detail": [{"msg": "bad"}]}));

        let api = client(&fake);
        let err = api.post::<_, Value>("/s", &json!({}), "Scrape failed").await;
        assert_eq!(err.unwrap_err().to_string(), "Missing keyword or sources.");
        let err = api.post::<_, Value>("/t", &json!({}), "Scrape failed").await;
        assert_eq!(err.unwrap_err().to_string(), "Scrape failed");
    }

    #[tokio::test]
    async fn unauthorized_is_auth_error() {
        let fake = Arc::new(FakeTransport::default());
        fake.respond(Method::GET, "/me", 401, json!({"detail": "Invalid token"}));

        let err = client(&fake).get::<Value>("/me", "x").await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn transport_failure_uses_fallback() {
        let fake = Arc::new(FakeTransport::default());
        fake.fail(Method::GET, "/x", "connection refused");

        let err = client(&fake).get::<Value>("/x", "Failed to fetch reports").await;
        assert_eq!(
            err.unwrap_err(),
            ClientError::Remote {
                status: None,
                message: "Failed to fetch reports".into()
            }
        );
    }

    #[tokio::test]
    async fn anonymous_requests_carry_no_bearer() {
        let fake = Arc::new(FakeTransport::default());
        fake.respond(Method::GET, "/api/sources", 200, json!([]));

        let _: Vec<Value> = client(&fake).get("/api/sources", "x").await.unwrap();
        assert_eq!(fake.requests()[0].bearer, None);
    }
}
