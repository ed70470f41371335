//! In-memory transport for tests.

use super::{ApiRequest, ApiResponse, Transport};
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type Route = (Method, String);

/// Scripts responses per `(method, path)` and records every request it sees.
/// The last scripted response for a route is reused once the queue drains.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<Route, VecDeque<Result<ApiResponse>>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeTransport {
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push(method, path, Ok(ApiResponse { status, body }));
    }

    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.push(method, path, Err(ClientError::transport(message)));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    fn push(&self, method: Method, path: &str, outcome: Result<ApiResponse>) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(outcome);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, req: ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(req.clone());

        let mut routes = self.routes.lock().unwrap();
        let queue = routes
            .get_mut(&(req.method.clone(), req.path.clone()))
            .ok_or_else(|| ClientError::transport(format!("unscripted {} {}", req.method, req.path)))?;
        if queue.len() > 1 {
            queue
                .pop_front()
                .unwrap_or_else(|| Err(ClientError::transport("empty route")))
        } else {
            queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ClientError::transport("empty route")))
        }
    }
}
