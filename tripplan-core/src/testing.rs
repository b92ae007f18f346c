//! In-memory [`Transport`] for exercising clients without a backend.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::api::{ApiError, ApiRequest, ApiResult, Transport};

enum Scripted {
    Body(Value),
    Status(StatusCode, String),
}

/// Replays queued responses in order and records every request it receives.
/// Runs out of script with a 503.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, body: Value) {
        self.push(Scripted::Body(body));
    }

    pub fn fail(&self, status: StatusCode, body: impl Into<String>) {
        self.push(Scripted::Status(status, body.into()));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, response: Scripted) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(Scripted::Body(body)) => Ok(body),
            Some(Scripted::Status(status, body)) => Err(ApiError::Status { status, body }),
            None => Err(ApiError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "no scripted response".into(),
            }),
        }
    }
}
