use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::ApiResult;
use super::models::decode;
use super::transport::{ApiRequest, Transport};

pub const REGISTER_PATH: &str = "/api/user/register";
pub const LOGIN_PATH: &str = "/api/user/login";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// `{status, userId?, message?}` as returned by both account endpoints.
/// A rejected login is a successful call with `status = "error"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOutcome {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AuthOutcome {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Clone)]
pub struct UserClient {
    transport: Arc<dyn Transport>,
}

impl UserClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthOutcome> {
        let request = ApiRequest::post(REGISTER_PATH).json(request)?;
        decode(self.transport.send(request).await?)
    }

    pub async fn login(&self, username: &str, password: &str) -> ApiResult<AuthOutcome> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { username, password })?;
        decode(self.transport.send(request).await?)
    }
}
