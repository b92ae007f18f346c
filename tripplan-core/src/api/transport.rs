use std::fmt;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use super::error::{ApiError, ApiResult};
use crate::config::TripplanConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One backend call: method, path below the base url, query pairs in order
/// and an optional JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: &'static str,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: &'static str) -> Self {
        Self {
            method,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: &'static str) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: &'static str) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn delete(path: &'static str) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    /// Absent values are left out of the query string entirely.
    pub fn optional_query<V: Into<String>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> ApiResult<Self> {
        self.body = Some(serde_json::to_value(body).map_err(ApiError::Encode)?);
        Ok(self)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues the request and returns the decoded response body.
    async fn send(&self, request: ApiRequest) -> ApiResult<Value>;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn from_config(config: &TripplanConfig) -> ApiResult<Self> {
        let base_url = Url::parse(&config.backend.base_url)?;
        let mut headers = HeaderMap::new();
        for (name, value) in &config.backend.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|err| ApiError::InvalidHeader {
                    name: name.clone(),
                    reason: err.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|err| ApiError::InvalidHeader {
                    name: name.clone(),
                    reason: err.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }
        if let Some(token) = config.auth.token.as_deref().filter(|t| !t.is_empty()) {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|err| {
                ApiError::InvalidHeader {
                    name: AUTHORIZATION.to_string(),
                    reason: err.to_string(),
                }
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = Client::builder()
            .timeout(config.backend.timeout())
            .default_headers(headers);
        if let Some(agent) = &config.backend.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        Ok(Self::new(builder.build()?, base_url))
    }

    /// Resolves `request.path` below the base url, keeping any path prefix the
    /// base url carries.
    pub fn endpoint(&self, request: &ApiRequest) -> Url {
        let mut url = self.base_url.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{prefix}{}", request.path));
        url.set_query(None);
        url.set_fragment(None);
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(
                request
                    .query
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
        }
        url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<Value> {
        let url = self.endpoint(&request);
        debug!(target: "transport", method = %request.method, %url, "sending request");

        let mut builder = self.client.request(request.method.to_reqwest(), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            warn!(
                target: "transport",
                method = %request.method,
                path = request.path,
                %status,
                "backend returned error status"
            );
            return Err(ApiError::Status {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        decode_body(&bytes)
    }
}

fn decode_body(bytes: &[u8]) -> ApiResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(Client::new(), Url::parse(base).unwrap())
    }

    #[test]
    fn endpoint_joins_path_and_encodes_query() {
        let http = transport("http://localhost:8080");
        let request = ApiRequest::get("/api/planner/pois")
            .query("keywords", "west lake")
            .optional_query("city", Some("杭州"));
        let url = http.endpoint(&request);
        assert_eq!(url.path(), "/api/planner/pois");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("keywords".to_string(), "west lake".to_string()),
                ("city".to_string(), "杭州".to_string()),
            ]
        );
    }

    #[test]
    fn endpoint_keeps_base_prefix() {
        let http = transport("https://example.com/travel/");
        let url = http.endpoint(&ApiRequest::post("/api/itinerary/generate"));
        assert_eq!(
            url.as_str(),
            "https://example.com/travel/api/itinerary/generate"
        );
    }

    #[test]
    fn endpoint_without_query_has_no_question_mark() {
        let http = transport("http://localhost:8080");
        let request = ApiRequest::get("/api/itinerary/list").optional_query::<String>("userId", None);
        let url = http.endpoint(&request);
        assert_eq!(url.query(), None);
    }

    #[test]
    fn empty_body_decodes_to_null() {
        assert_eq!(decode_body(b"").unwrap(), Value::Null);
        assert_eq!(decode_body(b"  \n").unwrap(), Value::Null);
        assert!(matches!(decode_body(b"<html>"), Err(ApiError::Decode(_))));
    }

    #[test]
    fn from_config_rejects_bad_header() {
        let mut config = TripplanConfig::for_base_url("http://localhost:8080");
        config
            .backend
            .headers
            .insert("bad header".into(), "value".into());
        let err = HttpTransport::from_config(&config).unwrap_err();
        assert!(matches!(err, ApiError::InvalidHeader { .. }));
    }
}
