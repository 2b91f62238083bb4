use crate::error::{MissiveError, Result};
use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_BASE_URL: &str = "https://public.missiveapp.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(value: HttpMethod) -> Self {
        match value {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        })
    }
}

/// What the caller gets back once the call succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseShape {
    /// The remote JSON body.
    Forward,
    /// A synthetic `{"success": true}`, for endpoints with empty replies.
    Success,
}

/// A fully routed call, minus the base URL and credentials.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestEnvelope {
    pub method: HttpMethod,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    pub response: ResponseShape,
}

impl RequestEnvelope {
    fn new(method: HttpMethod, path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body,
            response: ResponseShape::Forward,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, None)
    }

    /// POST with the body wrapped under `wrapper` (`{"drafts": {...}}`).
    pub fn post(path: impl Into<String>, wrapper: &str, body: Value) -> Self {
        Self::new(HttpMethod::Post, path, Some(wrap(wrapper, body)))
    }

    pub fn put(path: impl Into<String>, wrapper: &str, body: Value) -> Self {
        Self::new(HttpMethod::Put, path, Some(wrap(wrapper, body)))
    }

    pub fn delete(path: impl Into<String>) -> Self {
        let mut envelope = Self::new(HttpMethod::Delete, path, None);
        envelope.response = ResponseShape::Success;
        envelope
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

fn wrap(key: &str, body: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), body);
    Value::Object(map)
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    api_token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, api_token: &str) -> anyhow::Result<Self> {
        Url::parse(base_url).context("parsing base URL")?;
        let http = Client::builder()
            .user_agent(HeaderValue::from_static("missivectl/0.1"))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            api_token: api_token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send one routed request and shape its response.
    pub fn send(&self, envelope: &RequestEnvelope) -> Result<Value> {
        debug!(method = %envelope.method, path = %envelope.path, "sending Missive request");
        if let Some(body) = &envelope.body {
            trace!(body = %body, "request body");
        }

        let mut request = self
            .http
            .request(envelope.method.into(), self.url_for(&envelope.path))
            .bearer_auth(&self.api_token)
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        if !envelope.query.is_empty() {
            request = request.query(&envelope.query);
        }

        // `.json()` also sets Content-Type; body-less calls carry none.
        if let Some(body) = &envelope.body {
            request = request.json(body);
        }

        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;
        debug!(status = status.as_u16(), "Missive responded");

        if !status.is_success() {
            return Err(MissiveError::RemoteApi {
                status: status.as_u16(),
                body: text,
            });
        }

        match envelope.response {
            ResponseShape::Success => Ok(json!({ "success": true })),
            ResponseShape::Forward if text.trim().is_empty() => Ok(json!({})),
            ResponseShape::Forward => {
                Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
            }
        }
    }

    /// The request as it would go over the wire, with the token masked.
    pub fn preview(&self, envelope: &RequestEnvelope) -> Value {
        let mut headers = Map::new();
        headers.insert("Authorization".into(), json!("Bearer *****"));
        headers.insert("Accept".into(), json!("application/json"));
        if envelope.body.is_some() {
            headers.insert("Content-Type".into(), json!("application/json"));
        }

        let mut preview = Map::new();
        preview.insert("method".into(), json!(envelope.method));
        preview.insert("url".into(), json!(self.url_for(&envelope.path)));
        preview.insert("headers".into(), Value::Object(headers));
        if !envelope.query.is_empty() {
            let query: Map<String, Value> = envelope
                .query
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            preview.insert("query".into(), Value::Object(query));
        }
        if let Some(body) = &envelope.body {
            preview.insert("body".into(), body.clone());
        }
        Value::Object(preview)
    }
}
