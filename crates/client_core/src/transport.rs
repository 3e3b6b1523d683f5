//! HTTP request building, bearer injection and response interpretation.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Failure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
    Options,
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Bearer credential read from the auth slice.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// One outgoing call, relative to the API root.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub authenticated: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            authenticated: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn options(path: impl Into<String>) -> Self {
        Self::new(Method::Options, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn query_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Skips bearer injection for this request.
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut url = base.join(self.path.trim_start_matches('/'))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&ApiToken>,
    ) -> Result<ApiResponse, ClientError>;
}

pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        token: Option<&ApiToken>,
    ) -> Result<ApiResponse, ClientError> {
        let url = request.url(&self.base_url)?;
        debug!(method = ?request.method, %url, "api request");

        let mut builder = authorize(
            self.http.request(request.method.into(), url),
            request,
            token,
        );
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        let body = parse_body(status, &bytes)?;
        debug!(status, "api response");
        Ok(ApiResponse { status, body })
    }
}

/// Attaches `Authorization: Bearer <token>` when the request wants it and a
/// credential is available.
pub fn authorize(
    builder: RequestBuilder,
    request: &ApiRequest,
    token: Option<&ApiToken>,
) -> RequestBuilder {
    match token {
        Some(token) if request.authenticated => builder.bearer_auth(token.secret()),
        _ => builder,
    }
}

fn parse_body(status: u16, bytes: &[u8]) -> Result<Value, ClientError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|source| ClientError::MalformedBody { status, source })
}

/// Splits a response into its success body or the terminal failure.
pub fn interpret(response: ApiResponse) -> Result<Value, Failure> {
    if response.is_success() {
        Ok(response.body)
    } else {
        Err(Failure::from_response(response.status, &response.body))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::FailureKind;

    fn base() -> Url {
        Url::parse("http://api.test/v1/").expect("base url")
    }

    #[test]
    fn url_joins_under_api_prefix_with_query() {
        let request = ApiRequest::get("/lease/")
            .query("search", "Kallio 1")
            .query("page", 2)
            .query_opt("ordering", None::<String>);
        assert_eq!(
            request.url(&base()).expect("url").as_str(),
            "http://api.test/v1/lease/?search=Kallio+1&page=2"
        );
    }

    #[test]
    fn token_debug_hides_secret() {
        let token = ApiToken::new("s3cret");
        assert_eq!(format!("{token:?}"), "ApiToken(***)");
    }

    #[test]
    fn bearer_is_injected_only_for_authenticated_requests() {
        let http = Client::new();
        let token = ApiToken::new("abc");

        let request = ApiRequest::get("lease/");
        let built = authorize(http.get("http://api.test/"), &request, Some(&token))
            .build()
            .expect("request");
        assert_eq!(
            built.headers().get(reqwest::header::AUTHORIZATION).map(|v| v.to_str().ok()),
            Some(Some("Bearer abc"))
        );

        let anonymous = ApiRequest::get("lease/").anonymous();
        let built = authorize(http.get("http://api.test/"), &anonymous, Some(&token))
            .build()
            .expect("request");
        assert!(built.headers().get(reqwest::header::AUTHORIZATION).is_none());

        let built = authorize(http.get("http://api.test/"), &request, None)
            .build()
            .expect("request");
        assert!(built.headers().get(reqwest::header::AUTHORIZATION).is_none());
    }

    #[test]
    fn empty_body_reads_as_null() {
        assert_eq!(parse_body(204, b"").expect("empty"), Value::Null);
        assert_eq!(parse_body(200, b" \n").expect("blank"), Value::Null);
        assert!(matches!(
            parse_body(200, b"<html>"),
            Err(ClientError::MalformedBody { status: 200, .. })
        ));
    }

    #[test]
    fn interpret_dispatches_on_status() {
        assert_eq!(
            interpret(ApiResponse::new(201, json!({"id": 1}))).expect("created"),
            json!({"id": 1})
        );
        assert_eq!(
            interpret(ApiResponse::new(400, json!({"text": ["Required."]})))
                .expect_err("validation")
                .kind,
            FailureKind::Validation
        );
        assert_eq!(
            interpret(ApiResponse::new(404, Value::Null))
                .expect_err("missing")
                .kind,
            FailureKind::NotFound
        );
        assert_eq!(
            interpret(ApiResponse::new(502, Value::Null))
                .expect_err("server")
                .kind,
            FailureKind::Server
        );
    }
}
