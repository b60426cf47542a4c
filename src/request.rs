use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::encode::{RequestBody, RequestDescriptor};
use crate::error::{Result, WebhookError};

/// The response as discord sent it. Returned untouched to the caller
/// whenever the request didn't succeed, since reqwest would otherwise throw
/// the body away.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub url: Url,
    pub body: String,
}

/// Executes request descriptors. The only seam between the library and the
/// network.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: RequestDescriptor) -> std::result::Result<RawResponse, reqwest::Error>;
}

pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().default_headers(request_default_headers(user_agent)?);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSender for ReqwestSender {
    async fn send(&self, request: RequestDescriptor) -> std::result::Result<RawResponse, reqwest::Error> {
        let builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.body(body),
            RequestBody::Multipart(body) => builder.multipart(body.into_form()?),
        };
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().clone();
        let body = response.text().await?;
        Ok(RawResponse { status, url, body })
    }
}

/// Decodes a response. `204 No Content` is a success without a body and
/// comes back as `None`, any other failing status is handed back raw.
pub fn parse_response<T: DeserializeOwned>(response: RawResponse) -> Result<Option<T>> {
    if !response.status.is_success() {
        error!(
            "Webhook request failed with {}: {}",
            response.status, response.body
        );
        return Err(WebhookError::Remote(response));
    }
    if response.status == StatusCode::NO_CONTENT || response.body.trim().is_empty() {
        debug!("Webhook responded with {} and no body", response.status);
        return Ok(None);
    }
    serde_json::from_str::<T>(&response.body)
        .map(Some)
        .map_err(|_error| {
            error!("Failed to parse response from {}", response.url.path());
            WebhookError::UnexpectedBody(response)
        })
}

/// Like [`parse_response`] but for endpoints that always answer with a body
pub fn parse_successful_response<T: DeserializeOwned>(response: RawResponse) -> Result<T> {
    let fallback = response.clone();
    parse_response(response)?.ok_or(WebhookError::UnexpectedBody(fallback))
}

/// For endpoints where only the status matters
pub fn expect_success(response: RawResponse) -> Result<()> {
    if response.status.is_success() {
        Ok(())
    } else {
        error!(
            "Webhook request failed with {}: {}",
            response.status, response.body
        );
        Err(WebhookError::Remote(response))
    }
}

pub fn request_default_headers(user_agent: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent).map_err(|_| WebhookError::InvalidHeader("user-agent"))?,
    );
    Ok(headers)
}
