// SPDX-FileCopyrightText: 2026 Vidra Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini REST API.
//!
//! Provides [`GeminiClient`] which handles request construction,
//! authentication and error body decoding. The API key lives behind an
//! [`ArcSwapOption`] so a key entered at runtime applies to every clone of
//! the client without rebuilding it.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use vidra_config::model::GeminiConfig;
use vidra_core::VidraError;

use crate::types::ApiErrorResponse;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Message used when a request is attempted before any key is known.
pub const MISSING_KEY_MESSAGE: &str = "401 UNAUTHENTICATED: no API key configured";

/// HTTP client for Gemini API communication.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Arc<ArcSwapOption<String>>,
    base_url: String,
}

impl GeminiClient {
    /// Creates a client from the `[gemini]` config section.
    ///
    /// A missing key is not an error here; requests fail with an
    /// unauthenticated error until [`set_api_key`](Self::set_api_key) is called.
    pub fn new(config: &GeminiConfig) -> Result<Self, VidraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| VidraError::Generation {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .map(Arc::new);

        Ok(Self {
            http,
            api_key: Arc::new(ArcSwapOption::new(key)),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replaces the API key for this client and all of its clones.
    pub fn set_api_key(&self, key: impl Into<String>) {
        let key = key.into();
        if key.is_empty() {
            self.api_key.store(None);
        } else {
            self.api_key.store(Some(Arc::new(key)));
        }
        debug!("gemini API key updated");
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.load().is_some()
    }

    /// Full URL for a path relative to the API base.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POSTs `body` to `path` and decodes the JSON response.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, VidraError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let request = self.authorized(self.http.post(self.url(path)))?.json(body);
        let response = send(request).await?;
        decode(response).await
    }

    /// GETs `path` and decodes the JSON response.
    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, VidraError> {
        let request = self.authorized(self.http.get(self.url(path)))?;
        let response = send(request).await?;
        decode(response).await
    }

    /// Downloads an absolute URI with the API key attached.
    ///
    /// Returns the body and the response content type, if any.
    pub async fn download(&self, uri: &str) -> Result<(Vec<u8>, Option<String>), VidraError> {
        let request = self.authorized(self.http.get(uri))?;
        let response = send(request).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(|e| VidraError::Generation {
            message: format!("failed to read media body: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok((bytes.to_vec(), content_type))
    }

    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, VidraError> {
        let guard = self.api_key.load();
        let key = guard
            .as_deref()
            .ok_or_else(|| VidraError::generation(MISSING_KEY_MESSAGE))?;
        let value = HeaderValue::from_str(key)
            .map_err(|e| VidraError::Config(format!("invalid API key header value: {e}")))?;
        Ok(request.header(API_KEY_HEADER, value))
    }
}

/// Sends the request and turns non-2xx responses into generation errors.
async fn send(request: RequestBuilder) -> Result<Response, VidraError> {
    let response = request.send().await.map_err(|e| VidraError::Generation {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    })?;

    let status = response.status();
    debug!(status = %status, url = %response.url(), "gemini response received");

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
        Ok(api_err) => api_err.error.to_string(),
        Err(_) => format!("{} {}", status.as_u16(), body.trim()),
    };
    Err(VidraError::generation(message))
}

async fn decode<R: DeserializeOwned>(response: Response) -> Result<R, VidraError> {
    let body = response.text().await.map_err(|e| VidraError::Generation {
        message: format!("failed to read response body: {e}"),
        source: Some(Box::new(e)),
    })?;
    serde_json::from_str(&body).map_err(|e| VidraError::Generation {
        message: format!("failed to parse API response: {e}"),
        source: Some(Box::new(e)),
    })
}
