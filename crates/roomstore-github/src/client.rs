//! GitHub Contents API client.
//!
//! `GET|PUT|DELETE /repos/{owner}/{repo}/contents/{path}`; blob content is
//! base64 in both directions.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use roomstore_core::StoreError;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::GitHubConfig;

/// One item of a contents response.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentItem {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub size: u64,
    /// Base64 payload (files only; empty for files above the inline limit)
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// A directory answers with an array, a file with a single object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Contents {
    Dir(Vec<ContentItem>),
    File(Box<ContentItem>),
}

#[derive(Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteContentsRequest<'a> {
    message: &'a str,
    sha: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    content: ContentItem,
}

/// Outcome of a successful PUT.
#[derive(Debug, Clone)]
pub struct PutResult {
    pub created: bool,
    pub sha: String,
}

/// HTTP client for one repository's Contents API.
pub struct GitHubClient {
    http: Client,
    config: GitHubConfig,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("room-finder"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );

        let http = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Fetch the contents at `path`. `None` when the path does not exist.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_contents(&self, path: &str) -> Result<Option<Contents>, StoreError> {
        let url = self.config.contents_url(path);

        let response = self
            .config
            .retry
            .send(|| {
                let builder = self.request(Method::GET, &url);
                match &self.config.branch {
                    Some(branch) => builder.query(&[("ref", branch.as_str())]),
                    None => builder,
                }
            })
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("GitHub path not found: {}", path);
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(format!("Failed to read GitHub response: {}", e)))?;

        if !status.is_success() {
            return Err(error_for_status(status, &body, path));
        }

        let contents: Contents = serde_json::from_str(&body)
            .map_err(|e| StoreError::Decode(format!("Unexpected contents response for {}: {}", path, e)))?;
        Ok(Some(contents))
    }

    /// Download raw bytes from a `download_url`.
    #[instrument(skip(self), level = "debug")]
    pub async fn download_raw(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .config
            .retry
            .send(|| self.request(Method::GET, url))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body, url));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(format!("Failed to read download: {}", e)))?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }

    /// Create (no `sha`) or update (current `sha`) a file.
    #[instrument(skip(self, encoded_content), level = "debug", fields(data_len = encoded_content.len()))]
    pub async fn put_contents(
        &self,
        path: &str,
        encoded_content: String,
        message: &str,
        sha: Option<&str>,
    ) -> Result<PutResult, StoreError> {
        let url = self.config.contents_url(path);
        let body = PutContentsRequest {
            message,
            content: encoded_content,
            sha,
            branch: self.config.branch.as_deref(),
        };

        let response = self
            .config
            .retry
            .send(|| self.request(Method::PUT, &url).json(&body))
            .await?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Transport(format!("Failed to read GitHub response: {}", e)))?;

        if status != StatusCode::OK && status != StatusCode::CREATED {
            return Err(error_for_status(status, &text, path));
        }

        let parsed: PutContentsResponse = serde_json::from_str(&text)
            .map_err(|e| StoreError::Decode(format!("Unexpected PUT response for {}: {}", path, e)))?;

        debug!("PUT {} -> {}", path, status);
        Ok(PutResult {
            created: status == StatusCode::CREATED,
            sha: parsed.content.sha,
        })
    }

    /// Delete a file at its current `sha`.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_contents(&self, path: &str, sha: &str, message: &str) -> Result<(), StoreError> {
        let url = self.config.contents_url(path);
        let body = DeleteContentsRequest {
            message,
            sha,
            branch: self.config.branch.as_deref(),
        };

        let response = self
            .config
            .retry
            .send(|| self.request(Method::DELETE, &url).json(&body))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &text, path));
        }

        debug!("DELETE {}", path);
        Ok(())
    }
}

/// Map a non-success status to a `StoreError`.
pub fn error_for_status(status: StatusCode, body: &str, path: &str) -> StoreError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED => StoreError::Unauthorized(message),
        StatusCode::FORBIDDEN if message.to_lowercase().contains("rate limit") => {
            StoreError::RateLimited(message)
        }
        StatusCode::FORBIDDEN => StoreError::Unauthorized(message),
        StatusCode::NOT_FOUND => StoreError::NotFound(path.to_string()),
        StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            StoreError::Conflict(format!("{}: {}", path, message))
        }
        StatusCode::TOO_MANY_REQUESTS => StoreError::RateLimited(message),
        _ => StoreError::Remote {
            status: status.as_u16(),
            message,
        },
    }
}
