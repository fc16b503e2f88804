use std::fmt;

use crate::retry::RetryPolicy;

/// Public GitHub REST endpoint.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Connection settings for one GitHub repository.
#[derive(Clone)]
pub struct GitHubConfig {
    /// API root, without trailing slash
    pub api_url: String,
    /// `owner/name`
    pub repository: String,
    /// Branch to read from and commit to (repository default when unset)
    pub branch: Option<String>,
    /// Access token; requests are sent unauthenticated when unset
    pub token: Option<String>,
    pub retry: RetryPolicy,
}

impl GitHubConfig {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            repository: repository.into(),
            branch: None,
            token: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Contents API URL for a repository path. Each segment is percent-encoded.
    pub fn contents_url(&self, path: &str) -> String {
        let encoded = path
            .trim_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        if encoded.is_empty() {
            format!("{}/repos/{}/contents", self.api_url, self.repository)
        } else {
            format!("{}/repos/{}/contents/{}", self.api_url, self.repository, encoded)
        }
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_url", &self.api_url)
            .field("repository", &self.repository)
            .field("branch", &self.branch)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("retry", &self.retry)
            .finish()
    }
}
