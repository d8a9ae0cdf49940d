use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("skillmatch-api/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const REPOS_PER_PAGE: u8 = 20;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Invalid GitHub access token")]
    InvalidToken,

    #[error("GitHub API error (status {0})")]
    Api(u16),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One repository as the hosting API reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRepository {
    pub name: String,
    pub html_url: String,
    pub updated_at: DateTime<Utc>,
    pub language: Option<String>,
}

/// Source of an applicant's code repositories, given an already-resolved
/// access token.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    async fn recent_repositories(&self, access_token: &str) -> Result<Vec<RemoteRepository>, GitHubError>;
}

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
}

impl GitHubClient {
    pub fn new() -> Result<Self, GitHubError> {
        Ok(Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()?,
            base_url: GITHUB_API_BASE.to_string(),
        })
    }
}

#[async_trait]
impl RepositoryHost for GitHubClient {
    /// The 20 most recently updated repositories of the token's owner.
    async fn recent_repositories(&self, access_token: &str) -> Result<Vec<RemoteRepository>, GitHubError> {
        let response = self
            .client
            .get(format!("{}/user/repos", self.base_url))
            .query(&[("sort", "updated"), ("per_page", &REPOS_PER_PAGE.to_string())])
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json")
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(GitHubError::InvalidToken),
            status if !status.is_success() => return Err(GitHubError::Api(status.as_u16())),
            _ => {}
        }

        let repos: Vec<RemoteRepository> = response.json().await?;
        debug!(count = repos.len(), "Fetched GitHub repositories");
        Ok(repos)
    }
}
