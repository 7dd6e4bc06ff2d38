//! Read access to repository files through the GitHub contents API.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// `owner/name` coordinate of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoCoordinate {
    pub owner: String,
    pub name: String,
}

impl RepoCoordinate {
    pub fn new<O: Into<String>, N: Into<String>>(owner: O, name: N) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoCoordinate {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(RepoCoordinate::new(owner, name))
            }
            _ => Err(format!(
                "invalid repository '{}'; expected OWNER/NAME",
                value
            )),
        }
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

fn default_entry_kind() -> String {
    "file".to_string()
}

impl DirectoryEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Server returned status {status} for {url}")]
    StatusError { status: u16, url: String },
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl From<ContentError> for AppError {
    fn from(err: ContentError) -> Self {
        let category = match err {
            ContentError::DeserializationError(_) => ErrorCategory::DecodeError,
            ContentError::NetworkError(_) | ContentError::StatusError { .. } => {
                ErrorCategory::FetchError
            }
        };
        AppError::with_source(category, err.to_string(), err)
    }
}

/// Repository content collaborator consumed by the loader and resolver.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn list_directory(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>, ContentError>;

    /// Raw bytes of a file; `git_ref` of `None` reads the default branch.
    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Vec<u8>, ContentError>;
}

#[derive(Debug, Deserialize)]
struct FileContents {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
    #[serde(default)]
    download_url: Option<String>,
}

/// [`ContentSource`] backed by the GitHub REST API.
pub struct GithubContentSource {
    client: reqwest::Client,
    api_url: String,
}

impl GithubContentSource {
    /// Anonymous when `token` is `None`.
    pub fn new(api_url: &str, token: Option<&str>) -> Result<Self, AppError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|err| {
                AppError::new(
                    ErrorCategory::ValidationError,
                    format!("github token is not a valid header value: {}", err),
                )
            })?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("fsb/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|err| {
                AppError::with_source(
                    ErrorCategory::InternalError,
                    "failed to build http client",
                    err,
                )
            })?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url,
            owner,
            repo,
            path.trim_start_matches('/')
        )
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, ContentError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ContentError::NetworkError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ContentError::StatusError {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ContentSource for GithubContentSource {
    async fn list_directory(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<DirectoryEntry>, ContentError> {
        let url = self.contents_url(owner, repo, path);
        self.get(&url, &[])
            .await?
            .json::<Vec<DirectoryEntry>>()
            .await
            .map_err(|e| ContentError::DeserializationError(e.to_string()))
    }

    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: Option<&str>,
    ) -> Result<Vec<u8>, ContentError> {
        let url = self.contents_url(owner, repo, path);
        let query: Vec<(&str, &str)> = git_ref.map(|r| vec![("ref", r)]).unwrap_or_default();
        let contents: FileContents = self
            .get(&url, &query)
            .await?
            .json()
            .await
            .map_err(|e| ContentError::DeserializationError(e.to_string()))?;

        match contents.encoding.as_str() {
            "base64" => {
                let packed: String = contents
                    .content
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect();
                base64::engine::general_purpose::STANDARD
                    .decode(packed)
                    .map_err(|e| ContentError::DeserializationError(e.to_string()))
            }
            // Files over 1MB come back without inline content.
            _ => match contents.download_url {
                Some(download_url) => self
                    .get(&download_url, &[])
                    .await?
                    .bytes()
                    .await
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| ContentError::NetworkError(e.to_string())),
                None => Err(ContentError::DeserializationError(format!(
                    "unsupported content encoding '{}' for {}",
                    contents.encoding, path
                ))),
            },
        }
    }
}
