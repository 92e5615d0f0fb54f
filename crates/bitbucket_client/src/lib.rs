//! Crate for interacting with the Bitbucket Server REST API.
//!
//! This crate provides a client for making authenticated requests against the
//! repository-scoped content endpoints of a Bitbucket Server instance
//! (`/rest/api/1.0/projects/{project}/repos/{slug}/...`): creating tags and
//! branches, opening and merging pull requests, and updating file content.
//!
//! The client is built once from a validated [`ServerConfig`] and holds a
//! pooled HTTP connection; it is cheap to share and safe to use from
//! concurrent tasks. Every operation is a single attempt: there are no
//! retries, no request queuing, and no caching of server state.

use std::path::Path;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

pub mod config;
pub use config::ServerConfig;

pub mod errors;
pub use errors::Error;

pub mod models;
pub use models::{Branch, FileUpdate, PullRequest, PullRequestMergeState, Tag};

mod http;
mod request;
mod response;

use request::ApiRequest;
use reqwest::Method;

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// The content operations the client offers to its callers.
///
/// The trait is the seam between the HTTP client and the host framework that
/// drives it: step execution code depends on this trait so tests can record
/// calls without a server. All methods take the project key and repository
/// slug explicitly; results are the server's JSON payload, normalized so that
/// an empty response body becomes an empty object.
#[async_trait]
pub trait ContentOperations: Send + Sync {
    /// Creates a tag at the given start point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] before any request is sent when the tag
    /// name or start point is empty.
    async fn create_tag(&self, project: &str, repo_slug: &str, tag: &Tag) -> Result<Value, Error>;

    /// Lists the tags of the repository.
    async fn get_tags(&self, project: &str, repo_slug: &str) -> Result<Value, Error>;

    /// Creates a branch at the given start point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] before any request is sent when the
    /// branch name or start point is empty.
    async fn create_branch(
        &self,
        project: &str,
        repo_slug: &str,
        branch: &Branch,
    ) -> Result<Value, Error>;

    /// Opens a pull request from one ref to another within the repository.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] before any request is sent when either
    /// ref is empty. Title and description pass through verbatim.
    async fn create_pull_request(
        &self,
        project: &str,
        repo_slug: &str,
        pull_request: &PullRequest,
    ) -> Result<Value, Error>;

    /// Fetches the details of a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `pull_request_id` is zero.
    async fn get_pull_request(
        &self,
        project: &str,
        repo_slug: &str,
        pull_request_id: u64,
    ) -> Result<Value, Error>;

    /// Merges a pull request using the server's optimistic-concurrency
    /// protocol.
    ///
    /// The current `version` and advisory `canMerge` flag are fetched first;
    /// the merge request echoes the observed version so the server can reject
    /// a stale merge. When the server says the merge cannot be performed, no
    /// merge request is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] when the server's advisory flag forbids
    /// the merge, and [`Error::RequestFailed`] when the details payload
    /// carries no version or the merge itself is rejected (for example
    /// because the version went stale). The caller decides whether to retry
    /// the whole protocol; the client never does so on its own.
    async fn merge_pull_request(
        &self,
        project: &str,
        repo_slug: &str,
        pull_request_id: u64,
    ) -> Result<Value, Error>;

    /// Updates a file's content on a branch.
    ///
    /// The upload source is `workspace`/`update.file`. When the update does
    /// not declare a source commit, the branch head is resolved first so the
    /// server can detect concurrent modification; an empty commit history is
    /// not an error and the file is created fresh on the branch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] before any request is sent when the
    /// file, message, or branch is empty, and [`Error::FileRead`] when the
    /// upload source cannot be read.
    async fn update_file(
        &self,
        project: &str,
        repo_slug: &str,
        update: &FileUpdate,
        workspace: &Path,
    ) -> Result<Value, Error>;
}

/// A client for the content endpoints of one Bitbucket Server instance.
///
/// Holds the pooled HTTP client built from the configuration; create it once
/// per server and reuse it for every operation, otherwise the connection pool
/// is lost.
///
/// # Examples
///
/// ```rust,no_run
/// use bitbucket_client::{BitbucketClient, ContentOperations, ServerConfig, Tag};
///
/// # async fn example() -> Result<(), bitbucket_client::Error> {
/// let config = ServerConfig::new(
///     "https://bitbucket.example.com",
///     "builder",
///     "s3cret",
///     30,
///     4,
///     false,
/// )?;
/// let client = BitbucketClient::new(config)?;
///
/// let tag = Tag {
///     name: "v1.4.0".to_string(),
///     message: "release 1.4.0".to_string(),
///     start_point: "refs/heads/main".to_string(),
/// };
/// let created = client.create_tag("PROJ", "my-repo", &tag).await?;
/// println!("created: {created}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BitbucketClient {
    config: ServerConfig,
    http: reqwest::Client,
}

impl BitbucketClient {
    /// Builds a client for the given server configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] when the underlying HTTP client cannot be
    /// constructed (for example when the TLS backend fails to initialize).
    pub fn new(config: ServerConfig) -> Result<Self, Error> {
        let http = http::build_client(&config)?;
        Ok(Self { config, http })
    }

    /// Returns the configuration this client was built from.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Sends one request and interprets the response.
    async fn send(&self, request: ApiRequest) -> Result<Value, Error> {
        let builder = request.into_builder(&self.http, &self.config)?;
        let response = builder.send().await.map_err(Error::Transport)?;
        response::interpret(response).await
    }

    /// Fetches the commit the branch currently points at, if any.
    ///
    /// Used by `update_file` when the caller does not know the expected
    /// parent commit. An empty history yields `None`: the update then writes
    /// the file with no known ancestor, which the server accepts for new
    /// files.
    async fn resolve_source_commit(
        &self,
        project: &str,
        repo_slug: &str,
        branch: &str,
    ) -> Result<Option<String>, Error> {
        let history = self
            .send(
                ApiRequest::new(Method::GET, project, repo_slug, "commits")
                    .query("until", branch)
                    .query("limit", "0")
                    .query("start", "0"),
            )
            .await?;

        let commits = history
            .get("values")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::RequestFailed {
                status: 200,
                message: "error retrieving current commit ID".to_string(),
            })?;

        match commits.first() {
            None => {
                info!(branch, "branch has no commit history, writing without ancestor");
                Ok(None)
            }
            Some(head) => head
                .get("id")
                .and_then(Value::as_str)
                .map(|id| Some(id.to_string()))
                .ok_or_else(|| Error::RequestFailed {
                    status: 200,
                    message: "error retrieving current commit ID".to_string(),
                }),
        }
    }
}

#[async_trait]
impl ContentOperations for BitbucketClient {
    #[instrument(skip(self, tag), fields(project = %project, repo_slug = %repo_slug, name = %tag.name))]
    async fn create_tag(&self, project: &str, repo_slug: &str, tag: &Tag) -> Result<Value, Error> {
        if tag.name.is_empty() {
            return Err(Error::empty_field("name"));
        }
        if tag.start_point.is_empty() {
            return Err(Error::empty_field("startPoint"));
        }

        debug!("creating tag");
        self.send(
            ApiRequest::new(Method::POST, project, repo_slug, "tags")
                .json(serde_json::to_value(tag).map_err(|source| Error::Protocol { source })?),
        )
        .await
    }

    #[instrument(skip(self), fields(project = %project, repo_slug = %repo_slug))]
    async fn get_tags(&self, project: &str, repo_slug: &str) -> Result<Value, Error> {
        self.send(ApiRequest::new(Method::GET, project, repo_slug, "tags"))
            .await
    }

    #[instrument(skip(self, branch), fields(project = %project, repo_slug = %repo_slug, name = %branch.name))]
    async fn create_branch(
        &self,
        project: &str,
        repo_slug: &str,
        branch: &Branch,
    ) -> Result<Value, Error> {
        if branch.name.is_empty() {
            return Err(Error::empty_field("name"));
        }
        if branch.start_point.is_empty() {
            return Err(Error::empty_field("startPoint"));
        }

        debug!("creating branch");
        self.send(
            ApiRequest::new(Method::POST, project, repo_slug, "branches")
                .json(serde_json::to_value(branch).map_err(|source| Error::Protocol { source })?),
        )
        .await
    }

    #[instrument(skip(self, pull_request), fields(project = %project, repo_slug = %repo_slug))]
    async fn create_pull_request(
        &self,
        project: &str,
        repo_slug: &str,
        pull_request: &PullRequest,
    ) -> Result<Value, Error> {
        if pull_request.from.is_empty() {
            return Err(Error::empty_field("from"));
        }
        if pull_request.to.is_empty() {
            return Err(Error::empty_field("to"));
        }

        let repository = json!({
            "slug": repo_slug,
            "name": "",
            "project": { "key": project }
        });
        let body = json!({
            "title": pull_request.title.clone(),
            "description": pull_request.description.clone(),
            "state": "OPEN",
            "open": true,
            "closed": false,
            "locked": false,
            "fromRef": { "id": pull_request.from.clone(), "repository": repository.clone() },
            "toRef": { "id": pull_request.to.clone(), "repository": repository },
            "reviewers": []
        });

        debug!(from = %pull_request.from, to = %pull_request.to, "creating pull request");
        self.send(ApiRequest::new(Method::POST, project, repo_slug, "pull-requests").json(body))
            .await
    }

    #[instrument(skip(self), fields(project = %project, repo_slug = %repo_slug, pull_request_id))]
    async fn get_pull_request(
        &self,
        project: &str,
        repo_slug: &str,
        pull_request_id: u64,
    ) -> Result<Value, Error> {
        if pull_request_id == 0 {
            return Err(Error::Validation {
                field: "pull_request_id",
                message: "the pull request id must be a positive number".to_string(),
            });
        }

        self.send(ApiRequest::new(
            Method::GET,
            project,
            repo_slug,
            format!("pull-requests/{pull_request_id}"),
        ))
        .await
    }

    #[instrument(skip(self), fields(project = %project, repo_slug = %repo_slug, pull_request_id))]
    async fn merge_pull_request(
        &self,
        project: &str,
        repo_slug: &str,
        pull_request_id: u64,
    ) -> Result<Value, Error> {
        let details = self
            .get_pull_request(project, repo_slug, pull_request_id)
            .await?;
        let state = PullRequestMergeState::from_details(pull_request_id, &details)?;

        if !state.can_merge {
            return Err(Error::Conflict {
                message: format!(
                    "Automated merge not possible for pull request with ID {pull_request_id}"
                ),
            });
        }

        info!(version = state.version, "merging pull request at observed version");
        self.send(
            ApiRequest::new(
                Method::POST,
                project,
                repo_slug,
                format!("pull-requests/{pull_request_id}/merge"),
            )
            .query("version", state.version.to_string())
            .json(json!({})),
        )
        .await
    }

    #[instrument(skip(self, update, workspace), fields(project = %project, repo_slug = %repo_slug, file = %update.file))]
    async fn update_file(
        &self,
        project: &str,
        repo_slug: &str,
        update: &FileUpdate,
        workspace: &Path,
    ) -> Result<Value, Error> {
        if update.file.is_empty() {
            return Err(Error::empty_field("file"));
        }
        if update.message.is_empty() {
            return Err(Error::empty_field("message"));
        }
        if update.branch.is_empty() {
            return Err(Error::empty_field("branch"));
        }

        let source_commit = match update.declared_source_commit() {
            Some(id) => Some(id.to_string()),
            None => {
                self.resolve_source_commit(project, repo_slug, &update.branch)
                    .await?
            }
        };

        let mut fields = vec![
            ("message".to_string(), update.message.clone()),
            ("branch".to_string(), update.branch.clone()),
        ];
        if let Some(id) = &source_commit {
            fields.push(("sourceCommitId".to_string(), id.clone()));
        }

        let source_path = workspace.join(&update.file);
        let form = request::file_upload_form("content", &source_path, fields).await?;

        debug!(source_commit = ?source_commit, "uploading file content");
        self.send(
            ApiRequest::new(
                Method::PUT,
                project,
                repo_slug,
                format!("browse/{}", update.file),
            )
            .multipart(form),
        )
        .await
    }
}
