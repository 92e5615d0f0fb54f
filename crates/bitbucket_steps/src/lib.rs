//! # Bitbucket Steps
//!
//! This crate turns declarative step definitions into calls against a Bitbucket
//! Server repository. A step arrives as a JSON object whose `step` field names
//! the operation, e.g.
//!
//! ```json
//! { "step": "createTag", "project": "PROJ", "repoSlug": "my-repo",
//!   "name": "v1.0.0", "message": "release", "startPoint": "refs/heads/main" }
//! ```
//!
//! Steps are parsed into [`StepRequest`] values and executed through the
//! [`ContentOperations`] trait from `bitbucket_client`, so callers can run them
//! against a live server or a test double.
//!
//! ## Examples
//!
//! ```no_run
//! use bitbucket_client::{BitbucketClient, ServerConfig};
//! use bitbucket_steps::{execute, StepRequest};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::new(
//!     "https://bitbucket.example.com",
//!     "builder",
//!     "s3cret",
//!     30,
//!     4,
//!     false,
//! )?;
//! let client = BitbucketClient::new(config)?;
//!
//! let step = StepRequest::parse(
//!     r#"{ "step": "getTags", "project": "PROJ", "repoSlug": "my-repo" }"#,
//! )?;
//! let tags = execute(step, &client, Path::new(".")).await?;
//! println!("{tags}");
//! # Ok(())
//! # }
//! ```

use bitbucket_client::{Branch, ContentOperations, FileUpdate, PullRequest, Tag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{info, instrument};

pub mod errors;
pub use errors::Error;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// A single declarative operation against a Bitbucket Server repository.
///
/// The wire format is an internally tagged JSON object: the `step` field
/// selects the variant and the remaining fields are that operation's
/// arguments, all camel-cased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum StepRequest {
    /// Create a tag on the repository.
    #[serde(rename_all = "camelCase")]
    CreateTag {
        project: String,
        repo_slug: String,
        name: String,
        message: String,
        start_point: String,
    },

    /// List the tags of the repository.
    #[serde(rename_all = "camelCase")]
    GetTags { project: String, repo_slug: String },

    /// Create a branch on the repository.
    #[serde(rename_all = "camelCase")]
    CreateBranch {
        project: String,
        repo_slug: String,
        name: String,
        message: String,
        start_point: String,
    },

    /// Open a pull request between two refs of the repository.
    #[serde(rename_all = "camelCase")]
    CreatePullRequest {
        project: String,
        repo_slug: String,
        title: String,
        description: String,
        from: String,
        to: String,
    },

    /// Merge an open pull request.
    #[serde(rename_all = "camelCase")]
    MergePullRequest {
        project: String,
        repo_slug: String,
        pull_request_id: u64,
    },

    /// Upload a workspace file as a new commit on a branch.
    #[serde(rename_all = "camelCase")]
    UpdateFile {
        project: String,
        repo_slug: String,
        file: String,
        branch: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_commit_id: Option<String>,
    },
}

impl StepRequest {
    /// Parses a step definition from its JSON text form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Definition`] when the text is not valid JSON or does
    /// not match any known step shape.
    pub fn parse(definition: &str) -> Result<Self, Error> {
        serde_json::from_str(definition).map_err(|source| Error::Definition { source })
    }

    /// The wire name of the step, as it appears in the `step` field.
    pub fn kind(&self) -> &'static str {
        match self {
            StepRequest::CreateTag { .. } => "createTag",
            StepRequest::GetTags { .. } => "getTags",
            StepRequest::CreateBranch { .. } => "createBranch",
            StepRequest::CreatePullRequest { .. } => "createPullRequest",
            StepRequest::MergePullRequest { .. } => "mergePullRequest",
            StepRequest::UpdateFile { .. } => "updateFile",
        }
    }
}

/// Runs a single step against the given operations implementation.
///
/// `workspace` is the directory that relative file paths in [`StepRequest::UpdateFile`]
/// are resolved against. The raw JSON response of the underlying request is
/// returned so callers can inspect server-assigned identifiers.
///
/// # Errors
///
/// Returns [`Error::Step`] wrapping the client error when the operation fails,
/// with the wire name of the step attached.
#[instrument(skip(step, ops, workspace), fields(step = step.kind()))]
pub async fn execute(
    step: StepRequest,
    ops: &dyn ContentOperations,
    workspace: &Path,
) -> Result<Value, Error> {
    let kind = step.kind();
    info!("executing step");

    let result = match step {
        StepRequest::CreateTag {
            project,
            repo_slug,
            name,
            message,
            start_point,
        } => {
            let tag = Tag {
                name,
                message,
                start_point,
            };
            ops.create_tag(&project, &repo_slug, &tag).await
        }
        StepRequest::GetTags { project, repo_slug } => ops.get_tags(&project, &repo_slug).await,
        StepRequest::CreateBranch {
            project,
            repo_slug,
            name,
            message,
            start_point,
        } => {
            let branch = Branch {
                name,
                message,
                start_point,
            };
            ops.create_branch(&project, &repo_slug, &branch).await
        }
        StepRequest::CreatePullRequest {
            project,
            repo_slug,
            title,
            description,
            from,
            to,
        } => {
            let pull_request = PullRequest {
                title,
                description,
                from,
                to,
            };
            ops.create_pull_request(&project, &repo_slug, &pull_request)
                .await
        }
        StepRequest::MergePullRequest {
            project,
            repo_slug,
            pull_request_id,
        } => {
            ops.merge_pull_request(&project, &repo_slug, pull_request_id)
                .await
        }
        StepRequest::UpdateFile {
            project,
            repo_slug,
            file,
            branch,
            message,
            source_commit_id,
        } => {
            let update = FileUpdate {
                file,
                branch,
                message,
                source_commit_id,
            };
            ops.update_file(&project, &repo_slug, &update, workspace).await
        }
    };

    result.map_err(|source| Error::Step { step: kind, source })
}
