//! # Models
//!
//! Transient value objects for the Bitbucket Server content API.
//!
//! These types carry the parameters of a single operation; they are
//! constructed per call, serialized into a request, and discarded. Responses
//! are handed back to callers as normalized `serde_json::Value` objects, so
//! there are no response-side models beyond [`PullRequestMergeState`], which
//! the merge protocol extracts from the pull-request details payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::Error;

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Parameters for creating a tag.
///
/// Serializes to the JSON body the server expects (`name`, `message`,
/// `startPoint`).
///
/// # Examples
///
/// ```rust
/// use bitbucket_client::models::Tag;
///
/// let tag = Tag {
///     name: "v1.4.0".to_string(),
///     message: "release 1.4.0".to_string(),
///     start_point: "refs/heads/main".to_string(),
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// The name of the tag to create.
    pub name: String,
    /// The tag description.
    pub message: String,
    /// The commit, branch, or tag the new tag is created from.
    pub start_point: String,
}

/// Parameters for creating a branch.
///
/// Identical in shape to [`Tag`]; the server distinguishes the two only by
/// the resource path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// The name of the branch to create.
    pub name: String,
    /// The branch description.
    pub message: String,
    /// The commit, branch, or tag the new branch is created from.
    pub start_point: String,
}

/// Parameters for opening a pull request.
///
/// The refs are Bitbucket ref ids (for example `refs/heads/feature-x`). The
/// full request envelope (state flags, repository coordinates for both refs,
/// empty reviewer list) is assembled by the client; callers only supply what
/// varies per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// The title of the pull request.
    pub title: String,
    /// The description of the pull request.
    pub description: String,
    /// The source ref to merge from.
    pub from: String,
    /// The destination ref to merge into.
    pub to: String,
}

/// Parameters for updating a file on a branch.
///
/// `file` is the repository-relative path of the file to write; the same
/// relative path locates the upload source underneath the caller's workspace
/// directory. When `source_commit_id` is absent or blank the client resolves
/// the branch head before uploading, so the server can detect concurrent
/// modification of the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdate {
    /// Repository-relative path of the file to update.
    pub file: String,
    /// The branch to commit the update to.
    pub branch: String,
    /// The commit message.
    pub message: String,
    /// The commit the update declares as its expected parent. Resolved from
    /// the branch history when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_commit_id: Option<String>,
}

impl FileUpdate {
    /// Returns the declared source commit, treating blank strings as absent.
    pub(crate) fn declared_source_commit(&self) -> Option<&str> {
        self.source_commit_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// The merge-relevant state of a pull request, observed immediately before a
/// merge attempt.
///
/// `version` is the server's optimistic-concurrency counter; the merge
/// request must echo the observed value and is rejected when it has moved.
/// `can_merge` is advisory: when the server omits the flag entirely the
/// protocol proceeds as if it were `true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestMergeState {
    /// The id of the pull request.
    pub id: u64,
    /// The version counter observed on the server.
    pub version: i64,
    /// Whether the server believes the merge can currently be performed.
    pub can_merge: bool,
}

impl PullRequestMergeState {
    /// Extracts the merge state from a pull-request details payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RequestFailed`] identifying the pull request when the
    /// payload carries no integer `version`. A missing or mis-typed
    /// `canMerge` is not an error; the flag defaults to permissive.
    pub(crate) fn from_details(id: u64, details: &Value) -> Result<Self, Error> {
        let version =
            details
                .get("version")
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::RequestFailed {
                    status: 200,
                    message: format!("cannot retrieve pull request info for ID {id}"),
                })?;

        let can_merge = details
            .get("canMerge")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        Ok(Self {
            id,
            version,
            can_merge,
        })
    }
}
