//! Unit tests for the bitbucket_steps crate.

use super::*;
use async_trait::async_trait;
use bitbucket_client::Error as ClientError;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Mutex;

/// Records every call it receives and answers with a canned payload.
struct RecordingOps {
    calls: Mutex<Vec<String>>,
    response: Value,
}

impl RecordingOps {
    fn new(response: Value) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            response,
        }
    }

    fn record(&self, call: String) -> Result<Value, ClientError> {
        self.calls.lock().unwrap().push(call);
        Ok(self.response.clone())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentOperations for RecordingOps {
    async fn create_tag(
        &self,
        project: &str,
        repo_slug: &str,
        tag: &Tag,
    ) -> Result<Value, ClientError> {
        self.record(format!(
            "create_tag {project} {repo_slug} {} {}",
            tag.name, tag.start_point
        ))
    }

    async fn get_tags(&self, project: &str, repo_slug: &str) -> Result<Value, ClientError> {
        self.record(format!("get_tags {project} {repo_slug}"))
    }

    async fn create_branch(
        &self,
        project: &str,
        repo_slug: &str,
        branch: &Branch,
    ) -> Result<Value, ClientError> {
        self.record(format!(
            "create_branch {project} {repo_slug} {} {}",
            branch.name, branch.start_point
        ))
    }

    async fn create_pull_request(
        &self,
        project: &str,
        repo_slug: &str,
        pull_request: &PullRequest,
    ) -> Result<Value, ClientError> {
        self.record(format!(
            "create_pull_request {project} {repo_slug} {} -> {}",
            pull_request.from, pull_request.to
        ))
    }

    async fn get_pull_request(
        &self,
        project: &str,
        repo_slug: &str,
        pull_request_id: u64,
    ) -> Result<Value, ClientError> {
        self.record(format!(
            "get_pull_request {project} {repo_slug} {pull_request_id}"
        ))
    }

    async fn merge_pull_request(
        &self,
        project: &str,
        repo_slug: &str,
        pull_request_id: u64,
    ) -> Result<Value, ClientError> {
        self.record(format!(
            "merge_pull_request {project} {repo_slug} {pull_request_id}"
        ))
    }

    async fn update_file(
        &self,
        project: &str,
        repo_slug: &str,
        update: &FileUpdate,
        workspace: &Path,
    ) -> Result<Value, ClientError> {
        self.record(format!(
            "update_file {project} {repo_slug} {} on {} ancestor {:?} in {}",
            update.file,
            update.branch,
            update.source_commit_id,
            workspace.display()
        ))
    }
}

/// Fails every operation with the same client error.
struct FailingOps;

#[async_trait]
impl ContentOperations for FailingOps {
    async fn create_tag(&self, _: &str, _: &str, _: &Tag) -> Result<Value, ClientError> {
        Err(ClientError::RequestFailed {
            status: 404,
            message: "Repository my-repo does not exist.".to_string(),
        })
    }

    async fn get_tags(&self, _: &str, _: &str) -> Result<Value, ClientError> {
        Err(ClientError::RequestFailed {
            status: 404,
            message: "Repository my-repo does not exist.".to_string(),
        })
    }

    async fn create_branch(&self, _: &str, _: &str, _: &Branch) -> Result<Value, ClientError> {
        Err(ClientError::RequestFailed {
            status: 404,
            message: "Repository my-repo does not exist.".to_string(),
        })
    }

    async fn create_pull_request(
        &self,
        _: &str,
        _: &str,
        _: &PullRequest,
    ) -> Result<Value, ClientError> {
        Err(ClientError::RequestFailed {
            status: 404,
            message: "Repository my-repo does not exist.".to_string(),
        })
    }

    async fn get_pull_request(&self, _: &str, _: &str, _: u64) -> Result<Value, ClientError> {
        Err(ClientError::RequestFailed {
            status: 404,
            message: "Repository my-repo does not exist.".to_string(),
        })
    }

    async fn merge_pull_request(&self, _: &str, _: &str, _: u64) -> Result<Value, ClientError> {
        Err(ClientError::Conflict {
            message: "Automated merge not possible for pull request with ID 12".to_string(),
        })
    }

    async fn update_file(
        &self,
        _: &str,
        _: &str,
        _: &FileUpdate,
        _: &Path,
    ) -> Result<Value, ClientError> {
        Err(ClientError::RequestFailed {
            status: 404,
            message: "Repository my-repo does not exist.".to_string(),
        })
    }
}

#[test]
fn test_parse_create_tag_step() {
    let step = StepRequest::parse(
        r#"{
            "step": "createTag",
            "project": "PROJ",
            "repoSlug": "my-repo",
            "name": "v1.0.0",
            "message": "release",
            "startPoint": "refs/heads/main"
        }"#,
    )
    .unwrap();

    assert_eq!(
        step,
        StepRequest::CreateTag {
            project: "PROJ".to_string(),
            repo_slug: "my-repo".to_string(),
            name: "v1.0.0".to_string(),
            message: "release".to_string(),
            start_point: "refs/heads/main".to_string(),
        }
    );
    assert_eq!(step.kind(), "createTag");
}

#[test]
fn test_parse_rejects_an_unknown_step() {
    let error = StepRequest::parse(r#"{ "step": "deleteEverything" }"#).unwrap_err();
    assert!(matches!(error, Error::Definition { .. }));
}

#[test]
fn test_parse_rejects_invalid_json() {
    let error = StepRequest::parse("not json at all").unwrap_err();
    assert!(matches!(error, Error::Definition { .. }));
}

#[test]
fn test_update_file_step_defaults_to_no_source_commit() {
    let step = StepRequest::parse(
        r#"{
            "step": "updateFile",
            "project": "PROJ",
            "repoSlug": "my-repo",
            "file": "docs/readme.md",
            "branch": "main",
            "message": "update docs"
        }"#,
    )
    .unwrap();

    match step {
        StepRequest::UpdateFile {
            source_commit_id, ..
        } => assert_eq!(source_commit_id, None),
        other => panic!("expected UpdateFile, got {other:?}"),
    }
}

#[test]
fn test_serialized_step_round_trips() {
    let step = StepRequest::MergePullRequest {
        project: "PROJ".to_string(),
        repo_slug: "my-repo".to_string(),
        pull_request_id: 12,
    };

    let text = serde_json::to_value(&step).unwrap();
    assert_eq!(
        text,
        json!({
            "step": "mergePullRequest",
            "project": "PROJ",
            "repoSlug": "my-repo",
            "pullRequestId": 12
        })
    );
    assert_eq!(StepRequest::parse(&text.to_string()).unwrap(), step);
}

#[test]
fn test_serialized_update_file_step_omits_absent_ancestor() {
    let step = StepRequest::UpdateFile {
        project: "PROJ".to_string(),
        repo_slug: "my-repo".to_string(),
        file: "readme.md".to_string(),
        branch: "main".to_string(),
        message: "update".to_string(),
        source_commit_id: None,
    };

    let text = serde_json::to_string(&step).unwrap();
    assert!(!text.contains("sourceCommitId"));
}

#[test]
fn test_kind_names_every_step() {
    let steps = [
        (
            StepRequest::GetTags {
                project: "P".to_string(),
                repo_slug: "r".to_string(),
            },
            "getTags",
        ),
        (
            StepRequest::CreateBranch {
                project: "P".to_string(),
                repo_slug: "r".to_string(),
                name: "b".to_string(),
                message: "m".to_string(),
                start_point: "s".to_string(),
            },
            "createBranch",
        ),
        (
            StepRequest::CreatePullRequest {
                project: "P".to_string(),
                repo_slug: "r".to_string(),
                title: "t".to_string(),
                description: "d".to_string(),
                from: "f".to_string(),
                to: "t".to_string(),
            },
            "createPullRequest",
        ),
    ];

    for (step, expected) in steps {
        assert_eq!(step.kind(), expected);
    }
}

#[tokio::test]
async fn test_execute_dispatches_create_tag() {
    let ops = RecordingOps::new(json!({ "id": "refs/tags/v1.0.0" }));
    let step = StepRequest::CreateTag {
        project: "PROJ".to_string(),
        repo_slug: "my-repo".to_string(),
        name: "v1.0.0".to_string(),
        message: "release".to_string(),
        start_point: "refs/heads/main".to_string(),
    };

    let result = execute(step, &ops, Path::new("/tmp/ws")).await.unwrap();

    assert_eq!(result["id"], "refs/tags/v1.0.0");
    assert_eq!(
        ops.calls(),
        vec!["create_tag PROJ my-repo v1.0.0 refs/heads/main".to_string()]
    );
}

#[tokio::test]
async fn test_execute_dispatches_update_file_with_the_workspace() {
    let ops = RecordingOps::new(json!({}));
    let step = StepRequest::UpdateFile {
        project: "PROJ".to_string(),
        repo_slug: "my-repo".to_string(),
        file: "docs/readme.md".to_string(),
        branch: "main".to_string(),
        message: "update docs".to_string(),
        source_commit_id: Some("abc123".to_string()),
    };

    execute(step, &ops, &PathBuf::from("/tmp/ws")).await.unwrap();

    assert_eq!(
        ops.calls(),
        vec![
            "update_file PROJ my-repo docs/readme.md on main ancestor Some(\"abc123\") in /tmp/ws"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn test_execute_dispatches_merge_pull_request() {
    let ops = RecordingOps::new(json!({ "state": "MERGED" }));
    let step = StepRequest::MergePullRequest {
        project: "PROJ".to_string(),
        repo_slug: "my-repo".to_string(),
        pull_request_id: 12,
    };

    let result = execute(step, &ops, Path::new("/tmp/ws")).await.unwrap();

    assert_eq!(result["state"], "MERGED");
    assert_eq!(
        ops.calls(),
        vec!["merge_pull_request PROJ my-repo 12".to_string()]
    );
}

#[tokio::test]
async fn test_execute_wraps_failures_with_the_step_name() {
    let step = StepRequest::MergePullRequest {
        project: "PROJ".to_string(),
        repo_slug: "my-repo".to_string(),
        pull_request_id: 12,
    };

    let error = execute(step, &FailingOps, Path::new("/tmp/ws"))
        .await
        .unwrap_err();

    match error {
        Error::Step { step, source } => {
            assert_eq!(step, "mergePullRequest");
            assert!(matches!(source, ClientError::Conflict { .. }));
        }
        other => panic!("expected Step, got {other:?}"),
    }
}
