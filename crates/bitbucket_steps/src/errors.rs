use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors surfaced while parsing or running a step.
#[derive(Error, Debug)]
pub enum Error {
    /// The step definition could not be deserialized.
    #[error("malformed step definition: {source}")]
    Definition {
        #[source]
        source: serde_json::Error,
    },

    /// The server rejected or failed the underlying operation.
    #[error("step '{step}' failed: {source}")]
    Step {
        /// Wire name of the step that failed, e.g. `createTag`.
        step: &'static str,
        #[source]
        source: bitbucket_client::Error,
    },
}
