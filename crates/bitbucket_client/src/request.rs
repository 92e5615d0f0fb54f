//! Request construction for the Bitbucket Server REST API.
//!
//! An [`ApiRequest`] describes one call against the repository-scoped API:
//! `{base}/rest/api/1.0/projects/{project}/repos/{slug}/{resource}`. It owns
//! everything that varies per request (method, resource, ordered query
//! parameters, body, extra headers) while the authentication header is always
//! derived from the server configuration and cannot be overridden.
//!
//! Extra headers are a property of a single [`ApiRequest`] value, not of the
//! client, so registering a header for one call can never leak into the next.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::config::ServerConfig;
use crate::errors::Error;

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;

const BASE_RESOURCE: [&str; 3] = ["rest", "api", "1.0"];

/// The body of an API request.
pub(crate) enum Body {
    /// No body (GET requests).
    None,
    /// A JSON document.
    Json(Value),
    /// A multipart form (file uploads).
    Multipart(Form),
}

/// One request against the repository-scoped REST API.
pub(crate) struct ApiRequest {
    method: Method,
    project: String,
    repo_slug: String,
    resource: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Body,
}

impl ApiRequest {
    pub(crate) fn new(
        method: Method,
        project: &str,
        repo_slug: &str,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            method,
            project: project.to_string(),
            repo_slug: repo_slug.to_string(),
            resource: resource.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: Body::None,
        }
    }

    /// Appends one query parameter. Parameters are sent in registration order.
    pub(crate) fn query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    /// Attaches an extra header to this request only.
    #[allow(dead_code)] // part of the request surface; exercised in tests
    pub(crate) fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Attaches a JSON body.
    pub(crate) fn json(mut self, body: Value) -> Self {
        self.body = Body::Json(body);
        self
    }

    /// Attaches a multipart form body.
    pub(crate) fn multipart(mut self, form: Form) -> Self {
        self.body = Body::Multipart(form);
        self
    }

    /// Resolves the absolute request URL against the configured base URL.
    ///
    /// Project, slug, and resource segments are appended with
    /// percent-encoding; slashes inside the resource separate path segments.
    pub(crate) fn url(&self, base: &Url) -> Result<Url, Error> {
        let mut url = base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| Error::Configuration {
                field: "base_url",
                message: format!("'{base}' cannot carry a resource path"),
            })?;
            segments.pop_if_empty();
            segments.extend(BASE_RESOURCE);
            segments.push("projects");
            segments.push(&self.project);
            segments.push("repos");
            segments.push(&self.repo_slug);
            segments.extend(self.resource.split('/'));
        }
        for (name, value) in &self.query {
            url.query_pairs_mut().append_pair(name, value);
        }
        Ok(url)
    }

    /// Turns the request into a ready-to-send [`reqwest::RequestBuilder`]
    /// carrying the Basic-Auth header derived from the configured user.
    pub(crate) fn into_builder(
        self,
        http: &reqwest::Client,
        config: &ServerConfig,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let url = self.url(config.base_url())?;
        let mut builder = http.request(self.method, url);
        for (name, value) in &self.headers {
            // The authentication header is derived from the configuration and
            // cannot be overridden per request.
            if name.eq_ignore_ascii_case("authorization") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = builder.basic_auth(config.username(), Some(config.password()));
        let builder = match self.body {
            Body::None => builder,
            Body::Json(value) => builder.json(&value),
            Body::Multipart(form) => builder.multipart(form),
        };
        Ok(builder)
    }
}

/// Builds a multipart form for a file upload.
///
/// The file's bytes become the part named `part_name`, carrying the source
/// file's base name and a media type probed from the file name
/// (`application/octet-stream` when probing finds nothing). The additional
/// text fields are appended in the given order.
///
/// # Errors
///
/// Returns [`Error::FileRead`] when the source file cannot be read.
pub(crate) async fn file_upload_form(
    part_name: &str,
    source: &Path,
    fields: Vec<(String, String)>,
) -> Result<Form, Error> {
    let bytes = tokio::fs::read(source).await.map_err(|e| Error::FileRead {
        path: source.to_path_buf(),
        source: e,
    })?;

    let file_name = source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let media_type = mime_guess::from_path(source).first_or_octet_stream();

    let part = Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(media_type.essence_str())
        .map_err(Error::Transport)?;

    let mut form = Form::new().part(part_name.to_string(), part);
    for (name, value) in fields {
        form = form.text(name, value);
    }
    Ok(form)
}
