// Loading jobs fed with a local file

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use crate::connection::Connection;
use crate::error::{AuthError, Result};
use crate::http_client::HttpEndpoint;

/// Default maximum response size in bytes
pub const DEFAULT_SIZE_LIMIT: u64 = 128_000_000;

/// Default GSQL timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 16_000;

/// Optional knobs for a loading job run
#[derive(Debug, Clone)]
pub struct LoadingOptions {
    /// Field separator; the server default is `,`
    pub sep: Option<String>,
    /// Line terminator; the server default is `\n`
    pub eol: Option<String>,
    pub timeout_ms: u64,
    pub size_limit: u64,
}

impl Default for LoadingOptions {
    fn default() -> Self {
        Self {
            sep: None,
            eol: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            size_limit: DEFAULT_SIZE_LIMIT,
        }
    }
}

#[derive(Serialize)]
struct LoadingQuery<'a> {
    tag: &'a str,
    filename: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sep: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    eol: Option<&'a str>,
}

/// Upload `path` as the data of loading job `job_name`, bound to the
/// job's `DEFINE FILENAME <file_tag>` variable.
///
/// Uses the connection's current auth header, so a persisted token is
/// picked up automatically. Returns `results` from the response body,
/// or the whole body when it carries none.
pub async fn run_loading_job_with_file(
    http: &HttpEndpoint,
    connection: &Connection,
    path: &Path,
    file_tag: &str,
    job_name: &str,
    options: &LoadingOptions,
) -> Result<Value> {
    let data = tokio::fs::read(path).await?;

    let url = format!(
        "{}/ddl/{}",
        connection.settings().restpp_url,
        connection.graph_name()
    );
    let query = LoadingQuery {
        tag: job_name,
        filename: file_tag,
        sep: options.sep.as_deref(),
        eol: options.eol.as_deref(),
    };

    tracing::info!(
        job = job_name,
        file = %path.display(),
        bytes = data.len(),
        "Running loading job"
    );

    let request = http
        .request(Method::POST, &url)
        .query(&query)
        .header("Authorization", connection.auth_header().value())
        .header("RESPONSE-LIMIT", options.size_limit.to_string())
        .header("GSQL-TIMEOUT", options.timeout_ms.to_string())
        .body(data);

    let (_, body) = http.send_text(request).await?;
    let mut response: Value = serde_json::from_str(&body)?;

    if response.get("error").and_then(Value::as_bool).unwrap_or(false) {
        let message = response
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Loading job failed")
            .to_string();
        let code = response
            .get("code")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(AuthError::Auth { message, code });
    }

    let results = response.get_mut("results").map(Value::take);
    Ok(results.unwrap_or(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = LoadingOptions::default();
        assert_eq!(options.size_limit, 128_000_000);
        assert_eq!(options.timeout_ms, 16_000);
        assert!(options.sep.is_none());
        assert!(options.eol.is_none());
    }

    #[test]
    fn test_query_skips_unset_separators() {
        let query = LoadingQuery {
            tag: "load_people",
            filename: "f1",
            sep: None,
            eol: Some("\n"),
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"tag": "load_people", "filename": "f1", "eol": "\n"})
        );
    }
}
