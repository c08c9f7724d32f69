// Statement execution against the GSQL server

use async_trait::async_trait;
use reqwest::{header, Method};

use crate::connection::ConnectionSettings;
use crate::error::{AuthError, Result};
use crate::http_client::HttpEndpoint;

/// Endpoint accepting a GSQL command file
const GSQL_FILE_PATH: &str = "/gsqlserver/gsql/file";

/// Control lines the GSQL server interleaves with statement output
const GSQL_CONTROL_PREFIX: &str = "__GSQL__";

/// Executes administrative statements against a named graph
///
/// Errors inside the statement are reported as text in the returned output,
/// not as `Err`; callers scan the output for markers.
#[async_trait]
pub trait StatementChannel: Send + Sync {
    async fn execute(&self, graph_name: &str, statement: &str) -> Result<String>;
}

/// Prefix a statement with the graph scope
pub fn scoped_statement(graph_name: &str, statement: &str) -> String {
    format!("USE GRAPH {}\n{}", graph_name, statement)
}

/// StatementChannel that posts statements to the GSQL server over HTTP
pub struct GsqlHttpChannel {
    http: HttpEndpoint,
    gs_url: String,
    username: String,
    password: String,
}

impl GsqlHttpChannel {
    pub fn new(http: HttpEndpoint, settings: &ConnectionSettings) -> Self {
        Self {
            http,
            gs_url: settings.gs_url.clone(),
            username: settings.username.clone(),
            password: settings.password.clone(),
        }
    }
}

#[async_trait]
impl StatementChannel for GsqlHttpChannel {
    async fn execute(&self, graph_name: &str, statement: &str) -> Result<String> {
        let url = format!("{}{}", self.gs_url, GSQL_FILE_PATH);
        let command = scoped_statement(graph_name, statement);

        let request = self
            .http
            .request(Method::POST, &url)
            .basic_auth(&self.username, Some(&self.password))
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(command);

        let (status, body) = self.http.send_text(request).await?;

        if status == 401 || status == 403 {
            return Err(AuthError::Auth {
                message: format!("GSQL server rejected credentials (status {})", status),
                code: None,
            });
        }

        Ok(strip_control_lines(&body))
    }
}

/// Remove GSQL control lines, keeping the human-readable output
fn strip_control_lines(output: &str) -> String {
    output
        .lines()
        .filter(|line| !line.starts_with(GSQL_CONTROL_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
}
