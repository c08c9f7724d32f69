use anyhow::Context;
use reqwest::{Certificate, Client, Method, RequestBuilder};
use std::time::Duration;

use crate::connection::ConnectionSettings;
use crate::error::Result;

/// Default request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// HTTP access to REST++ and GSQL endpoints
///
/// Holds a single `reqwest::Client` configured once from the connection's
/// certificate settings: verification stays on (with the configured root
/// certificate) when `use_cert` is set and a certificate path is present,
/// otherwise invalid certificates are accepted.
#[derive(Clone)]
pub struct HttpEndpoint {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Whether TLS certificates are verified
    verify_certificates: bool,
}

impl HttpEndpoint {
    /// Create an endpoint for the given connection settings
    pub fn new(settings: &ConnectionSettings, request_timeout: u64) -> Result<Self> {
        let verify_certificates = settings.verifies_certificates();

        let mut builder = Client::builder().timeout(Duration::from_secs(request_timeout));

        if verify_certificates {
            if let Some(path) = settings.cert_path.as_ref() {
                let pem = std::fs::read(path).with_context(|| {
                    format!("Failed to read certificate: {}", path.display())
                })?;
                let cert = Certificate::from_pem(&pem).context("Failed to parse certificate")?;
                builder = builder.add_root_certificate(cert);
            }
        } else {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().context("Failed to create HTTP client")?;

        tracing::debug!(
            verify_certificates = verify_certificates,
            timeout_secs = request_timeout,
            "HTTP endpoint initialized"
        );

        Ok(Self {
            client,
            verify_certificates,
        })
    }

    /// Start a request against an absolute URL
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        tracing::debug!(method = %method, url = %url, "Sending HTTP request");
        self.client.request(method, url)
    }

    /// Send a request and return the status and body text
    ///
    /// Non-success statuses are not treated as errors: REST++ reports
    /// failures in the JSON body, so callers inspect that instead.
    pub async fn send_text(&self, request: RequestBuilder) -> Result<(u16, String)> {
        let response = request.send().await.map_err(|e| {
            let error_kind = if e.is_timeout() {
                "timeout"
            } else if e.is_connect() {
                "connection_failed"
            } else {
                "request_error"
            };
            tracing::warn!(error_kind = error_kind, error = %e, "HTTP request error");
            e
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status = status, body_len = body.len(), "Received HTTP response");

        Ok((status, body))
    }

    pub fn verifies_certificates(&self) -> bool {
        self.verify_certificates
    }
}
