// Connection settings and per-connection authentication state

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;
use std::path::PathBuf;

/// Server version from which REST++ only accepts POST token requests
const POST_TOKEN_REQUEST_SINCE: ServerVersion = ServerVersion {
    major: 3,
    minor: 5,
    patch: 0,
};

/// Graph database server version (`major.minor.patch`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ServerVersion {
    /// Parse a version string such as `3.4.0` or `3.10`.
    /// Missing components default to zero; anything non-numeric yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = match parts.next() {
            Some(p) => p.trim().parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => p.trim().parse().ok()?,
            None => 0,
        };
        Some(Self {
            major,
            minor,
            patch,
        })
    }

    /// Whether the server expects token requests as POST with a JSON body
    pub fn uses_post_token_request(&self) -> bool {
        *self >= POST_TOKEN_REQUEST_SINCE
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Static settings describing how to reach a graph database server
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Base URL of the REST++ endpoints, e.g. `http://127.0.0.1:9000`
    pub restpp_url: String,

    /// Base URL of the GSQL server, e.g. `http://127.0.0.1:14240`
    pub gs_url: String,

    pub graph_name: String,
    pub username: String,
    pub password: String,

    /// Version reported by the server, if known
    pub version: Option<ServerVersion>,

    pub use_cert: bool,
    pub cert_path: Option<PathBuf>,
}

impl ConnectionSettings {
    pub fn new(
        restpp_url: impl Into<String>,
        gs_url: impl Into<String>,
        graph_name: impl Into<String>,
    ) -> Self {
        Self {
            restpp_url: trim_url(restpp_url.into()),
            gs_url: trim_url(gs_url.into()),
            graph_name: graph_name.into(),
            username: "tigergraph".to_string(),
            password: "tigergraph".to_string(),
            version: None,
            use_cert: false,
            cert_path: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_version(mut self, version: Option<ServerVersion>) -> Self {
        self.version = version;
        self
    }

    pub fn with_certificate(mut self, use_cert: bool, cert_path: Option<PathBuf>) -> Self {
        self.use_cert = use_cert;
        self.cert_path = cert_path;
        self
    }

    /// Certificate verification stays enabled only when a certificate is
    /// configured and its path is non-empty
    pub fn verifies_certificates(&self) -> bool {
        self.use_cert
            && self
                .cert_path
                .as_ref()
                .is_some_and(|p| !p.as_os_str().is_empty())
    }

    /// Base64 of `username:password`, as sent in a Basic auth header
    pub fn basic_credential(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.password))
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Authorization header currently attached to REST++ requests
#[derive(Clone, PartialEq, Eq)]
pub enum AuthHeader {
    /// Base64 encoded `username:password`
    Basic(String),
    /// Bearer token
    Bearer(String),
}

impl AuthHeader {
    /// Value for the `Authorization` header
    pub fn value(&self) -> String {
        match self {
            AuthHeader::Basic(credential) => format!("Basic {}", credential),
            AuthHeader::Bearer(token) => format!("Bearer {}", token),
        }
    }

    pub fn is_bearer(&self) -> bool {
        matches!(self, AuthHeader::Bearer(_))
    }
}

// Credentials stay out of debug output
impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthHeader::Basic(_) => f.write_str("Basic(..)"),
            AuthHeader::Bearer(token) => write!(f, "Bearer({})", redact(token)),
        }
    }
}

/// Secret, token and header mirrored from the last successful token operation
#[derive(Debug, Clone)]
pub struct AuthState {
    pub secret: Option<String>,
    pub token: Option<String>,
    pub header: AuthHeader,
}

/// A connection to one graph: settings plus mutable auth state
#[derive(Debug, Clone)]
pub struct Connection {
    settings: ConnectionSettings,
    state: AuthState,
}

impl Connection {
    /// Create a connection using Basic credentials until a token is requested
    pub fn new(settings: ConnectionSettings) -> Self {
        let header = AuthHeader::Basic(settings.basic_credential());
        Self {
            settings,
            state: AuthState {
                secret: None,
                token: None,
                header,
            },
        }
    }

    /// Create a connection that already holds an API token
    pub fn with_token(settings: ConnectionSettings, token: impl Into<String>) -> Self {
        let mut conn = Self::new(settings);
        conn.store_token(token.into(), None);
        conn
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn graph_name(&self) -> &str {
        &self.settings.graph_name
    }

    pub fn version(&self) -> Option<ServerVersion> {
        self.settings.version
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn auth_header(&self) -> &AuthHeader {
        &self.state.header
    }

    /// Keep a token and switch to Bearer authentication
    pub fn store_token(&mut self, token: String, secret: Option<&str>) {
        tracing::info!(token = %redact(&token), "Using bearer token for REST++ requests");
        if let Some(secret) = secret {
            self.state.secret = Some(secret.to_string());
        }
        self.state.header = AuthHeader::Bearer(token.clone());
        self.state.token = Some(token);
    }

    /// Forget the stored token and fall back to Basic authentication
    pub fn clear_token(&mut self) {
        if self.state.token.take().is_some() {
            tracing::info!("Stored token cleared, reverting to basic credentials");
        }
        self.state.header = AuthHeader::Basic(self.settings.basic_credential());
    }
}

/// Shorten a credential for logs
pub(crate) fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(6).collect();
    format!("{}...", prefix)
}
