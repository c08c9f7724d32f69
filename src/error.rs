// Error handling module
// Defines error types for secret and token operations

use std::fmt;

use thiserror::Error;

/// Error code the server attaches to a duplicate secret alias
pub const DUPLICATE_SECRET_CODE: &str = "E-00001";

/// Token operation that produced an error, used in user-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOperation {
    Request,
    Refresh,
    Delete,
}

impl fmt::Display for TokenOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            TokenOperation::Request => "generate",
            TokenOperation::Refresh => "refresh",
            TokenOperation::Delete => "delete",
        };
        f.write_str(verb)
    }
}

/// Errors that can occur while managing secrets and tokens
#[derive(Error, Debug)]
pub enum AuthError {
    /// A secret with the requested alias already exists
    #[error("{}", duplicate_message(.alias.as_deref()))]
    DuplicateSecret { alias: Option<String> },

    /// `DROP SECRET` reported a failure; carries the raw server output
    #[error("{response}")]
    DropFailed { response: String },

    /// REST++ authentication is disabled on the server
    #[error("REST++ authentication is not enabled, can't {operation} token.")]
    AuthNotEnabled { operation: TokenOperation },

    /// Authentication or authorization failure reported by the server
    #[error("{message}")]
    Auth {
        message: String,
        code: Option<String>,
    },

    /// A freshly created secret could not be matched back to its alias
    #[error("No secret alias found for masked secret {masked}")]
    AliasNotFound { masked: String },

    /// No token was given and the connection holds none
    #[error("No token supplied and the connection has no stored token")]
    NoToken,

    /// The server answered with text we could not interpret
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure inside a collaborator (statement channel, configuration)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn duplicate_message(alias: Option<&str>) -> String {
    match alias {
        Some(alias) => format!("The secret with alias {} already exists.", alias),
        None => "The secret already exists.".to_string(),
    }
}

impl AuthError {
    /// Error code associated with this error, if the server or client assigned one
    pub fn code(&self) -> Option<&str> {
        match self {
            AuthError::DuplicateSecret { .. } => Some(DUPLICATE_SECRET_CODE),
            AuthError::Auth { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

/// Result type alias for auth operations
pub type Result<T> = std::result::Result<T, AuthError>;
