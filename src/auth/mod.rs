// Authentication module
// Manages secrets through GSQL and token lifecycle through REST++

mod client;
mod secrets;
mod tokens;
mod types;

pub use client::AuthClient;
pub use secrets::{build_drop_statement, extract_created_secret, mask_secret, parse_secret_listing};
pub use tokens::{TokenRequestMethod, TokenRequestStrategy};
pub use types::{
    CreatedSecret, SecretRegistry, TokenGrant, TokenRequest, TokenResponse,
    DEFAULT_TOKEN_LIFETIME_SECS,
};
