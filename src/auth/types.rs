// Authentication types

use chrono::DateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Server-side default token lifetime (30 days)
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 2_592_000;

/// Display format for token expiration, always UTC
const EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Alias -> masked secret, as listed by `SHOW SECRET`
pub type SecretRegistry = BTreeMap<String, String>;

/// Result of `CREATE SECRET`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatedSecret {
    /// The bare secret value
    Secret(String),

    /// The secret together with its alias (given or server-generated)
    Aliased { alias: String, secret: String },
}

impl CreatedSecret {
    /// The unmasked secret value
    pub fn secret(&self) -> &str {
        match self {
            CreatedSecret::Secret(secret) => secret,
            CreatedSecret::Aliased { secret, .. } => secret,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            CreatedSecret::Secret(_) => None,
            CreatedSecret::Aliased { alias, .. } => Some(alias),
        }
    }

    /// JSON form: a string, or a single-entry `{alias: secret}` object
    pub fn to_json(&self) -> Value {
        match self {
            CreatedSecret::Secret(secret) => Value::String(secret.clone()),
            CreatedSecret::Aliased { alias, secret } => {
                let mut map = serde_json::Map::new();
                map.insert(alias.clone(), Value::String(secret.clone()));
                Value::Object(map)
            }
        }
    }
}

/// A token and its expiration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenGrant {
    pub token: String,

    /// Expiration as Unix timestamp (seconds)
    pub expires_at: i64,

    /// Expiration formatted as `YYYY-MM-DD HH:MM:SS` (UTC)
    pub expires_at_formatted: String,
}

impl TokenGrant {
    pub fn new(token: String, expires_at: i64) -> Self {
        let expires_at_formatted = DateTime::from_timestamp(expires_at, 0)
            .map(|dt| dt.format(EXPIRATION_FORMAT).to_string())
            .unwrap_or_default();

        Self {
            token,
            expires_at,
            expires_at_formatted,
        }
    }
}

/// Parameters for `/requesttoken`, sent as query string or JSON body
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub secret: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<&'a str>,

    /// Lifetime in seconds, sent as a string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<String>,
}

impl<'a> TokenRequest<'a> {
    pub fn new(secret: &'a str, token: Option<&'a str>, lifetime: Option<u64>) -> Self {
        Self {
            secret,
            token,
            lifetime: lifetime.map(|l| l.to_string()),
        }
    }
}

/// JSON body returned by `/requesttoken`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub error: bool,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub code: Option<String>,

    #[serde(default)]
    pub token: Option<String>,

    /// Unix timestamp for request, lifetime in seconds for refresh
    #[serde(default, deserialize_with = "lenient_seconds")]
    pub expiration: Option<i64>,

    #[serde(default)]
    pub results: Option<Value>,
}

impl TokenResponse {
    /// Token from the top level, or from `results.token` on newer servers
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().or_else(|| {
            self.results
                .as_ref()
                .and_then(|r| r.get("token"))
                .and_then(|t| t.as_str())
        })
    }
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    })
}
