// Secret management through GSQL statements

use super::client::AuthClient;
use super::types::{CreatedSecret, SecretRegistry};
use crate::error::{AuthError, Result};
use crate::gsql::StatementChannel;

/// Marks the line holding a (masked) secret in `SHOW SECRET` output
const SECRET_LINE_MARKER: &str = "- Secret";

/// Marks the line holding the alias, expected right after the secret line
const ALIAS_LINE_MARKER: &str = "- Alias";

/// Separator between a field label and its value
const FIELD_SEPARATOR: &str = ": ";

/// Precedes the new secret in `CREATE SECRET` output
const CREATED_SECRET_MARKER: &str = "The secret: ";

/// Present in `CREATE SECRET` output when the alias is taken
const DUPLICATE_MARKER: &str = "already exists";

/// Present in `DROP SECRET` output when any secret could not be dropped
const DROP_FAILED_MARKER: &str = "Failed to drop secrets";

/// Characters kept visible at each end of a masked secret
const MASK_VISIBLE_CHARS: usize = 3;

impl<C: StatementChannel> AuthClient<C> {
    /// List secrets of the connection's graph as alias -> masked secret.
    ///
    /// The original value of a secret cannot be retrieved after creation.
    pub async fn list_secrets(&self) -> Result<SecretRegistry> {
        let output = self
            .channel
            .execute(self.connection.graph_name(), "SHOW SECRET")
            .await?;

        let registry = parse_secret_listing(&output);
        tracing::debug!(count = registry.len(), "Listed secrets");
        Ok(registry)
    }

    /// Create a secret, optionally under `alias`.
    ///
    /// With `with_alias` the result carries the alias. When no alias was
    /// given the server generates one, which is recovered by matching the
    /// masked secret against a fresh listing.
    pub async fn create_secret(
        &self,
        alias: Option<&str>,
        with_alias: bool,
    ) -> Result<CreatedSecret> {
        let alias = alias.map(str::trim).filter(|a| !a.is_empty());

        let statement = match alias {
            Some(alias) => format!("CREATE SECRET {}", alias),
            None => "CREATE SECRET".to_string(),
        };
        let output = self
            .channel
            .execute(self.connection.graph_name(), &statement)
            .await?;

        if output.contains(DUPLICATE_MARKER) {
            return Err(AuthError::DuplicateSecret {
                alias: alias.map(str::to_string),
            });
        }

        let secret = extract_created_secret(&output).ok_or_else(|| {
            AuthError::MalformedResponse(format!(
                "CREATE SECRET output does not contain '{}'",
                CREATED_SECRET_MARKER.trim()
            ))
        })?;
        tracing::info!(alias = ?alias, "Secret created");

        if !with_alias {
            return Ok(CreatedSecret::Secret(secret));
        }

        if let Some(alias) = alias {
            return Ok(CreatedSecret::Aliased {
                alias: alias.to_string(),
                secret,
            });
        }

        let masked = mask_secret(&secret);
        let registry = self.list_secrets().await?;
        match registry.into_iter().find(|(_, listed)| *listed == masked) {
            Some((alias, _)) => {
                tracing::debug!(alias = %alias, "Recovered generated alias");
                Ok(CreatedSecret::Aliased { alias, secret })
            }
            None => Err(AuthError::AliasNotFound { masked }),
        }
    }

    /// Drop one or more secrets in a single statement and return the raw output.
    ///
    /// With `ignore_errors` the output is returned even if some drops failed;
    /// callers need to inspect it for partial failures.
    pub async fn drop_secrets<I, S>(&self, aliases: I, ignore_errors: bool) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let statement = build_drop_statement(aliases);
        let output = self
            .channel
            .execute(self.connection.graph_name(), &statement)
            .await?;

        if output.contains(DROP_FAILED_MARKER) {
            if !ignore_errors {
                return Err(AuthError::DropFailed { response: output });
            }
            tracing::warn!("Some secrets could not be dropped, ignoring");
        }

        Ok(output)
    }

    pub async fn drop_secret(&self, alias: &str, ignore_errors: bool) -> Result<String> {
        self.drop_secrets([alias], ignore_errors).await
    }
}

/// Parse `SHOW SECRET` output.
///
/// A secret line must be directly followed by its alias line. The line after
/// a secret line is always consumed; when it is not an alias line the secret
/// is dropped from the result.
pub fn parse_secret_listing(output: &str) -> SecretRegistry {
    let lines: Vec<&str> = output.split('\n').collect();
    let mut registry = SecretRegistry::new();

    let mut i = 0;
    while i < lines.len() {
        if lines[i].contains(SECRET_LINE_MARKER) {
            let secret = field_value(lines[i]);
            i += 1;
            if let (Some(secret), Some(next)) = (secret, lines.get(i)) {
                if next.contains(ALIAS_LINE_MARKER) {
                    if let Some(alias) = field_value(next) {
                        registry.insert(alias.to_string(), secret.to_string());
                    }
                }
            }
        }
        i += 1;
    }

    registry
}

/// Value following the first `": "` on a line
fn field_value(line: &str) -> Option<&str> {
    line.split(FIELD_SEPARATOR).nth(1).map(str::trim)
}

/// Extract the new secret from `CREATE SECRET` output
pub fn extract_created_secret(output: &str) -> Option<String> {
    let joined: String = output.chars().filter(|c| *c != '\n' && *c != '\r').collect();
    let (_, rest) = joined.split_once(CREATED_SECRET_MARKER)?;
    let secret = rest.split(' ').next()?.trim();
    if secret.is_empty() {
        None
    } else {
        Some(secret.to_string())
    }
}

/// Masked form of a secret: first and last three characters around `****`
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let visible = MASK_VISIBLE_CHARS.min(chars.len());
    let head: String = chars[..visible].iter().collect();
    let tail: String = chars[chars.len() - visible..].iter().collect();
    format!("{}****{}", head, tail)
}

/// One `DROP SECRET` line per alias
pub fn build_drop_statement<I, S>(aliases: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    aliases
        .into_iter()
        .map(|alias| format!("DROP SECRET {}", alias.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}
