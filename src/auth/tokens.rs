// Token lifecycle against the REST++ /requesttoken endpoint

use chrono::Utc;
use reqwest::Method;

use super::client::AuthClient;
use super::types::{TokenGrant, TokenRequest, TokenResponse, DEFAULT_TOKEN_LIFETIME_SECS};
use crate::connection::{redact, ServerVersion};
use crate::error::{AuthError, Result, TokenOperation};
use crate::gsql::StatementChannel;

const REQUEST_TOKEN_PATH: &str = "/requesttoken";

/// Message REST++ returns when token authentication is disabled
const ENDPOINT_NOT_FOUND_MARKER: &str = "Endpoint is not found from url = /requesttoken";

/// Error code for deleting a token that does not exist
const TOKEN_NOT_FOUND_CODE: &str = "REST-3300";

/// HTTP shape of a token request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRequestMethod {
    /// GET with query parameters (servers before 3.5)
    Get,
    /// POST with a JSON body (3.5 and later)
    Post,
}

/// Which request shape to try first, and what to fall back to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRequestStrategy {
    pub primary: TokenRequestMethod,
    pub fallback: Option<TokenRequestMethod>,
}

impl TokenRequestStrategy {
    /// Servers from 3.5 only take POST. Older or unknown versions get GET
    /// first, with POST as a compatibility fallback.
    pub fn for_version(version: Option<ServerVersion>) -> Self {
        match version {
            Some(v) if v.uses_post_token_request() => Self {
                primary: TokenRequestMethod::Post,
                fallback: None,
            },
            _ => Self {
                primary: TokenRequestMethod::Get,
                fallback: Some(TokenRequestMethod::Post),
            },
        }
    }
}

impl<C: StatementChannel> AuthClient<C> {
    /// Request a new token for `secret`.
    ///
    /// With `persist` the token becomes the connection's bearer credential;
    /// otherwise any stored token is cleared and Basic auth is used.
    /// `lifetime` is in seconds; the server default is 30 days.
    pub async fn request_token(
        &mut self,
        secret: &str,
        persist: bool,
        lifetime: Option<u64>,
    ) -> Result<TokenGrant> {
        let strategy = TokenRequestStrategy::for_version(self.connection.version());
        let params = TokenRequest::new(secret, None, lifetime);

        let primary = self.send_token_request(strategy.primary, &params).await;
        let response = match (primary, strategy.fallback) {
            (Ok(res), _) if !res.error => res,
            (primary, Some(fallback)) => {
                match &primary {
                    Ok(res) => tracing::warn!(
                        method = ?strategy.primary,
                        message = %res.message,
                        "Token request rejected, retrying with {:?}",
                        fallback
                    ),
                    Err(e) => tracing::warn!(
                        method = ?strategy.primary,
                        error = %e,
                        "Token request failed, retrying with {:?}",
                        fallback
                    ),
                }
                match (self.send_token_request(fallback, &params).await, primary) {
                    (Ok(res), _) => res,
                    // Keep the server's rejection from the first attempt
                    (Err(e), Ok(rejected)) => {
                        tracing::debug!(error = %e, "Fallback token request failed");
                        rejected
                    }
                    (Err(e), Err(_)) => return Err(e),
                }
            }
            (primary, None) => primary?,
        };

        if response.error {
            return Err(token_error(response, TokenOperation::Request));
        }

        let token = response
            .token()
            .ok_or_else(|| AuthError::MalformedResponse("token response has no token".into()))?
            .to_string();
        let expires_at = response.expiration.ok_or_else(|| {
            AuthError::MalformedResponse("token response has no expiration".into())
        })?;

        if persist {
            self.connection.store_token(token.clone(), Some(secret));
        } else {
            self.connection.clear_token();
        }

        let grant = TokenGrant::new(token, expires_at);
        tracing::info!(
            token = %redact(&grant.token),
            expires = %grant.expires_at_formatted,
            persisted = persist,
            "Token issued"
        );
        Ok(grant)
    }

    /// Extend a token's lifetime. Defaults to the connection's stored token.
    ///
    /// The new expiration is now + the lifetime reported by the server, not
    /// the token's previous expiration + lifetime.
    pub async fn refresh_token(
        &self,
        secret: &str,
        token: Option<&str>,
        lifetime: Option<u64>,
    ) -> Result<TokenGrant> {
        let token = self.resolve_token(token)?;
        let params = TokenRequest::new(secret, Some(token), lifetime);

        let called_at = Utc::now().timestamp();
        let response = self
            .send_token_request_with(Method::PUT, &params, true)
            .await?;

        if response.error {
            return Err(token_error(response, TokenOperation::Refresh));
        }

        let lifetime_secs = response
            .expiration
            .or(lifetime.map(|l| i64::try_from(l).unwrap_or(i64::MAX)))
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS as i64);
        let refreshed = response.token().unwrap_or(token).to_string();

        let grant = TokenGrant::new(refreshed, called_at.saturating_add(lifetime_secs));
        tracing::info!(
            token = %redact(&grant.token),
            expires = %grant.expires_at_formatted,
            "Token refreshed"
        );
        Ok(grant)
    }

    /// Delete a token. Defaults to the connection's stored token.
    ///
    /// With `skip_missing` a token the server does not know counts as deleted.
    pub async fn delete_token(
        &mut self,
        secret: &str,
        token: Option<&str>,
        skip_missing: bool,
    ) -> Result<bool> {
        let token = self.resolve_token(token)?.to_string();
        let params = TokenRequest::new(secret, Some(&token), None);

        let response = self
            .send_token_request_with(Method::DELETE, &params, true)
            .await?;

        if !response.error {
            if self.connection.token() == Some(token.as_str()) {
                self.connection.clear_token();
            }
            tracing::info!(token = %redact(&token), "Token deleted");
            return Ok(true);
        }

        if skip_missing && response.code.as_deref() == Some(TOKEN_NOT_FOUND_CODE) {
            tracing::debug!(token = %redact(&token), "Token already absent");
            return Ok(true);
        }

        Err(token_error(response, TokenOperation::Delete))
    }

    fn resolve_token<'a>(&'a self, token: Option<&'a str>) -> Result<&'a str> {
        token
            .filter(|t| !t.is_empty())
            .or_else(|| self.connection.token())
            .ok_or(AuthError::NoToken)
    }

    async fn send_token_request(
        &self,
        method: TokenRequestMethod,
        params: &TokenRequest<'_>,
    ) -> Result<TokenResponse> {
        match method {
            TokenRequestMethod::Get => {
                self.send_token_request_with(Method::GET, params, true)
                    .await
            }
            TokenRequestMethod::Post => {
                self.send_token_request_with(Method::POST, params, false)
                    .await
            }
        }
    }

    /// Send `params` as query string or JSON body and parse the reply
    async fn send_token_request_with(
        &self,
        method: Method,
        params: &TokenRequest<'_>,
        as_query: bool,
    ) -> Result<TokenResponse> {
        let url = format!(
            "{}{}",
            self.connection.settings().restpp_url,
            REQUEST_TOKEN_PATH
        );

        let request = self.http.request(method, &url);
        let request = if as_query {
            request.query(params)
        } else {
            request.json(params)
        };

        let (status, body) = self.http.send_text(request).await?;
        let response: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::debug!(status = status, error = %e, "Unparsable token response");
            e
        })?;

        Ok(response)
    }
}

/// Map an error reply to AuthNotEnabled or a generic Auth error
fn token_error(response: TokenResponse, operation: TokenOperation) -> AuthError {
    if response.message.contains(ENDPOINT_NOT_FOUND_MARKER) {
        return AuthError::AuthNotEnabled { operation };
    }
    AuthError::Auth {
        message: response.message,
        code: response.code,
    }
}
