use crate::connection::{Connection, ConnectionSettings};
use crate::error::Result;
use crate::gsql::{GsqlHttpChannel, StatementChannel};
use crate::http_client::HttpEndpoint;

/// Authentication client
/// Manages secrets through a statement channel and tokens through REST++
pub struct AuthClient<C> {
    /// Connection settings and the current auth state
    pub(super) connection: Connection,

    /// Channel for administrative statements
    pub(super) channel: C,

    /// HTTP endpoint for REST++ requests
    pub(super) http: HttpEndpoint,
}

impl<C: StatementChannel> AuthClient<C> {
    pub fn new(connection: Connection, channel: C, http: HttpEndpoint) -> Self {
        Self {
            connection,
            channel,
            http,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn http(&self) -> &HttpEndpoint {
        &self.http
    }
}

impl AuthClient<GsqlHttpChannel> {
    /// Create a client talking to the GSQL server over HTTP
    pub fn connect(
        settings: ConnectionSettings,
        api_token: Option<String>,
        request_timeout: u64,
    ) -> Result<Self> {
        let http = HttpEndpoint::new(&settings, request_timeout)?;
        let channel = GsqlHttpChannel::new(http.clone(), &settings);

        tracing::info!(
            graph = %settings.graph_name,
            restpp = %settings.restpp_url,
            version = ?settings.version,
            "Auth client connected"
        );

        let connection = match api_token {
            Some(token) if !token.is_empty() => Connection::with_token(settings, token),
            _ => Connection::new(settings),
        };

        Ok(Self::new(connection, channel, http))
    }
}
