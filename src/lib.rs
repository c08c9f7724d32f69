// Graph Auth - Library root

pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod gsql;
pub mod http_client;
pub mod loading;

pub use auth::AuthClient;
pub use connection::{AuthHeader, Connection, ConnectionSettings, ServerVersion};
pub use error::{AuthError, Result};
pub use gsql::{GsqlHttpChannel, StatementChannel};
pub use http_client::HttpEndpoint;
