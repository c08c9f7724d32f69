use anyhow::{Context, Result};
use serde_json::{json, Value};

use graph_auth::auth::AuthClient;
use graph_auth::config::{Command, Config, SecretCommand, TokenCommand};
use graph_auth::gsql::GsqlHttpChannel;
use graph_auth::loading::{self, LoadingOptions};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let (config, command) = Config::load().context("Failed to load configuration")?;
    config.validate()?;

    // Initialize logging with a configured level; stdout is reserved for results
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::debug!(
        graph = %config.graph_name,
        restpp = %config.restpp_url(),
        gsql = %config.gs_url(),
        "Configuration loaded"
    );

    let mut client = AuthClient::connect(
        config.connection_settings(),
        config.api_token.clone(),
        config.http_request_timeout,
    )
    .context("Failed to initialize auth client")?;

    let output = run(&mut client, command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

/// Execute one CLI command and return its JSON output
async fn run(client: &mut AuthClient<GsqlHttpChannel>, command: Command) -> Result<Value> {
    let output = match command {
        Command::Secrets(SecretCommand::List) => json!(client.list_secrets().await?),

        Command::Secrets(SecretCommand::Create { alias, with_alias }) => client
            .create_secret(alias.as_deref(), with_alias)
            .await?
            .to_json(),

        Command::Secrets(SecretCommand::Drop { aliases, strict }) => {
            let response = client.drop_secrets(&aliases, !strict).await?;
            Value::String(response)
        }

        Command::Token(TokenCommand::Request {
            secret,
            no_persist,
            lifetime,
        }) => json!(client.request_token(&secret, !no_persist, lifetime).await?),

        Command::Token(TokenCommand::Refresh {
            secret,
            token,
            lifetime,
        }) => json!(
            client
                .refresh_token(&secret, token.as_deref(), lifetime)
                .await?
        ),

        Command::Token(TokenCommand::Delete {
            secret,
            token,
            strict,
        }) => {
            let deleted = client.delete_token(&secret, token.as_deref(), !strict).await?;
            json!({ "deleted": deleted })
        }

        Command::Load {
            file,
            tag,
            job,
            sep,
            eol,
        } => {
            let options = LoadingOptions {
                sep,
                eol,
                ..LoadingOptions::default()
            };
            loading::run_loading_job_with_file(
                client.http(),
                client.connection(),
                &file,
                &tag,
                &job,
                &options,
            )
            .await?
        }
    };

    Ok(output)
}
