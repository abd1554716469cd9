use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "slack-options-gateway",
    version,
    about = "Serves Slack options-load callbacks from an upstream GraphQL API"
)]
pub struct Args {
    #[arg(long, env = "OPTIONS_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    #[arg(long, env = "OPTIONS_PORT", default_value_t = 18790)]
    pub port: u16,

    #[arg(long, env = "SLACK_VERIFICATION_TOKEN", hide_env_values = true)]
    pub slack_verification_token: Option<String>,

    #[arg(
        long,
        env = "OPTIONS_DB_PATH",
        default_value = "./.slack-options/options.db"
    )]
    pub db_path: PathBuf,

    #[arg(
        long,
        env = "UPSTREAM_GRAPHQL_URL",
        default_value = "https://api.marvelapp.com/graphql/"
    )]
    pub upstream_graphql_url: String,

    #[arg(
        long,
        env = "UPSTREAM_TOKEN_URL",
        default_value = "https://marvelapp.com/oauth/token/"
    )]
    pub upstream_token_url: String,

    #[arg(long, env = "UPSTREAM_CLIENT_ID")]
    pub upstream_client_id: Option<String>,

    #[arg(long, env = "UPSTREAM_CLIENT_SECRET", hide_env_values = true)]
    pub upstream_client_secret: Option<String>,

    #[arg(long, env = "UPSTREAM_TIMEOUT_MS", default_value_t = 10_000)]
    pub upstream_timeout_ms: u64,

    #[arg(long, env = "OPTIONS_MAX_BODY_BYTES", default_value_t = 64 * 1024)]
    pub max_body_bytes: usize,

    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_filter: String,

    #[arg(long, env = "OPTIONS_JSON_LOGS", default_value_t = false)]
    pub json_logs: bool,
}

/// OAuth client used for the refresh-token grant. Refresh is disabled when
/// either half is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub host: IpAddr,
    pub port: u16,
    pub verification_token: String,
    pub db_path: PathBuf,
    pub upstream_graphql_url: String,
    pub upstream_token_url: String,
    pub upstream_credentials: Option<UpstreamClientCredentials>,
    pub upstream_timeout: Duration,
    pub max_body_bytes: usize,
    pub log_filter: String,
    pub json_logs: bool,
}

impl RuntimeConfig {
    pub fn from_args(args: Args) -> Result<Self, String> {
        let Some(verification_token) = normalize_secret(args.slack_verification_token) else {
            return Err("SLACK_VERIFICATION_TOKEN must be set".to_owned());
        };
        let upstream_credentials =
            resolve_client_credentials(args.upstream_client_id, args.upstream_client_secret)?;

        if args.port == 0 {
            return Err("port must be greater than 0".to_owned());
        }
        if args.upstream_timeout_ms == 0 {
            return Err("upstream_timeout_ms must be greater than 0".to_owned());
        }
        if args.max_body_bytes == 0 {
            return Err("max_body_bytes must be greater than 0".to_owned());
        }
        let upstream_graphql_url =
            require_http_url("upstream_graphql_url", args.upstream_graphql_url)?;
        let upstream_token_url = require_http_url("upstream_token_url", args.upstream_token_url)?;

        Ok(Self {
            host: args.host,
            port: args.port,
            verification_token,
            db_path: args.db_path,
            upstream_graphql_url,
            upstream_token_url,
            upstream_credentials,
            upstream_timeout: Duration::from_millis(args.upstream_timeout_ms),
            max_body_bytes: args.max_body_bytes,
            log_filter: args.log_filter,
            json_logs: args.json_logs,
        })
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn refresh_enabled(&self) -> bool {
        self.upstream_credentials.is_some()
    }

    #[must_use]
    pub fn for_test(host: IpAddr, port: u16, db_path: PathBuf) -> Self {
        Self {
            host,
            port,
            verification_token: "test-verification-token".to_owned(),
            db_path,
            upstream_graphql_url: "http://127.0.0.1:9/graphql".to_owned(),
            upstream_token_url: "http://127.0.0.1:9/oauth/token".to_owned(),
            upstream_credentials: None,
            upstream_timeout: Duration::from_millis(2_000),
            max_body_bytes: 64 * 1024,
            log_filter: "warn".to_owned(),
            json_logs: false,
        }
    }
}

fn normalize_secret(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}

fn resolve_client_credentials(
    client_id: Option<String>,
    client_secret: Option<String>,
) -> Result<Option<UpstreamClientCredentials>, String> {
    match (normalize_secret(client_id), normalize_secret(client_secret)) {
        (Some(client_id), Some(client_secret)) => Ok(Some(UpstreamClientCredentials {
            client_id,
            client_secret,
        })),
        (None, None) => Ok(None),
        _ => Err("set both UPSTREAM_CLIENT_ID and UPSTREAM_CLIENT_SECRET, or neither".to_owned()),
    }
}

fn require_http_url(field: &str, value: String) -> Result<String, String> {
    let parsed = url::Url::parse(value.trim())
        .map_err(|error| format!("{field} is not a valid URL: {error}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("{field} must use http or https"));
    }
    Ok(parsed.to_string())
}
