mod logging;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use netdesk_client::{Session, factory};
use netdesk_config::Config;
use netdesk_store::{SqliteCredentialStore, sqlite::DEFAULT_PROFILE};
use netdesk_types::ApiRequest;
use std::{path::PathBuf, sync::Arc, time::UNIX_EPOCH};

#[derive(Parser, Debug)]
#[command(name = "netdesk", about = "netdesk: ISP management API client")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
    /// SQLite database path (default: ~/.netdesk/credentials.db).
    #[arg(long, value_name = "PATH", global = true)]
    db: Option<PathBuf>,
    /// Credential profile; each profile is an independent session.
    #[arg(long, default_value = DEFAULT_PROFILE, global = true)]
    profile: String,
    /// Tenant slug; overrides the configured tenant.
    #[arg(long, global = true)]
    tenant: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and store the token pair.
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "NETDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Revoke the session and remove stored credentials.
    Logout,
    /// Show the stored session.
    Status,
    /// Send an authenticated request and print the response body.
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE).
        method: String,
        /// Path relative to the base URL, e.g. `/subscribers?page=2`.
        path: String,
        /// JSON request body.
        #[arg(short, long)]
        data: Option<String>,
        /// Treat the endpoint as a polling endpoint (a 429 is not retried).
        #[arg(long)]
        poll: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("config error")?;
    if let Some(tenant) = cli.tenant {
        config.tenant = Some(tenant);
    }
    let _guard = logging::init_tracing(&config.log);

    let store = Arc::new(open_store(cli.db, &cli.profile).await?);
    let pipeline = factory::build(&config, store).context("client setup failed")?;
    let session = Session::new(pipeline, &config.auth);

    match cli.command {
        Commands::Login { username, password } => cmd_login(&session, &username, &password).await,
        Commands::Logout => cmd_logout(&session).await,
        Commands::Status => cmd_status(&session, &cli.profile).await,
        Commands::Request {
            method,
            path,
            data,
            poll,
        } => cmd_request(&session, &method, path, data, poll).await,
    }
}

async fn cmd_login(session: &Session, username: &str, password: &str) -> Result<()> {
    session
        .login(username, password)
        .await
        .context("login failed")?;
    eprintln!("signed in as {username}");
    Ok(())
}

async fn cmd_logout(session: &Session) -> Result<()> {
    session.logout().await.context("logout failed")?;
    eprintln!("signed out");
    Ok(())
}

async fn cmd_status(session: &Session, profile: &str) -> Result<()> {
    let status = session.status().await?;
    println!("profile: {profile}");
    println!(
        "tenant: {}",
        status.tenant.as_deref().unwrap_or("(platform)")
    );
    if !status.signed_in {
        println!("session: not signed in");
        return Ok(());
    }
    println!("session: signed in");
    println!("refresh token: {}", if status.has_refresh_token { "yes" } else { "no" });
    match status.expires_at.and_then(|t| t.duration_since(UNIX_EPOCH).ok()) {
        Some(exp) => println!(
            "access token expires: {} (unix){}",
            exp.as_secs(),
            if status.expiring_soon { ", refresh due" } else { "" }
        ),
        None => println!("access token expires: unknown"),
    }
    Ok(())
}

async fn cmd_request(
    session: &Session,
    method: &str,
    path: String,
    data: Option<String>,
    poll: bool,
) -> Result<()> {
    let method = http::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method '{method}'"))?;
    let mut request = ApiRequest::new(method, path);
    if let Some(data) = data {
        let body: serde_json::Value =
            serde_json::from_str(&data).context("--data is not valid JSON")?;
        request = request.with_json(body);
    }
    if poll {
        request = request.polling();
    }

    let response = session.pipeline().execute(request).await?;
    match response.json::<serde_json::Value>() {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", response.text()),
    }
    Ok(())
}

async fn open_store(db: Option<PathBuf>, profile: &str) -> Result<SqliteCredentialStore> {
    let path = db.unwrap_or_else(default_db_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let url = format!("sqlite://{}", path.display());
    SqliteCredentialStore::new(&url, profile)
        .await
        .map_err(|e| anyhow::anyhow!("database error: {e}"))
}

fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".netdesk").join("credentials.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_request_with_globals() {
        let cli = Cli::try_parse_from([
            "netdesk", "request", "post", "/tickets", "--data", "{}", "--tenant", "fibernet",
            "--profile", "noc",
        ])
        .unwrap();
        assert_eq!(cli.tenant.as_deref(), Some("fibernet"));
        assert_eq!(cli.profile, "noc");
        assert!(matches!(cli.command, Commands::Request { poll: false, .. }));
    }

    #[test]
    fn test_default_db_path() {
        assert!(default_db_path().ends_with(".netdesk/credentials.db"));
    }
}
