//! registrar server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) and `REGISTRAR_*`
//! environment variables, opens the SQLite store, and serves the API over
//! HTTP.
//!
//! # First admin account
//!
//! The admin API needs at least one account. Create it with:
//!
//! ```
//! cargo run -p registrar-server --bin server -- --create-admin admin@example.fr
//! ```
//!
//! The password is read from stdin.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use registrar_core::{
  store::UserStore as _,
  user::{NewUserRecord, Role},
  validate::normalize_email,
};
use registrar_server::{AppState, ServerConfig, auth::hash_password};
use registrar_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Training-centre registration server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create an admin account with this email, reading its password on stdin,
  /// then exit.
  #[arg(long, value_name = "EMAIL")]
  create_admin: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("REGISTRAR").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if let Some(email) = cli.create_admin {
    return create_admin(&store, &email).await;
  }

  if server_cfg.cron_secret.is_none() {
    tracing::warn!("cron_secret is not set; /api/cron endpoints will refuse every call");
  }

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let app = registrar_server::router(AppState::new(store, server_cfg));

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn create_admin(store: &SqliteStore, email: &str) -> anyhow::Result<()> {
  let password = read_password()?;
  anyhow::ensure!(password.len() >= 8, "password must be at least 8 characters");

  let password_hash =
    hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
  let user = store
    .create_user(NewUserRecord {
      email: normalize_email(email),
      display_name: "Administrateur".to_owned(),
      role: Role::Admin,
      location: None,
      password_hash,
    })
    .await
    .context("failed to create admin account")?;

  println!("created admin account {} (id {})", user.email, user.id);
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
