//! `registrar`: terminal enrolment wizard for the public registration forms.
//!
//! # Usage
//!
//! ```
//! registrar --url http://localhost:3000 inscription
//! registrar --config ~/.config/registrar/cli.toml examen
//! ```
//!
//! Answers are saved as a JSON draft after every field, so quitting (or
//! losing the terminal) and running the same command again resumes the form.

mod client;
mod draft;
mod wizard;

use std::{io, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::ApiClient;
use draft::FileDraftStore;
use registrar_core::{
  examen::ExamenRequest,
  form::MultiStepForm,
  inscription::NewInscription,
};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use wizard::{EXAMEN_STEPS, INSCRIPTION_STEPS, LineConsole, Outcome};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "registrar", about = "Enrolment wizard for the registration API")]
struct Args {
  /// Path to a TOML config file (url, draft_dir).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the registrar server (default: http://localhost:3000).
  #[arg(long, env = "REGISTRAR_URL")]
  url: Option<String>,

  /// Directory holding in-progress drafts (default: .registrar).
  #[arg(long, value_name = "DIR")]
  draft_dir: Option<PathBuf>,

  #[command(subcommand)]
  form: FormKind,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum FormKind {
  /// Register for a training.
  Inscription,
  /// Register for an exam.
  Examen,
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:       String,
  draft_dir: Option<PathBuf>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr so they never interleave with the prompts.
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let base_url = args
    .url
    .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
    .unwrap_or_else(|| "http://localhost:3000".to_string());
  let draft_dir = args
    .draft_dir
    .or(file_cfg.draft_dir)
    .unwrap_or_else(|| PathBuf::from(".registrar"));

  let client = ApiClient::new(base_url)?;
  match args.form {
    FormKind::Inscription => inscription(&client, draft_dir).await,
    FormKind::Examen => examen(&client, draft_dir).await,
  }
}

fn stdio_console() -> LineConsole<io::StdinLock<'static>, io::Stdout> {
  LineConsole::new(io::stdin().lock(), io::stdout())
}

async fn inscription(client: &ApiClient, draft_dir: PathBuf) -> Result<()> {
  let formations = client.list_formations().await?;
  let store = FileDraftStore::<NewInscription>::new(draft_dir.join("inscription.json"));
  let mut form = MultiStepForm::new(INSCRIPTION_STEPS.len(), store);

  let outcome = tokio::task::block_in_place(|| {
    wizard::run_inscription(&mut stdio_console(), &mut form, &formations)
  })
  .context("reading answers")?;
  if outcome == Outcome::Quit {
    println!("Draft kept; run the same command to resume.");
    return Ok(());
  }

  let input = form.draft().clone().normalize();
  let row_index = client.submit_inscription(&input).await?;
  form.finish();
  println!("Registration received (no. {row_index}). We will contact you shortly.");
  Ok(())
}

async fn examen(client: &ApiClient, draft_dir: PathBuf) -> Result<()> {
  let types = client.list_exam_types().await?;
  let store = FileDraftStore::<ExamenRequest>::new(draft_dir.join("examen.json"));
  let mut form = MultiStepForm::new(EXAMEN_STEPS.len(), store);

  let outcome = tokio::task::block_in_place(|| {
    wizard::run_examen(&mut stdio_console(), &mut form, &types)
  })
  .context("reading answers")?;
  if outcome == Outcome::Quit {
    println!("Draft kept; run the same command to resume.");
    return Ok(());
  }

  let input = form.draft().clone().normalize();
  let created = client.submit_examen(&input).await?;
  form.finish();
  tracing::debug!(examen_id = created.id, token = %created.token, "examen registered");
  println!("Exam registration received. Choose your exam and time slot at:\n  {}", created.url);
  Ok(())
}
