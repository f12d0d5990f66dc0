//! CLI Module
//!
//! Command-line interface for Deckhand using Clap v4. Wizard states are read
//! from TOML files, persisted configurations from JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{Backend, Prerequisites, RecordingBackend};
use crate::canonical::{PersistedConfig, changed_keys, inverse_normalize, synthesize};
use crate::config::Config;
use crate::install::{InstallOrchestrator, InstallationResult, RunStatus};
use crate::remote::{RemoteSessionManager, classify};
use crate::wizard::{self, StepStatus, WizardState};

/// Deckhand - setup wizard engine for an agent runtime
#[derive(Parser, Debug)]
#[command(name = "deckhand")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug mode (writes log files under ~/.deckhand/logs/)
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the visible steps and where the wizard stands
    Steps {
        /// Wizard state file (TOML)
        #[arg(short, long)]
        state: PathBuf,
    },

    /// Move the wizard one step forward
    Next {
        #[arg(short, long)]
        state: PathBuf,

        /// Write the new state back to the file
        #[arg(short, long)]
        write: bool,
    },

    /// Move the wizard one step back
    Back {
        #[arg(short, long)]
        state: PathBuf,

        #[arg(short, long)]
        write: bool,
    },

    /// Print the canonical configuration a state would apply
    Synthesize {
        #[arg(short, long)]
        state: PathBuf,
    },

    /// Compare a state against an installed configuration
    Diff {
        #[arg(short, long)]
        state: PathBuf,

        /// Persisted configuration file (JSON)
        #[arg(short, long)]
        persisted: PathBuf,
    },

    /// Rewrite a raw SSH error the way the operator sees it
    Classify {
        message: String,
    },

    /// Run the install sequence against a recording backend
    Rehearse {
        #[arg(short, long)]
        state: PathBuf,

        /// Installed configuration (JSON) the backend starts with
        #[arg(short, long)]
        persisted: Option<PathBuf>,

        /// Make a backend call fail, e.g. `install_skill:github=404`
        #[arg(short, long = "fail", value_parser = parse_failure)]
        failures: Vec<(String, String)>,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show configuration
    Config,
}

fn parse_failure(value: &str) -> std::result::Result<(String, String), String> {
    let (call, message) = value
        .split_once('=')
        .ok_or_else(|| format!("expected CALL=MESSAGE, got {value:?}"))?;
    if call.trim().is_empty() {
        return Err("call name must not be empty".to_string());
    }
    Ok((call.trim().to_string(), message.to_string()))
}

/// Main CLI entry point
pub async fn run(cli: Cli) -> Result<()> {
    if cli.debug {
        tracing::info!("Debug mode enabled");
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Steps { state } => {
            print!("{}", render_steps(&read_state(&state)?));
            Ok(())
        }
        Commands::Next { state, write } => cmd_move(&state, write, true),
        Commands::Back { state, write } => cmd_move(&state, write, false),
        Commands::Synthesize { state } => {
            let canonical = synthesize(&read_state(&state)?);
            println!("{}", serde_json::to_string_pretty(&canonical)?);
            Ok(())
        }
        Commands::Diff { state, persisted } => {
            let report = render_diff(&read_state(&state)?, &read_persisted(&persisted)?);
            print!("{report}");
            Ok(())
        }
        Commands::Classify { message } => {
            let issue = classify(&message);
            println!("{:?}: {}", issue.kind, issue.message);
            Ok(())
        }
        Commands::Rehearse {
            state,
            persisted,
            failures,
        } => {
            let installed = persisted.as_deref().map(read_persisted).transpose()?;
            cmd_rehearse(&config, &read_state(&state)?, installed, failures).await
        }
        Commands::Init { force } => cmd_init(force),
        Commands::Config => cmd_config(&config),
    }
}

/// Load configuration from file or defaults
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = config_path {
        tracing::info!("Loading configuration from custom path: {}", path.display());
        Config::load_from_path(path)?
    } else {
        tracing::debug!("Loading default configuration");
        Config::load()?
    };

    config.validate()?;
    Ok(config)
}

pub fn read_state(path: &Path) -> Result<WizardState> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    let state: WizardState = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
    Ok(wizard::resolve(state))
}

pub fn write_state(path: &Path, state: &WizardState) -> Result<()> {
    let contents = toml::to_string_pretty(state).context("Failed to serialize wizard state")?;
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write state file: {}", path.display()))
}

pub fn read_persisted(path: &Path) -> Result<PersistedConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read persisted config: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse persisted config: {}", path.display()))
}

fn render_steps(state: &WizardState) -> String {
    let mut out = String::new();
    for (step, status) in wizard::progress(state) {
        let marker = match status {
            StepStatus::Completed => "✓",
            StepStatus::Active => "▶",
            StepStatus::Pending => " ",
        };
        let _ = writeln!(out, "{marker} {}", step.title());
    }
    if state.step == wizard::StepId::Agents
        && let Some(agent) = state.roster.get(state.agent_index)
    {
        let _ = writeln!(
            out,
            "\nConfiguring agent {} of {}: {}",
            state.agent_index + 1,
            state.roster.len(),
            agent.name
        );
    }
    out
}

fn cmd_move(path: &Path, write: bool, forward: bool) -> Result<()> {
    let state = read_state(path)?;
    let moved = if forward {
        wizard::forward(&state)?
    } else {
        wizard::back(&state)
    };
    tracing::debug!("Moved from {:?} to {:?}", state.step, moved.step);
    println!("{}", moved.step.title());

    if write {
        write_state(path, &moved)?;
    }
    Ok(())
}

fn render_diff(state: &WizardState, persisted: &PersistedConfig) -> String {
    let fresh = synthesize(state);
    let stored = inverse_normalize(persisted, fresh.preserve_state);
    let changed = changed_keys(&fresh, &stored);
    if changed.is_empty() {
        return "Configuration unchanged.\n".to_string();
    }

    let mut out = format!("{} changed key(s):\n", changed.len());
    for key in changed {
        let _ = writeln!(out, "  {key}");
    }
    out
}

fn rehearsal_backend(
    state: &WizardState,
    installed: Option<PersistedConfig>,
    failures: Vec<(String, String)>,
) -> RecordingBackend {
    let prerequisites = state.system.unwrap_or(Prerequisites {
        runtime_present: true,
        container_runtime_running: true,
        agent_service_installed: false,
    });
    let mut backend = RecordingBackend::new().with_prerequisites(prerequisites);
    backend = match installed {
        Some(persisted) => backend.with_persisted(persisted),
        None => backend.with_paired(state.is_paired),
    };
    failures
        .into_iter()
        .fold(backend, |backend, (call, message)| backend.fail_on(call, message))
}

fn render_run(result: &InstallationResult) -> String {
    let mut out = result.log_text();
    out.push('\n');
    for warning in &result.warnings {
        let _ = writeln!(out, "⚠️  {warning}");
    }
    if let Some(code) = &result.pairing_code {
        let _ = writeln!(out, "Pairing code: {code}");
    }
    if let Some(url) = &result.dashboard_url {
        let _ = writeln!(out, "Dashboard: {url}");
    }
    out
}

async fn cmd_rehearse(
    config: &Config,
    state: &WizardState,
    installed: Option<PersistedConfig>,
    failures: Vec<(String, String)>,
) -> Result<()> {
    let backend: Arc<dyn Backend> = Arc::new(rehearsal_backend(state, installed, failures));
    let session = Arc::new(RemoteSessionManager::from_config(
        backend.clone(),
        &config.remote,
    ));
    let result = InstallOrchestrator::new(backend, session).run(state).await;

    print!("{}", render_run(&result));
    match (&result.status, &result.failure) {
        (RunStatus::Failed, Some(e)) => anyhow::bail!("Install run {} failed: {e}", result.run_id),
        _ => Ok(()),
    }
}

/// Initialize configuration file
fn cmd_init(force: bool) -> Result<()> {
    println!("⚓ Deckhand Configuration Initialization\n");

    let config_path =
        Config::system_config_path().context("Could not determine config directory")?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        );
    }

    Config::default().save(&config_path)?;

    println!("✅ Configuration initialized at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Adjust [remote] timeouts and [install] default skills if needed");
    println!("   2. Run 'deckhand steps --state wizard.toml' to inspect a wizard state");
    Ok(())
}

/// Show configuration
fn cmd_config(config: &Config) -> Result<()> {
    println!("⚓ Deckhand Configuration\n");
    println!("Log level: {}", config.logging.level);
    if let Some(file) = &config.logging.file {
        println!("Log file: {}", file.display());
    }
    println!("\nRemote:");
    println!("  Connect timeout: {}s", config.remote.connect_timeout_secs);
    println!("  Notice TTL: {}s", config.remote.notice_ttl_secs);
    println!("  Gateway port: {}", config.remote.gateway_port);
    println!("\nInstall:");
    println!("  Config backups kept: {}", config.install.max_config_backups);
    println!("  Default skills: {}", config.install.default_skills.join(", "));
    Ok(())
}
