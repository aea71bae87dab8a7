use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use voicebot::app::{resolve_config, run_say_command, run_translate_command, run_turn_command};
use voicebot::cli::{Cli, Commands, ConfigAction, ModelsAction};
use voicebot::config::Config;
use voicebot::generate::list_generator_models;
use voicebot::models::download::{download_model, format_catalog, list_installed_models};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    tracing::debug!(version = %voicebot::version_string(), "starting");

    match cli.command {
        Commands::Turn {
            audio,
            html_out,
            json,
        } => {
            let config = load_config(&cli.config, cli.language.as_deref(), cli.max_length)?;
            run_turn_command(config, audio, html_out, json, cli.quiet, cli.no_download).await?;
        }
        Commands::Translate { text, from, to } => {
            let config = load_config(&cli.config, cli.language.as_deref(), cli.max_length)?;
            run_translate_command(config, text, from, to).await?;
        }
        Commands::Say { text, out } => {
            let config = load_config(&cli.config, cli.language.as_deref(), cli.max_length)?;
            run_say_command(config, text, out, cli.quiet).await?;
        }
        Commands::Models { action } => {
            handle_models_command(action).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, &cli.config, cli.language.as_deref(), cli.max_length)?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "voicebot", &mut std::io::stdout());
        }
    }

    Ok(())
}

/// Route `tracing` output to stderr. `RUST_LOG` wins over the flags.
fn init_logging(verbose: u8, quiet: bool) {
    let default_filter = match (quiet, verbose) {
        (true, _) => "voicebot=warn",
        (false, 0) => "voicebot=info",
        (false, 1) => "voicebot=debug",
        (false, _) => "voicebot=trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load configuration from file or use defaults.
///
/// Priority order (later wins):
/// 1. Built-in defaults
/// 2. Config file (--config, or ~/.config/voicebot/config.toml if present)
/// 3. Environment variables (VOICEBOT_*)
/// 4. Command-line flags
fn load_config(
    custom_path: &Option<std::path::PathBuf>,
    language: Option<&str>,
    max_length: Option<usize>,
) -> Result<Config> {
    let config = match custom_path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    let config = config.with_env_overrides()?;
    Ok(resolve_config(config, language, max_length)?)
}

/// Handle model management commands.
async fn handle_models_command(action: ModelsAction) -> Result<()> {
    match action {
        ModelsAction::List => {
            println!("Whisper models (recognizer.backend = \"whisper\"):");
            for line in format_catalog() {
                println!("  {line}");
            }

            let installed = list_installed_models();
            if !installed.is_empty() {
                println!();
                println!("Installed: {}", installed.join(", ").green());
            }

            println!();
            println!("Generator models (resolved through the HuggingFace cache):");
            for model in list_generator_models() {
                println!(
                    "  {:14} {:5} MB   {}",
                    model.name,
                    model.size_mb,
                    model.display_name.dimmed()
                );
            }
        }
        ModelsAction::Install { name } => {
            let path = download_model(&name, true).await?;
            println!("Model '{}' installed successfully", name);
            println!("Location: {}", path.display());
        }
    }
    Ok(())
}

/// Handle configuration commands.
fn handle_config_command(
    action: ConfigAction,
    custom_path: &Option<std::path::PathBuf>,
    language: Option<&str>,
    max_length: Option<usize>,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(custom_path, language, max_length)?;
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Path => {
            let path = custom_path.clone().unwrap_or_else(Config::default_path);
            let status = if path.exists() {
                "exists".green().to_string()
            } else {
                "not found, using defaults".dimmed().to_string()
            };
            println!("{} ({})", path.display(), status);
        }
    }
    Ok(())
}
