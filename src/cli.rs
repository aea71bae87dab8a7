//! Command-line interface for voicebot
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Multilingual voice chatbot
#[derive(Parser, Debug)]
#[command(
    name = "voicebot",
    version,
    about = "Talk to a chatbot in your own language"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Conversation language (default: de). Examples: de, fr, es, pt-BR
    #[arg(long, short = 'l', global = true, value_name = "LANG")]
    pub language: Option<String>,

    /// Maximum number of tokens in a generated response (default: 100)
    #[arg(long, global = true, value_name = "TOKENS")]
    pub max_length: Option<usize>,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Prevent automatic model download if a configured model is missing
    #[arg(long, global = true)]
    pub no_download: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one conversational turn on a WAV recording
    Turn {
        /// WAV file with the user's utterance
        #[arg(value_name = "WAV")]
        audio: PathBuf,

        /// Write the playback markup to this file instead of stdout
        #[arg(long, value_name = "PATH")]
        html_out: Option<PathBuf>,

        /// Print the whole outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Translate text with the configured translator
    Translate {
        /// Text to translate
        text: String,

        /// Source language (default: the conversation language)
        #[arg(long, value_name = "LANG")]
        from: Option<String>,

        /// Target language (default: the pivot language)
        #[arg(long, value_name = "LANG")]
        to: Option<String>,
    },

    /// Speak text with the configured synthesizer
    Say {
        /// Text to speak, in the conversation language
        text: String,

        /// Write the raw audio here (default: print playback markup)
        #[arg(long, short = 'o', value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Manage Whisper models for the local recognizer
    Models {
        /// Action to perform
        #[command(subcommand)]
        action: ModelsAction,
    },

    /// View configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Model management actions
#[derive(Subcommand, Debug)]
pub enum ModelsAction {
    /// List Whisper and generator models
    List,

    /// Download and install a Whisper model
    Install {
        /// Model name (e.g., base, small, tiny.en)
        name: String,
    },
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective configuration (file, env and flags applied)
    Show,

    /// Print the configuration file path
    Path,
}
