use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "audio2voice")]
#[command(author, version, about = "Telegram bot that converts audio files into voice messages")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the bot and process incoming audio
    Start {
        /// Bot API token
        #[arg(long, env = "TG_A2V_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Public HTTPS URL to register as webhook (polling if unset)
        #[arg(long, env = "TG_A2V_WEBHOOK_URL")]
        webhook_url: Option<String>,

        /// Port for the webhook listener
        #[arg(short, long, env = "TG_A2V_PORT")]
        port: Option<u16>,

        /// Force polling and log every raw update
        #[arg(long)]
        debug: bool,
    },

    /// Convert a local audio file into a voice message file
    Convert {
        /// Audio file to convert
        #[arg(required = true)]
        input: PathBuf,

        /// Output path (defaults to the input name with .ogg)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
