mod cli;

use std::path::{Path, PathBuf};

use a2v_av::{encode_voice, probe_duration, ToolRegistry, ToolRunner};
use a2v_core::config::Config;
use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use tokio_util::sync::CancellationToken;

async fn start_bot(
    mut config: Config,
    token: Option<String>,
    webhook_url: Option<String>,
    port: Option<u16>,
    debug: bool,
) -> Result<()> {
    if token.is_some() {
        config.telegram.token = token;
    }
    if webhook_url.is_some() {
        config.telegram.webhook_url = webhook_url;
    }
    if let Some(port) = port {
        config.telegram.port = port;
    }
    config.telegram.debug |= debug;

    for warning in config.validate() {
        tracing::warn!("{}", warning);
    }
    config.check().context("Cannot start bot")?;

    tracing::info!("Starting audio2voice");

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        a2v_bot::shutdown_signal().await;
        signal_cancel.cancel();
    });

    a2v_bot::start(config, cancel).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "audio2voice=trace,a2v_core=trace,a2v_av=trace,a2v_pipeline=trace,a2v_bot=trace,tower_http=debug"
                .to_string()
        } else {
            "audio2voice=debug,a2v_core=debug,a2v_av=debug,a2v_pipeline=debug,a2v_bot=debug,tower_http=info"
                .to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start {
            token,
            webhook_url,
            port,
            debug,
        } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_bot(config, token, webhook_url, port, debug))
        }
        Commands::Convert { input, output } => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_file(&config, &input, output))
        }
        Commands::CheckTools => {
            let config = Config::load_or_default(cli.config.as_deref())?;
            check_tools(&config)
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("audio2voice {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn convert_file(config: &Config, input: &Path, output: Option<PathBuf>) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }
    let output = output.unwrap_or_else(|| input.with_extension("ogg"));
    if output == input {
        anyhow::bail!("Output would overwrite the input: {:?}", output);
    }

    let tools = ToolRegistry::discover(&config.tools);
    let ffmpeg = tools.ffmpeg()?;
    let runner = ToolRunner;
    let deadline = tokio::time::Instant::now() + config.pool.job_timeout();

    tracing::info!("Converting {:?} -> {:?}", input, output);
    encode_voice(&runner, ffmpeg, input, &output, deadline)
        .await
        .context("Conversion failed")?;

    let duration = match tools.ffprobe() {
        Ok(ffprobe) => probe_duration(&runner, ffprobe, &output, deadline).await,
        Err(e) => Err(e),
    };
    println!("Output: {}", output.display());
    match duration {
        Ok(secs) => println!("Duration: {}s", secs),
        Err(e) => {
            tracing::warn!("Could not read duration: {}", e);
            println!("Duration: unknown");
        }
    }

    Ok(())
}

fn check_tools(config: &Config) -> Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install ffmpeg to enable conversions.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            Config::load(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!(
        "  Mode: {}",
        if config.telegram.debug || config.telegram.webhook_url.is_none() {
            "polling"
        } else {
            "webhook"
        }
    );
    println!("  Webhook port: {}", config.telegram.port);
    println!("  Queue capacity: {}", config.pool.capacity());
    println!("  Workers: {}", config.pool.worker_count());
    println!("  Job timeout: {:?}", config.pool.job_timeout());
    println!(
        "  Max in-flight messages: {}",
        config.transport.max_inflight_messages
    );

    let warnings = config.validate();
    if !warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &warnings {
            println!("  ! {}", warning);
        }
    }

    Ok(())
}
