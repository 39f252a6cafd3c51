use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;

use driver_console::config::ConsoleConfig;
use driver_console::console::{NamePrompt, format_driver_name};
use driver_console::{
    ChannelStatus, HttpTransport, LogState, RegistrationClient, RegistrationOutcome,
    StateStreamConsumer, TerminalConsole,
};

#[derive(Parser)]
#[command(name = "driver-console")]
#[command(about = "Live state log and driver registration for the driver-monitoring server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Server base URL (overrides config.toml)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Custom config directory (defaults to ~/.config/driver_console)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream the state log and register names read from stdin (default)
    Console,

    /// Only stream the state log
    Watch,

    /// Show the currently registered driver
    Whoami,

    /// Register a driver name once
    Register(RegisterArgs),
}

#[derive(Parser)]
struct RegisterArgs {
    /// Name to register (prompts when omitted)
    name: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let config = ConsoleConfig::load(cli.config_dir, cli.server)?;
    debug!(base_url = %config.base_url, "configuration loaded");

    match cli.command {
        None | Some(Commands::Console) => console_command(&config).await,
        Some(Commands::Watch) => watch_command(&config).await,
        Some(Commands::Whoami) => whoami_command(&config).await,
        Some(Commands::Register(args)) => register_command(&config, args.name).await,
    }
}

fn init_logging(debug: bool) {
    let default_directive = if debug {
        "driver_console=debug,info"
    } else {
        "driver_console=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn transport(config: &ConsoleConfig) -> HttpTransport {
    HttpTransport::new(config.base_url.clone(), config.endpoints.clone())
}

fn consumer(config: &ConsoleConfig) -> StateStreamConsumer {
    let log = match config.max_log_entries {
        Some(max) => LogState::with_max_entries(max),
        None => LogState::new(),
    };
    StateStreamConsumer::new(log)
}

/// Feed in the background, registration prompts in the foreground. EOF ends the session.
async fn console_command(config: &ConsoleConfig) -> Result<()> {
    let transport = transport(config);
    let client = RegistrationClient::new(transport.clone(), TerminalConsole);
    client.refresh_display().await;

    let mut feed_consumer = consumer(config);
    let feed = tokio::spawn(async move {
        let mut view = TerminalConsole;
        let status = feed_consumer.run(&transport, &mut view).await;
        if status == ChannelStatus::Closed {
            warn!("state feed closed; the log will no longer update");
        }
    });

    let mut prompt = NamePrompt::stdin();
    while let Some(name) = prompt.ask().await {
        let outcome = client.register(Some(name.as_str())).await;
        debug!(?outcome, "registration attempt finished");
    }

    info!("input closed, leaving console");
    feed.abort();
    Ok(())
}

async fn watch_command(config: &ConsoleConfig) -> Result<()> {
    let transport = transport(config);
    let mut feed_consumer = consumer(config);
    let mut view = TerminalConsole;

    feed_consumer.run(&transport, &mut view).await;
    info!(
        entries = feed_consumer.log().len(),
        "state feed closed, stopping"
    );
    Ok(())
}

async fn whoami_command(config: &ConsoleConfig) -> Result<()> {
    let client = RegistrationClient::new(transport(config), TerminalConsole);
    let name = client.fetch_identity().await?;
    println!("{}", format_driver_name(name.as_deref()));
    Ok(())
}

async fn register_command(config: &ConsoleConfig, name: Option<String>) -> Result<()> {
    let client = RegistrationClient::new(transport(config), TerminalConsole);

    let name = match name {
        Some(name) => Some(name),
        None => NamePrompt::stdin().ask().await,
    };

    match client.register(name.as_deref()).await {
        RegistrationOutcome::Registered
        | RegistrationOutcome::AlreadyRegistered
        | RegistrationOutcome::Rejected => Ok(()),
        RegistrationOutcome::Busy => bail!("another registration is in progress"),
        RegistrationOutcome::Failed | RegistrationOutcome::FetchFailed => {
            bail!("driver registration failed")
        }
    }
}
