//! Debug Console
//!
//! Connects to a debug server's channel endpoints, prints everything the
//! server streams back and forwards operator input: plain lines go to
//! `rcon`, `:exec`/`:eval`/`:run` go to `repl`.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dc_client::input::{Input, HELP};
use dc_client::{ChannelClient, ClientEvent, ConsoleSink, WebSocketTransport};
use dc_core::config::{self, ClientConfig, ConnectionMode};
use dc_core::AddressTemplate;
use dc_protocol::{ChannelName, PacketKind, ReplRequest};

#[derive(Parser)]
#[command(name = "debug-console")]
#[command(about = "Remote debug console - log, rcon and repl channels over WebSocket")]
#[command(version)]
struct Args {
    /// Endpoint address; {channel} is replaced by each channel name
    /// Example: ws://localhost:32081/{channel}
    #[arg(short, long)]
    address: Option<String>,

    /// Channel to open (repeatable, defaults to log, rcon and repl)
    #[arg(short = 'C', long = "channel")]
    channels: Vec<String>,

    /// Carry every channel on one connection
    #[arg(long)]
    shared: bool,

    /// Reconnect dropped connections with backoff
    #[arg(long)]
    reconnect: bool,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Print server markup untouched
    #[arg(long)]
    raw: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so they never interleave with console output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&args)?;
    tracing::info!("Debug console starting with {} channel(s)", config.channels.len());

    let transport = Arc::new(WebSocketTransport::new(config.connect_timeout));
    let mut client = ChannelClient::new(config, transport).context("Invalid configuration")?;

    let log = Arc::new(ConsoleSink::new("log", args.raw));
    client.register_sink(PacketKind::Log, log.clone());
    client.register_sink(PacketKind::Rcon, log.clone());
    client.register_sink(PacketKind::Repl, Arc::new(ConsoleSink::new("repl", args.raw)));
    client.register_fallback_sink(log);

    client
        .start_configured()
        .context("Failed to start channels")?;

    let mut lines = spawn_stdin_reader();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            line = lines.recv(), if stdin_open => match line {
                Some(Ok(line)) => {
                    if !handle_input(&client, Input::parse(&line)).await {
                        break;
                    }
                }
                None => {
                    tracing::debug!("stdin closed");
                    stdin_open = false;
                }
                Some(Err(e)) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
            event = client.next_event() => match event {
                Some(ClientEvent::ReconnectAbandoned { endpoint, .. }) => {
                    tracing::warn!(endpoint = %endpoint, "Endpoint abandoned");
                    if all_closed(&client) {
                        break;
                    }
                }
                Some(event) => tracing::trace!(?event, "Client event"),
                None => break,
            },
        }

        if !stdin_open && all_closed(&client) && !client.config().reconnect.enabled {
            break;
        }
    }

    client.shutdown();
    tracing::info!("Debug console exiting");
    Ok(())
}

/// Read stdin on a dedicated thread so a pending read never holds up exit
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Load the configuration file and apply command-line overrides
fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => {
            let path = config::default_config_path();
            if path.exists() {
                config::load_config(&path).unwrap_or_else(|e| {
                    tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    ClientConfig::default()
                })
            } else {
                ClientConfig::default()
            }
        }
    };

    if let Some(address) = &args.address {
        config.address = AddressTemplate::new(address.clone());
    }
    if !args.channels.is_empty() {
        config.channels = args.channels.iter().map(|c| ChannelName::from(c.as_str())).collect();
    }
    if args.shared {
        config.mode = ConnectionMode::Shared;
    }
    if args.reconnect {
        config.reconnect.enabled = true;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Act on one line of input; false means leave
async fn handle_input(client: &ChannelClient, input: Input) -> bool {
    let result: Result<()> = match input {
        Input::Empty => Ok(()),
        Input::Quit => return false,
        Input::Status => {
            for channel in client.channels() {
                println!(
                    "{:<8} {:<10} {}",
                    channel.name().to_string(),
                    channel.state().to_string(),
                    channel.url()
                );
            }
            Ok(())
        }
        Input::Unknown(line) => {
            eprintln!("unknown directive: {}\n{}", line, HELP);
            Ok(())
        }
        Input::Rcon(line) => client.send(line, ChannelName::RCON).map_err(Into::into),
        Input::Exec(code) => client
            .send(ReplRequest::exec(code), ChannelName::REPL)
            .map_err(Into::into),
        Input::Eval(expr) => client
            .send(ReplRequest::eval(expr), ChannelName::REPL)
            .map_err(Into::into),
        Input::RunFile(path) => run_file(client, &path).await,
    };

    if let Err(e) = result {
        eprintln!("error: {:#}", e);
    }
    true
}

async fn run_file(client: &ChannelClient, path: &Path) -> Result<()> {
    let code = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    client.send(ReplRequest::exec(code), ChannelName::REPL)?;
    Ok(())
}

fn all_closed(client: &ChannelClient) -> bool {
    client
        .channels()
        .iter()
        .all(|channel| channel.state().is_terminal())
}
