//! `flightlink` - CLI for the flightlink telemetry link
//!
//! This binary streams telemetry files to a receiver, runs the receiving end,
//! and offers one-shot encode/decode helpers for inspecting frames.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use flightlink::cli::{
    Cli, Command, ConfigCommand, DecodeCommand, EncodeCommand, OutputFormat, ReceiveCommand,
    SendCommand,
};
use flightlink::session::{run_receiver, run_sender};
use flightlink::status::{render_panels, ConnectionState, StatusPanel};
use flightlink::{
    decode, init_logging, Config, Connector, Encoder, FileLineSource, FramedTransport,
    IngestionCounters, TcpConnector, TelemetryListener,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = if cli.loads_config() {
        Config::load_from(cli.config.clone()).context("failed to load configuration")?
    } else {
        Config::default()
    };

    match cli.command {
        Command::Send(cmd) => handle_send(&config, cmd).await,
        Command::Receive(cmd) => handle_receive(&config, cmd).await,
        Command::Encode(cmd) => handle_encode(&config, &cmd),
        Command::Decode(cmd) => handle_decode(&cmd),
        Command::Config(cmd) => handle_config(&config, cli.config, cmd),
    }
}

async fn handle_send(config: &Config, cmd: SendCommand) -> anyhow::Result<()> {
    let Some(path) = cmd.source.or_else(|| config.sender.source_path.clone()) else {
        bail!("no telemetry source given; pass a file or set sender.source_path");
    };
    let tail = cmd
        .tail
        .unwrap_or_else(|| config.sender.tail_number.clone());
    let start = cmd.start_sequence.unwrap_or(config.sender.start_sequence);
    let encoder = Encoder::with_start_sequence(tail, start)?;
    let interval = cmd
        .interval
        .map_or_else(|| config.send_interval(), Duration::from_millis);

    let connector = TcpConnector::new(
        cmd.host.unwrap_or_else(|| config.link.remote_host.clone()),
        cmd.port.unwrap_or(config.link.remote_port),
    );
    let mut transport =
        FramedTransport::new().with_max_frame_len(config.transport.max_frame_len);
    transport
        .connect(&connector)
        .await
        .with_context(|| format!("failed to connect to {}", connector.describe()))?;

    let counters = IngestionCounters::new();
    let source = FileLineSource::new(path);
    let result = run_sender(&source, &encoder, &mut transport, interval, &counters).await;
    transport.close();

    let frames = result.context("telemetry send failed")?;
    println!("Sent {frames} frames as {}", encoder.tail_number());
    Ok(())
}

async fn handle_receive(config: &Config, cmd: ReceiveCommand) -> anyhow::Result<()> {
    let bind = cmd
        .bind
        .unwrap_or_else(|| config.receiver.bind_address.clone());
    let port = cmd.port.unwrap_or(config.receiver.port);
    let listener = TelemetryListener::bind((bind.as_str(), port))
        .await
        .with_context(|| format!("failed to listen on {bind}:{port}"))?
        .with_max_frame_len(config.transport.max_frame_len);
    let local = listener.local_addr()?;

    let counters = Arc::new(IngestionCounters::new());
    let mut panels = StatusPanel::standard_set(ConnectionState::Listening(local));
    let mut sessions = JoinSet::new();
    let mut ticker = tokio::time::interval(config.status_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (mut transport, peer) = accepted?;
                let counters = Arc::clone(&counters);
                sessions.spawn(async move {
                    let result = run_receiver(&mut transport, &counters).await;
                    (peer, result)
                });
                let state = ConnectionState::Connected { peer, sessions: sessions.len() };
                set_connection(&mut panels, state);
            }
            Some(joined) = sessions.join_next() => {
                let (peer, result) = joined.context("receiver task failed")?;
                match result {
                    Ok(_) => info!("Sender {peer} disconnected"),
                    Err(err) => warn!("Session with {peer} ended: {err}"),
                }
                let state = if sessions.is_empty() {
                    ConnectionState::Listening(local)
                } else {
                    ConnectionState::Connected { peer, sessions: sessions.len() }
                };
                set_connection(&mut panels, state);
                if cmd.once {
                    break;
                }
            }
            _ = ticker.tick() => {
                eprint!("{}", render_panels(&mut panels, &counters.snapshot()));
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }
    sessions.abort_all();

    let snapshot = counters.snapshot();
    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Plain => {
            set_connection(&mut panels, ConnectionState::Disconnected);
            print!("{}", render_panels(&mut panels, &snapshot));
        }
    }
    Ok(())
}

fn set_connection(panels: &mut [StatusPanel], state: ConnectionState) {
    for panel in panels {
        panel.set_connection(state);
    }
}

fn handle_encode(config: &Config, cmd: &EncodeCommand) -> anyhow::Result<()> {
    let tail = cmd
        .tail
        .clone()
        .unwrap_or_else(|| config.sender.tail_number.clone());
    let encoder = Encoder::with_start_sequence(tail, cmd.sequence)?;
    let frame = encoder.encode(&cmd.line)?;
    print!("{}", String::from_utf8_lossy(&frame));
    Ok(())
}

fn handle_decode(cmd: &DecodeCommand) -> anyhow::Result<()> {
    let record = decode(cmd.frame.as_bytes()).context("frame rejected")?;
    match cmd.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&record)?),
        OutputFormat::Plain => {
            let readings = record.readings();
            println!("Tail number:  {}", record.tail_number());
            println!("Sequence:     {}", record.sequence());
            println!("Timestamp:    {}", record.timestamp());
            println!(
                "Accel (xyz):  {} {} {}",
                readings.accel_x, readings.accel_y, readings.accel_z
            );
            println!("Weight:       {}", readings.weight);
            println!("Altitude:     {}", readings.altitude);
            println!("Pitch:        {}", readings.pitch);
            println!("Bank:         {}", readings.bank);
            println!("Checksum:     {} (valid)", record.checksum());
        }
    }
    Ok(())
}

fn handle_config(
    config: &Config,
    config_path: Option<PathBuf>,
    cmd: ConfigCommand,
) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Sender]");
                match &config.sender.source_path {
                    Some(path) => println!("  Source path:        {}", path.display()),
                    None => println!("  Source path:        (not set)"),
                }
                println!("  Tail number:        {}", config.sender.tail_number);
                println!("  Start sequence:     {}", config.sender.start_sequence);
                println!("  Send interval (ms): {}", config.sender.send_interval_ms);
                println!();
                println!("[Link]");
                println!(
                    "  Remote:             {}:{}",
                    config.link.remote_host, config.link.remote_port
                );
                println!();
                println!("[Receiver]");
                println!("  Bind:               {}", config.bind_addr());
                println!(
                    "  Status every (ms):  {}",
                    config.receiver.status_interval_ms
                );
                println!();
                println!("[Transport]");
                println!("  Max frame length:   {}", config.transport.max_frame_len);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
