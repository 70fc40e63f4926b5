use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use dialoguer::Input;
use meshlink_client::{Container, DEFAULT_SIGNALING_URL, MeshConfig, Mode, ReadyChannel};
use meshlink_core::{IceServerConfig, Payload, PeerDescriptor};
use meshlink_server::{Heartbeat, SignalingService};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshlink")]
#[command(bin_name = "meshlink")]
#[command(version, about = "Peer-to-peer rooms over WebRTC data channels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling server.
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: SocketAddr,

        /// Seconds between websocket pings. Silent clients are dropped after two.
        #[arg(long, default_value_t = 30)]
        heartbeat: u64,
    },

    /// Join a room and broadcast every line typed on stdin.
    Chat {
        #[arg(long, default_value = DEFAULT_SIGNALING_URL)]
        url: String,

        /// Prompted for when omitted.
        #[arg(long)]
        room: Option<String>,

        /// Random when omitted.
        #[arg(long)]
        id: Option<String>,

        #[arg(long, value_enum, default_value_t = ChatMode::Direct)]
        mode: ChatMode,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ChatMode {
    Direct,
    Relay,
}

impl From<ChatMode> for Mode {
    fn from(mode: ChatMode) -> Self {
        match mode {
            ChatMode::Direct => Mode::Direct,
            ChatMode::Relay => Mode::Relay,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr, heartbeat } => {
            init_tracing("info");
            println!("{}", format!("Signaling server on ws://{}/ws", addr).green().bold());
            SignalingService::new()
                .with_heartbeat(Heartbeat {
                    interval: Duration::from_secs(heartbeat.max(1)),
                    ..Heartbeat::default()
                })
                .serve(addr)
                .await?;
        }
        Commands::Chat {
            url,
            room,
            id,
            mode,
        } => {
            init_tracing("warn");
            let room = match room {
                Some(room) => room,
                None => Input::<String>::new()
                    .with_prompt("Room")
                    .interact_text()
                    .context("Failed to read room name")?,
            };

            let mut config = MeshConfig::new(room)
                .with_mode(mode.into())
                .with_signaling_url(url)
                .with_ice_servers(turn_from_env());
            if let Some(id) = id {
                config = config.with_id(id);
            }

            run_chat(config).await?;
        }
    }

    Ok(())
}

fn init_tracing(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// TURN server from `TURN_URL`, `TURN_USERNAME` and `TURN_CREDENTIAL`.
fn turn_from_env() -> Vec<IceServerConfig> {
    let Ok(url) = std::env::var("TURN_URL") else {
        return Vec::new();
    };
    info!("Using TURN server {}", url);

    vec![IceServerConfig {
        urls: vec![url],
        username: std::env::var("TURN_USERNAME").ok(),
        credential: std::env::var("TURN_CREDENTIAL").ok(),
    }]
}

async fn run_chat(config: MeshConfig) -> Result<()> {
    let container = Container::connect(config)
        .await
        .context("Failed to join the room")?;

    println!(
        "{} {} as {}",
        "Joined".green().bold(),
        container.room_id().to_string().cyan(),
        container.id().to_string().yellow()
    );
    println!("{}", "Type a message and press enter. /links lists peers, /quit leaves.".dimmed());

    let _subscriptions = [
        container.on_join(|peers: &[PeerDescriptor]| {
            for peer in peers {
                println!("{} {}", "+".green(), peer.id.to_string().yellow());
            }
        }),
        container.on_leave(|peer: &PeerDescriptor| {
            println!("{} {}", "-".red(), peer.id.to_string().yellow());
        }),
        container.on_message_channel_ready(|channel: &ReadyChannel| match channel {
            ReadyChannel::Peer(id) => println!("{} {}", "link ready:".dimmed(), id),
            ReadyChannel::Relay => println!("{}", "relay ready".dimmed()),
        }),
        container.on_broadcast(|payload: &Payload| match payload.as_text() {
            Some(text) => println!("{} {}", ">".blue().bold(), text),
            None => println!("{} <{} bytes>", ">".blue().bold(), payload.len()),
        }),
        container.on_error(|e| eprintln!("{} {}", "error:".red().bold(), e)),
    ];

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                match line.trim() {
                    "" => {}
                    "/quit" => break,
                    "/links" => {
                        for link in container.links().await {
                            println!(
                                "  {} {:?} {:?}",
                                link.peer_id.to_string().yellow(),
                                link.channel_state,
                                link.handshake_state
                            );
                        }
                    }
                    text => {
                        container.broadcast(text);
                    }
                }
            }
            _ = container.closed() => {
                println!("{}", "Connection to the signaling server lost".red());
                break;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    container.close();
    println!("{}", "Left the room".green());
    Ok(())
}
