use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use huddle::client::{Call, CallEvent, ClientConfig, EngineEvent, LocalMedia, RosterChange};
use huddle::model::IceServerConfig;
use huddle::relay::{DEFAULT_MAX_PARTICIPANTS, RelayConfig, RelayService, serve};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(about = "Small-room WebRTC calls over a websocket relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling relay.
    Relay {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        #[arg(long, default_value_t = DEFAULT_MAX_PARTICIPANTS)]
        max_participants: usize,
    },
    /// Join a room as a participant. Unset flags fall back to HUDDLE_* variables.
    Join {
        #[arg(long)]
        url: Option<String>,

        #[arg(long)]
        room: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long = "stun")]
        stun: Vec<String>,

        #[arg(long)]
        join_timeout_ms: Option<u64>,

        /// Never attach local tracks. We only answer offers.
        #[arg(long)]
        no_media: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Relay {
            bind,
            max_participants,
        } => run_relay(RelayConfig {
            bind,
            max_participants,
        })
        .await,
        Commands::Join {
            url,
            room,
            name,
            stun,
            join_timeout_ms,
            no_media,
        } => {
            let mut config = ClientConfig::from_env();
            if let Some(url) = url {
                config.signaling_url = url;
            }
            if let Some(room) = room {
                config.room_id = room;
            }
            if let Some(name) = name {
                config.display_name = name;
            }
            if !stun.is_empty() {
                config.ice_servers = stun.into_iter().map(IceServerConfig::stun).collect();
            }
            if let Some(timeout) = join_timeout_ms {
                config.join_timeout_ms = timeout;
            }
            run_join(config, !no_media).await
        }
    }
}

async fn run_relay(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    println!(
        "{} {}",
        "📡 Relay listening on".green().bold(),
        format!("ws://{}/ws", config.bind).cyan()
    );

    let service = RelayService::new(config);
    tokio::select! {
        result = serve(listener, service) => result?,
        _ = tokio::signal::ctrl_c() => println!("{}", "Relay stopped".yellow()),
    }
    Ok(())
}

async fn run_join(config: ClientConfig, with_media: bool) -> Result<()> {
    println!(
        "{} {} as {} ({})",
        "🚀 Joining".green().bold(),
        config.room_id.cyan(),
        config.display_name.cyan(),
        config.participant_id
    );

    let (call, mut events) = Call::join(config)
        .await
        .context("Failed to join the room")?;

    if with_media {
        call.set_local_media(LocalMedia::placeholder(call.room().local_id().as_str()))?;
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("{}", "👋 Leaving...".yellow());
    call.leave().await?;
    Ok(())
}

fn print_event(event: &CallEvent) {
    match event {
        CallEvent::Roster(change) => match change {
            RosterChange::Joined => println!("{}", "✔ Joined room".green()),
            RosterChange::Snapshot(count) => {
                println!("{} {}", "Participants already here:".cyan(), count)
            }
            RosterChange::Added(record) => {
                println!("{} {} ({})", "+".green().bold(), record.name, record.user_id)
            }
            RosterChange::Removed(id) => println!("{} {}", "-".red().bold(), id),
            RosterChange::MediaChanged(record) => println!(
                "{} {} audio={} video={}",
                "~".cyan(),
                record.user_id,
                record.audio_enabled,
                record.video_enabled
            ),
            RosterChange::Error(error) => println!("{} {}", "Relay error:".red().bold(), error),
            RosterChange::Unchanged => {}
        },
        CallEvent::Engine(event) => match event {
            EngineEvent::RoleDecided(role) => println!("{} {:?}", "Role:".cyan(), role),
            EngineEvent::RemoteTrack { participant, track } => println!(
                "{} {:?} track from {}",
                "🎧".green(),
                track.kind(),
                participant
            ),
            EngineEvent::SessionConnected(id) => {
                println!("{} {}", "Connected to".green().bold(), id)
            }
            EngineEvent::SessionClosed(id) => println!("{} {}", "Session closed:".yellow(), id),
            EngineEvent::SessionFailed {
                participant,
                reason,
            } => println!(
                "{} {} ({})",
                "Session failed:".red().bold(),
                participant,
                reason
            ),
            EngineEvent::SignalingLost => println!("{}", "Lost the relay connection".red()),
        },
    }
}
