//! `cursor-watch` — follow a cursor broker from the terminal.
//!
//! Connects with a (possibly generated) client id, prints the peer map as it
//! changes, and accepts line commands on stdin: `ping` sends a free-form
//! message frame, `reconnect` and `close` drive the connection, `quit` exits.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use uuid::Uuid;

use cursor_sync::{ConnState, CursorClient, SyncConfig, load_config};

#[derive(Parser)]
#[command(name = "cursor-watch")]
#[command(about = "Follow a live-cursor broker and print peer state")]
struct Cli {
    /// Broker host (and port), e.g. 127.0.0.1:8787
    #[arg(long)]
    host: Option<String>,

    /// Client session id; a random one is generated when omitted
    #[arg(long)]
    id: Option<String>,

    /// Dial wss:// instead of ws://
    #[arg(long)]
    secure: bool,

    /// Config file (TOML); CURSOR_* env vars layer on top
    #[arg(long, default_value = "cursor.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("cursor_sync=info,cursor_watch=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(id) = cli.id {
        config.client_id = id;
    }
    if config.client_id.is_empty() {
        config.client_id = Uuid::new_v4().to_string();
    }
    if cli.secure {
        config.secure = true;
    }

    info!(id = %config.client_id, url = %config.ws_url(), "starting");

    let client = CursorClient::spawn(config.clone());
    let mut view = client.view();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                print_view(&config.client_id, &client);
            }
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                match line.trim() {
                    "ping" => client.send_chat("Ping").await?,
                    "reconnect" => client.reconnect().await?,
                    "close" => client.close().await?,
                    "quit" | "exit" => break,
                    "" => {}
                    other => eprintln!("unknown command: {other} (ping | reconnect | close | quit)"),
                }
            }
        }
    }

    Ok(())
}

fn print_view(own_id: &str, client: &CursorClient) {
    let view = client.current_view();
    let state = match view.state {
        ConnState::Connecting => "connecting",
        ConnState::Open => "open",
        ConnState::Closing => "closing",
        ConnState::Closed => "closed",
    };
    let traffic = format!(
        "in[{}]{} out[{}]{}",
        view.last_inbound.as_deref().unwrap_or("-"),
        if view.inbound_active { "*" } else { " " },
        view.last_outbound.as_deref().unwrap_or("-"),
        if view.outbound_active { "*" } else { " " },
    );
    println!("{state:10} peers={:3} {traffic}", view.peers.len());
    for peer in view.peers.values() {
        if peer.id == own_id {
            continue;
        }
        if peer.has_position() {
            println!("  {} @ ({:.3}, {:.3})", peer.id, peer.x, peer.y);
        } else {
            println!("  {} (no position yet)", peer.id);
        }
    }
}
