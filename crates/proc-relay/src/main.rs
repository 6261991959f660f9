//! Process relay binary.
//!
//! Two peers connect over TCP, negotiate which side streams periodic
//! process snapshots, and the other side persists the latest one to a file.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use proc_relay_core::{JsonFileStore, SystemProcessSource};
use proc_relay_session::{
    AdmissionPolicy, DEFAULT_PERIOD, Role, SenderSlot, Session, SessionContext,
};
use tokio::net::{TcpListener, TcpStream};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type RelayContext = SessionContext<SystemProcessSource, JsonFileStore>;

/// Relay periodic process snapshots between two peers over TCP.
#[derive(Debug, Parser)]
#[command(name = "proc-relay", version)]
struct Cli {
    /// Address to connect to (client mode); omit to run as a server
    #[arg(short, long)]
    client: Option<String>,

    /// Port to connect to (client mode) or listen on (server mode)
    #[arg(short, long, default_value_t = 1876)]
    port: u16,

    /// Address allowed to connect (server mode); repeat for multiple
    #[arg(short, long)]
    whitelist: Vec<IpAddr>,

    /// Send our process snapshots to the peer
    #[arg(short, long)]
    send: bool,

    /// File to store received snapshots into
    #[arg(short, long, default_value = "tasks.json")]
    file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let policy = if cli.whitelist.is_empty() {
        AdmissionPolicy::allow_all()
    } else {
        AdmissionPolicy::whitelist(cli.whitelist.iter().copied())
    };

    let ctx = RelayContext {
        send_role: cli.send,
        period: DEFAULT_PERIOD,
        policy,
        source: Arc::new(SystemProcessSource::new()),
        store: Arc::new(JsonFileStore::new(&cli.file)),
        slot: SenderSlot::new(),
    };

    match cli.client {
        Some(host) => {
            if !cli.whitelist.is_empty() {
                tracing::warn!("whitelist has no effect in client mode, ignoring");
            }
            run_client(ctx, &host, cli.port).await
        }
        None => run_server(ctx, cli.port).await,
    }
}

async fn run_client(ctx: RelayContext, host: &str, port: u16) -> anyhow::Result<()> {
    tracing::info!("starting up in client mode to {host}:{port}");

    let stream = TcpStream::connect((host, port))
        .await
        .with_context(|| format!("failed to connect to {host}:{port}"))?;
    let peer = stream.peer_addr().context("peer address unavailable")?;

    Session::new(ctx, Role::Outbound, peer).run(stream).await;
    Ok(())
}

async fn run_server(ctx: RelayContext, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to listen on {addr}"))?;
    tracing::info!("starting up in server mode on port {port}");

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::info!(%peer, "connection accepted");
                let session = Session::new(ctx.clone(), Role::Inbound, peer);
                tokio::spawn(session.run(stream));
            }
            Err(e) => tracing::error!("accept failed: {e}"),
        }
    }
}
