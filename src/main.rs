use clap::Parser;
use orbis::{Registry, Repos, config::Config, game, net};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

#[derive(Debug, Parser)]
#[command(name = "orbis", version, about = "Multiplayer space game server")]
struct Args {
    /// TOML configuration file; environment variables are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on, keeping the configured host
    #[arg(short, long)]
    port: Option<u16>,

    /// Number of connection slots
    #[arg(long)]
    max_clients: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if let Some(port) = args.port {
        cfg.set_port(port)?;
    }
    if let Some(max_clients) = args.max_clients {
        cfg.max_clients = max_clients;
    }
    cfg.validate()?;
    let cfg = Arc::new(cfg);

    let listener = TcpListener::bind(cfg.socket_addr()?).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        max_clients = cfg.max_clients,
        data_dir = %cfg.data_dir.display(),
        "orbis server listening"
    );

    let registry = Registry::new(cfg.clone(), Repos::open(&cfg));
    let (events_tx, events_rx) = mpsc::channel(cfg.event_queue);

    let listener_jh = tokio::spawn(net::serve(listener, events_tx, cfg.clone()));

    game::run(registry, events_rx, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    })
    .await;

    // give writers a moment to flush their last frames
    match tokio::time::timeout(Duration::from_secs(5), listener_jh).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "listener task failed"),
        Err(_) => tracing::warn!("connections still open after 5s, exiting anyway"),
    }

    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, prelude::*};

    color_eyre::install().map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::uptime()),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();

    Ok(())
}
