use anyhow::Result;
use clap::Parser;
use lst_mock::config::{ServerConfig, TcpConfig, DEFAULT_HOST, DEFAULT_PORT};
use lst_mock::transport::{
    SerialAcceptor, SerialSettings, TcpAcceptor, TransportAcceptor, DEFAULT_BAUD_RATE,
};
use lst_mock::{CommandEngine, DeviceState, LineServer};
use lst_shared::device::DEFAULT_DEVICE_NUMBER;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "lst-mock")]
#[command(about = "Mock linear-stage controller speaking the ASCII line protocol", long_about = None)]
struct Cli {
    /// TCP listen address
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// TCP listen port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Device number echoed in every reply
    #[arg(long, default_value_t = DEFAULT_DEVICE_NUMBER, value_parser = clap::value_parser!(u32).range(1..))]
    device_number: u32,

    /// Also serve on this serial device (e.g. one end of a pty pair)
    #[arg(long)]
    serial: Option<String>,

    /// Serial line speed
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    baud_rate: u32,

    /// Drop clients that send nothing for this many seconds
    #[arg(long)]
    read_timeout_secs: Option<u64>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            device_number: self.device_number,
            tcp: TcpConfig {
                host: self.host,
                port: self.port,
            },
            serial: self
                .serial
                .map(|port| SerialSettings::new(port, self.baud_rate)),
            read_timeout: self.read_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(log_filter(cli.log_level, &directives))
        .init();

    run(cli.into_config()).await
}

/// `RUST_LOG`-style directives, falling back to `default_level` when empty
fn log_filter(default_level: Level, directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .parse_lossy(directives)
}

async fn run(config: ServerConfig) -> Result<()> {
    info!("Mock controller starting: device {}", config.device_number);

    let engine = CommandEngine::new(DeviceState::new(config.device_number)).into_shared();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();

    let acceptor = TcpAcceptor::bind(&config.tcp)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", config.tcp.address(), e))?;
    info!("  TCP: {}", acceptor.describe());
    let mut tcp_server = LineServer::new(acceptor, engine.clone())
        .with_read_timeout(config.read_timeout);
    let rx = shutdown_rx.clone();
    tasks.push(tokio::spawn(async move {
        tcp_server.run_until(wait_for_shutdown(rx)).await
    }));

    if let Some(settings) = config.serial {
        let acceptor = SerialAcceptor::new(settings);
        info!("  Serial: {}", acceptor.describe());
        let mut serial_server = LineServer::new(acceptor, engine.clone())
            .with_read_timeout(config.read_timeout);
        let rx = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            serial_server.run_until(wait_for_shutdown(rx)).await
        }));
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    let _ = shutdown_tx.send(true);

    for task in tasks {
        task.await??;
    }

    info!("Mock controller stopped");
    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}
