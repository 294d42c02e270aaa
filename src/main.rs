/*!
 * ksocket - Command Line Entry Point
 *
 * Runs the sample services over the host stack:
 * - tcp-server: accept clients and log one message from each
 * - udp-server: acknowledge every datagram
 * - udp-client: send one datagram and wait for the reply
 * - tcp-client: connect and send one message
 */

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use ksocket::{
    init_tracing, MsgFlags, Protocol, SocketAddress, SocketConfig, SocketKind, SocketManager,
    SocketType, TcpServer, TcpServerConfig, UdpClient, UdpClientConfig, UdpEchoServer,
    UdpServerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "ksocket", version, about = "BSD-style sockets over an in-process stack")]
struct Cli {
    /// JSON file with socket-layer settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Accept clients and log the first message from each
    TcpServer {
        #[arg(long, default_value = "0.0.0.0:12345")]
        bind: SocketAddr,
        #[arg(long, default_value_t = 5)]
        backlog: i32,
        /// Stop after this many seconds instead of running forever
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Reply to every datagram with an acknowledgement
    UdpServer {
        #[arg(long, default_value = "0.0.0.0:4444")]
        bind: SocketAddr,
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Send one datagram and print the reply
    UdpClient {
        #[arg(long, default_value = "127.0.0.1:4444")]
        server: SocketAddr,
        #[arg(long, default_value = "Hello from UDP Client")]
        message: String,
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },
    /// Connect and send one message
    TcpClient {
        #[arg(long, default_value = "127.0.0.1:12345")]
        server: SocketAddr,
        #[arg(long, default_value = "Hello from TCP Client")]
        message: String,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SocketConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SocketConfig::from_env().context("reading environment")?,
    };
    let manager = SocketManager::host(config);

    match cli.command {
        Command::TcpServer {
            bind,
            backlog,
            duration,
        } => {
            let config = TcpServerConfig {
                bind,
                backlog,
                ..TcpServerConfig::default()
            };
            let server = TcpServer::start(manager, config).context("starting TCP server")?;
            run_for(duration, || {
                let stats = server.stats();
                info!(
                    connections = stats.connections,
                    messages = stats.messages,
                    "TCP server running"
                );
            });
            let stats = server.stop()?;
            info!(messages = stats.messages, "TCP server finished");
        }
        Command::UdpServer { bind, duration } => {
            let config = UdpServerConfig {
                bind,
                ..UdpServerConfig::default()
            };
            let server = UdpEchoServer::start(manager, config).context("starting UDP server")?;
            run_for(duration, || {
                info!(replies = server.replies(), "UDP server running");
            });
            server.stop()?;
        }
        Command::UdpClient {
            server,
            message,
            timeout_ms,
        } => {
            let config = UdpClientConfig {
                server,
                timeout: Duration::from_millis(timeout_ms),
                ..UdpClientConfig::default()
            };
            let (reply, from) = UdpClient::request(&manager, &config, message.as_bytes())?;
            println!("{}: {}", from, String::from_utf8_lossy(&reply));
        }
        Command::TcpClient { server, message } => {
            let server = SocketAddress::from(server);
            let kind = SocketKind::new(server.family(), SocketType::Stream, Protocol::Tcp);
            let handle = manager.create(kind)?;
            let sent = manager
                .connect(handle, server)
                .and_then(|_| manager.send(handle, message.as_bytes(), MsgFlags::empty()));
            manager.close(handle)?;
            let sent = sent?;
            info!(server = %server, bytes = sent, "Sent message");
        }
    }

    Ok(())
}

/// Block for `duration` seconds, or forever, reporting every 30 seconds
fn run_for(duration: Option<u64>, report: impl Fn()) {
    const REPORT_INTERVAL: Duration = Duration::from_secs(30);

    match duration {
        Some(secs) => std::thread::sleep(Duration::from_secs(secs)),
        None => loop {
            std::thread::sleep(REPORT_INTERVAL);
            report();
        },
    }
}
