//! # Framewire CLI Entry Point
//!
//! Command-line front end for the framewire framing layer.
//!
//! ## Usage
//!
//! ```bash
//! # Start an echo server
//! framewire serve -b 0.0.0.0:9000
//!
//! # Start an echo server that retries failed reads/writes
//! framewire serve -b 0.0.0.0:9000 --retries 3 --retry-interval-ms 50
//!
//! # Send one frame and print the reply
//! framewire send 127.0.0.1:9000 'hello'
//!
//! # Send stdin as one frame
//! cat payload.bin | framewire send 127.0.0.1:9000 > reply.bin
//! ```

use std::io::{Read, Write};

use anyhow::{Context, Result};
use argh::FromArgs;
use framewire_cli::commands::{self, SendOptions};
use framewire_common::transport::ServerConfig;

#[derive(FromArgs)]
/// Framewire - framed request/response exchanges over TCP
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
///
/// - **Serve**: framed echo server
/// - **Send**: one request/response exchange, reply written raw to stdout
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Send(SendArgs),
}

/// Arguments for the echo server.
///
/// # Example
///
/// ```bash
/// framewire serve -b 0.0.0.0:9000 --read-timeout-ms 5000
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// start a framed echo server
struct ServeArgs {
    /// address to bind the server to
    ///
    /// Defaults to "127.0.0.1:0" which assigns a random available port.
    /// The actual bound address is logged at startup.
    #[argh(option, short = 'b', default = "\"127.0.0.1:0\".into()")]
    bind: String,

    /// idle bound on waiting for each request frame, in milliseconds
    ///
    /// 0 waits forever. Must be at most 3600000 (1 hour).
    #[argh(option, long = "read-timeout-ms", default = "30000")]
    read_timeout_ms: u64,

    /// number of retries for failed reads and writes
    ///
    /// Omit to disable retries entirely.
    #[argh(option, long = "retries")]
    retries: Option<u32>,

    /// pause between retries in milliseconds (0 uses the 100ms default)
    #[argh(option, long = "retry-interval-ms", default = "0")]
    retry_interval_ms: u64,
}

/// Arguments for a single exchange.
///
/// The payload is taken from the positional argument, or from stdin when
/// it is omitted. The reply is written to stdout unmodified so it can be
/// piped to other tools.
#[derive(FromArgs)]
#[argh(subcommand, name = "send")]
/// send one frame and print the reply
struct SendArgs {
    /// server address (e.g., 127.0.0.1:9000)
    #[argh(positional)]
    addr: String,

    /// payload to send; read from stdin if omitted
    #[argh(positional)]
    payload: Option<String>,

    /// bound on waiting for the reply in milliseconds (0 waits forever)
    #[argh(option, long = "timeout-ms", default = "30000")]
    timeout_ms: u64,

    /// bound on establishing the connection in milliseconds (0 waits forever)
    #[argh(option, long = "connect-timeout-ms", default = "5000")]
    connect_timeout_ms: u64,

    /// number of retries for failed reads and writes
    #[argh(option, long = "retries")]
    retries: Option<u32>,

    /// pause between retries in milliseconds (0 uses the 100ms default)
    #[argh(option, long = "retry-interval-ms", default = "0")]
    retry_interval_ms: u64,
}

impl ServeArgs {
    fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.bind.clone())
            .with_read_timeout(commands::optional_millis(self.read_timeout_ms))
            .with_retry(commands::retry_policy(self.retries, self.retry_interval_ms))
    }
}

impl SendArgs {
    fn send_options(&self) -> SendOptions {
        SendOptions {
            connect_timeout: commands::optional_millis(self.connect_timeout_ms),
            reply_timeout: commands::optional_millis(self.timeout_ms),
            retry: commands::retry_policy(self.retries, self.retry_interval_ms),
        }
    }
}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // `send` owns stdout for the reply, so its logs go to stderr and stay quiet by default.
    let default_level = match cli.command {
        Commands::Serve(_) => "info",
        Commands::Send(_) => "warn",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve(args) => {
            tracing::info!("Starting framewire echo server");
            tracing::info!("Binding to: {}", args.bind);
            commands::run_serve(args.server_config())?;
        }
        Commands::Send(args) => {
            let payload = match &args.payload {
                Some(payload) => payload.clone().into_bytes(),
                None => {
                    let mut buf = Vec::new();
                    std::io::stdin()
                        .read_to_end(&mut buf)
                        .context("failed to read payload from stdin")?;
                    buf
                }
            };

            let reply = commands::run_send(&args.addr, &payload, &args.send_options())?;

            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&reply)?;
            stdout.flush()?;
        }
    }

    Ok(())
}
