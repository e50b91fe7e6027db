//! h2c - interactive HTTP/2 cleartext upgrade client
//!
//! Reads commands from stdin:
//!
//! ```text
//! connect <host[:port]>
//! settings [push=N] [maxStream=N] [windowSize=N] [frameSize=N]
//! send PING | send GET <path>
//! close
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use h2c_client::h2c::{Connection, H2Engine, H2cClient};
use h2c_client::repl::Terminal;
use std::io;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "h2c", version, about = "Interactive HTTP/2 cleartext (h2c) upgrade client")]
struct Cli {
    /// Connect to this server before the first prompt
    #[arg(long, value_name = "HOST[:PORT]")]
    connect: Option<String>,

    /// Prompt label
    #[arg(long, default_value = "h2c")]
    prompt: String,

    /// Give up on a socket read or write after this many seconds
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    io_timeout: Option<u64>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    let io_timeout = cli.io_timeout.map(Duration::from_secs);
    let engine = H2Engine::new().with_io_timeout(io_timeout);
    let client = H2cClient::new(Connection::new(engine).with_io_timeout(io_timeout));

    let stdin = io::stdin();
    let mut terminal = Terminal::new(client, cli.prompt, stdin.lock(), io::stdout());
    H2cClient::register(&mut terminal);

    if let Some(target) = cli.connect {
        terminal
            .operate_cmd("connect", &[target])
            .context("failed to write to stdout")?;
    }

    terminal.run().context("terminal I/O failed")?;

    if let Err(e) = terminal.state_mut().connection_mut().close() {
        log::trace!("nothing to close on exit: {}", e);
    }
    Ok(())
}
