//! echo-client: send messages to an echo-server and print the replies.
//!
//! With a message argument, performs one exchange and exits. Without one,
//! reads messages from stdin line by line until `exit` or end of input,
//! opening a fresh connection for each.

use clap::Parser;
use echo_server::client::send_message;
use echo_server::config::{DEFAULT_PORT, TRANSFER_BUFFER_SIZE};
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the echo client
#[derive(Parser, Debug)]
#[command(name = "echo-client")]
#[command(version = "0.1.0")]
#[command(about = "Send messages to an echo-server", long_about = None)]
struct ClientArgs {
    /// Server host name or IP
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Largest reply read back, in bytes
    #[arg(long, default_value_t = TRANSFER_BUFFER_SIZE)]
    buffer_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Message to send; omit to read messages from stdin
    message: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ClientArgs::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Some(ref message) = args.message {
        return exchange(&args, message).await.map_err(Into::into);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout
            .write_all(b"Enter message to send (or 'exit' to quit): ")
            .await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().eq_ignore_ascii_case("exit") {
            break;
        }

        // Failures were already reported; keep prompting.
        let _ = exchange(&args, &line).await;
    }

    Ok(())
}

async fn exchange(args: &ClientArgs, message: &str) -> io::Result<()> {
    match send_message(
        (args.host.as_str(), args.port),
        message.as_bytes(),
        args.buffer_size,
    )
    .await
    {
        Ok(reply) => {
            println!("Received from server: {}", String::from_utf8_lossy(&reply));
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
            error!(host = %args.host, port = args.port, "Connection refused");
            Err(e)
        }
        Err(e) => {
            error!(host = %args.host, port = args.port, error = %e, "Exchange failed");
            Err(e)
        }
    }
}
