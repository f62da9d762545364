//! Listen command - a minimal consumer for testing producers

use anyhow::{Context, Result};
use clap::Args;
use linecast_core::codec::Message;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tracing::{debug, info, warn};

/// Arguments for the listen command
#[derive(Args)]
pub struct ListenArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on (defaults to the configured consumer port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Exit after the first producer disconnects
    #[arg(long)]
    once: bool,
}

/// Accept producers and print each frame received
pub async fn listen(args: ListenArgs) -> Result<()> {
    let port = match args.port {
        Some(port) => port,
        None => linecast_core::ConfigFile::load_or_default().connection.port,
    };
    let address = format!("{}:{}", args.bind, port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    println!("Listening on {} (Ctrl+C to stop)...\n", address);

    let serve = async {
        loop {
            let (stream, peer) = listener.accept().await.context("Accept failed")?;
            println!("Producer connected from {}", peer);
            if let Err(e) = read_frames(stream).await {
                warn!("Connection from {} ended with error: {}", peer, e);
            }
            if args.once {
                return Ok::<(), anyhow::Error>(());
            }
        }
    };

    tokio::select! {
        r = serve => r?,
        _ = signal::ctrl_c() => println!("\nReceived interrupt signal..."),
    }

    Ok(())
}

async fn read_frames(stream: TcpStream) -> Result<()> {
    let mut lines = BufReader::new(stream).lines();
    let mut count = 0u64;

    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        match Message::parse(line.as_bytes()) {
            Ok(Message::Close) => {
                println!("Producer closed the stream after {} frames", count);
                return Ok(());
            }
            Ok(message) => {
                count += 1;
                let kind = match &message {
                    Message::Snapshot(_) => "gpla",
                    _ => "json",
                };
                if let Some(frame) = message.into_frame() {
                    println!(
                        "frame {:>5} [{}] focal {:>8.3}  objects {:>3}  strokes {:>4}  points {:>6}",
                        count,
                        kind,
                        frame.focal_length,
                        frame.objects.len(),
                        frame.stroke_count(),
                        frame.point_count()
                    );
                }
            }
            Err(e) => warn!("Unreadable line ({} bytes): {}", line.len(), e),
        }
    }

    debug!("Stream ended after {} frames", count);
    info!("Producer disconnected without sending CLOSE");
    Ok(())
}
