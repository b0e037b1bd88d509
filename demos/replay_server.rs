//! Replay captured response packets to every client that connects.
//!
//! The first capture is written in one piece; the second is dribbled out
//! one byte at a time, which exercises a client's frame reassembly the
//! way a congested network would.
//!
//! ```text
//! cargo run --example replay_server -- set_response.packet get_response.packet
//! ```

use memwire::error::Result;
use memwire::utils::capture::{self, ChunkingStrategy};
use memwire::utils::logging;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_default();

    let mut args = std::env::args().skip(1);
    let first = args.next().unwrap_or_else(|| "set_response.packet".into());
    let second = args.next().unwrap_or_else(|| "get_response.packet".into());

    let listener = TcpListener::bind("127.0.0.1:8124").await?;
    info!(addr = "127.0.0.1:8124", "Replay server bound");

    loop {
        let (mut stream, peer) = listener.accept().await?;
        info!(%peer, "Client connected");

        let first = capture::load_packet(&first).await?;
        let second = capture::load_packet(&second).await?;

        tokio::spawn(async move {
            let whole = ChunkingStrategy::whole();
            let slow = ChunkingStrategy::byte_at_a_time(Duration::from_secs(1));

            if let Err(e) = capture::replay(&mut stream, &first, whole).await {
                error!(%peer, error = %e, "Replay failed");
                return;
            }
            if let Err(e) = capture::replay(&mut stream, &second, slow).await {
                error!(%peer, error = %e, "Replay failed");
            }
            info!(%peer, "Replay complete");
        });
    }
}
