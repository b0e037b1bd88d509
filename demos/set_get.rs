//! Store a value, read it back, then quit quietly.
//!
//! Run against a memcached-compatible server:
//! ```text
//! cargo run --example set_get -- 127.0.0.1:11211
//! ```

use memwire::config::ProtocolConfig;
use memwire::error::Result;
use memwire::service::Client;
use memwire::utils::logging;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_default();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| ProtocolConfig::default().client.address);

    let config = ProtocolConfig::default();
    let client = Client::connect(&addr, &config).await?;

    client.set("hello", "world", 0xdeadbeef, 3600).await?;
    info!("Stored hello=world");

    match client.get("hello").await? {
        Some(hit) => info!(flags = format_args!("{:#x}", hit.flags), value = ?hit.value, "Get hit"),
        None => info!("Get miss"),
    }

    client.quit_quiet().await?;
    Ok(())
}
