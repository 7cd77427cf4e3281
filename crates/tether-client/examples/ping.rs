//! Pings a running agent once and prints the reply.
//!
//! ```text
//! cargo run --example ping -- 127.0.0.1:25252
//! ```

use std::net::SocketAddr;

use tether_client::ClientConnection;
use tether_core::{Frame, PayloadReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr: SocketAddr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:25252".to_string())
        .parse()?;

    let mut client = ClientConnection::connect(addr).await?;
    let response = client.request(&Frame::empty(0x01)).await?;

    let mut reader = PayloadReader::new(&response.payload);
    info!(key = response.key, "reply: {}", reader.read_string()?);

    client.close().await?;
    Ok(())
}
