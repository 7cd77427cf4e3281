//! Stand-in host process: starts an agent with ping and echo handlers and
//! serves until Ctrl-C.
//!
//! Run, then poke it with the client example:
//! ```text
//! cargo run --example echo_agent -- port=25252
//! cargo run -p tether-client --example ping -- 127.0.0.1:25252
//! ```

use tether_agent::{bootstrap, Dispatcher};
use tether_core::{Frame, FrameBuilder};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging; level overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // A real embedder passes its own startup arguments through; here the
    // first CLI argument plays that role (e.g. "port=25252").
    let args = std::env::args().nth(1);

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(0x01, |_| {
        Ok(Some(FrameBuilder::new().append_str("pong").build_frame(0x81)))
    });
    dispatcher.register(0x02, |payload| {
        Ok(Some(Frame::new(0x82, payload.to_vec())))
    });

    let agent = bootstrap::start(args.as_deref(), dispatcher).await?;
    info!("echo agent up; Ctrl-C to stop");

    agent.join().await?;
    info!("echo agent stopped");
    Ok(())
}
