//! Bootstrap: port resolution and server wiring.
//!
//! The embedding process hands over its free-form startup argument string
//! and a populated [`Dispatcher`]; bootstrap resolves the listening port,
//! binds the link, spawns the input loop on its own task so the caller is
//! never blocked, and wires Ctrl-C to `stop()`.
//!
//! The server is an explicitly owned [`AgentHandle`] constructed here and
//! held by whoever starts and stops it — deliberately not a process-wide
//! lazy singleton, so a second `start()` call is a second, independent
//! server rather than a hidden re-entry into the first.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tether_link::{LinkError, TcpAcceptLink};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::dispatcher::Dispatcher;
use crate::server::{Server, ServerError, ServerHandle};

/// Fallback listening port when the argument string carries no usable
/// `port=` value.
pub const DEFAULT_PORT: u16 = 25252;

/// Runtime configuration for an agent server.
///
/// Plain struct, no global state: build it once, pass it to [`start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Interface the control port binds to. Loopback by default: the
    /// channel controls a live process, so exposure beyond the local host
    /// is an explicit choice.
    pub bind_addr: IpAddr,
    /// Control port.
    pub port: u16,
}

impl AgentConfig {
    /// Builds a config from a free-form argument string, falling back to
    /// [`DEFAULT_PORT`] via [`resolve_port`].
    pub fn from_args(args: Option<&str>) -> Self {
        Self {
            port: resolve_port(args),
            ..Self::default()
        }
    }

    /// The socket address to bind.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
        }
    }
}

/// Extracts a listening port from a free-form argument string.
///
/// The documented convention is a `port=` marker followed by decimal
/// digits, anywhere in the string. Absent marker, empty digits, or a value
/// that does not fit a `u16` all fall back to [`DEFAULT_PORT`].
pub fn resolve_port(args: Option<&str>) -> u16 {
    let Some(args) = args else {
        return DEFAULT_PORT;
    };
    let Some(idx) = args.find("port=") else {
        return DEFAULT_PORT;
    };
    let digits: String = args[idx + "port=".len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().unwrap_or(DEFAULT_PORT)
}

/// An owned, running agent server: the stop control plus the loop task.
///
/// Dropping the handle does not stop the server; call [`AgentHandle::stop`].
pub struct AgentHandle {
    handle: ServerHandle,
    task: JoinHandle<Result<(), ServerError>>,
    local_addr: Option<SocketAddr>,
}

impl AgentHandle {
    /// The address the control port actually bound, which differs from the
    /// configured one when port 0 requested an ephemeral port.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Requests the server stop. Idempotent; see [`ServerHandle::stop`].
    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Waits for the input loop to finish and returns how it ended.
    pub async fn join(self) -> Result<(), ServerError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                error!("server task did not complete: {e}");
                Ok(())
            }
        }
    }
}

/// Binds the control port resolved from `args` and starts the input loop on
/// its own task.
///
/// Returns once the port is bound; accepting the peer and serving frames
/// happen on the spawned task. Ctrl-C stops the server the same way an
/// explicit [`AgentHandle::stop`] does.
///
/// # Errors
///
/// Returns [`LinkError::Bind`] when the port cannot be bound; the server is
/// then unstarted and the host process is unaffected.
pub async fn start(args: Option<&str>, dispatcher: Dispatcher) -> Result<AgentHandle, LinkError> {
    start_with_config(&AgentConfig::from_args(args), dispatcher).await
}

/// [`start`] with an explicit config instead of an argument string.
pub async fn start_with_config(
    config: &AgentConfig,
    dispatcher: Dispatcher,
) -> Result<AgentHandle, LinkError> {
    // Bind eagerly: a taken port is a bootstrap-time failure the embedder
    // must see, not something to discover from a dead background task.
    let link = TcpAcceptLink::bind(config.socket_addr()).await.map_err(|e| {
        error!("failed to open agent server: {e}");
        e
    })?;
    let local_addr = link.local_addr();
    if let Some(addr) = local_addr {
        info!("agent control channel on {addr}");
    }

    let mut server = Server::new(link, dispatcher);
    let handle = server.shutdown_handle();

    // Process-exit hook: Ctrl-C triggers the same idempotent stop() an
    // operator would.
    let signal_handle = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_handle.stop();
        }
    });

    let task = tokio::spawn(async move { server.run().await });

    Ok(AgentHandle {
        handle,
        task,
        local_addr,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_port_reads_digits_after_marker() {
        assert_eq!(resolve_port(Some("port=8080")), 8080);
        assert_eq!(resolve_port(Some("debug,port=9001,verbose")), 9001);
    }

    #[test]
    fn test_resolve_port_stops_at_first_non_digit() {
        assert_eq!(resolve_port(Some("port=7000x9")), 7000);
    }

    #[test]
    fn test_resolve_port_falls_back_without_marker() {
        assert_eq!(resolve_port(None), DEFAULT_PORT);
        assert_eq!(resolve_port(Some("")), DEFAULT_PORT);
        assert_eq!(resolve_port(Some("verbose,trace")), DEFAULT_PORT);
    }

    #[test]
    fn test_resolve_port_falls_back_on_unparseable_value() {
        assert_eq!(resolve_port(Some("port=")), DEFAULT_PORT);
        assert_eq!(resolve_port(Some("port=abc")), DEFAULT_PORT);
        // Doesn't fit a u16.
        assert_eq!(resolve_port(Some("port=99999")), DEFAULT_PORT);
    }

    #[test]
    fn test_default_config_binds_loopback_default_port() {
        let config = AgentConfig::default();
        assert_eq!(config.socket_addr().port(), DEFAULT_PORT);
        assert!(config.socket_addr().ip().is_loopback());
    }

    #[test]
    fn test_config_from_args_keeps_default_bind_addr() {
        let config = AgentConfig::from_args(Some("port=6000"));
        assert_eq!(config.port, 6000);
        assert_eq!(config.bind_addr, AgentConfig::default().bind_addr);
    }

    #[tokio::test]
    async fn test_start_fails_cleanly_when_port_is_taken() {
        let squatter = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = AgentConfig {
            bind_addr: "127.0.0.1".parse().unwrap(),
            port: squatter.local_addr().unwrap().port(),
        };

        let result = start_with_config(&config, Dispatcher::new()).await;
        assert!(matches!(result, Err(LinkError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_started_agent_stops_on_handle_stop() {
        // Port 0 avoids collisions; the loop never gets a peer and must
        // still stop promptly.
        let config = AgentConfig {
            bind_addr: "127.0.0.1".parse().unwrap(),
            port: 0,
        };
        let agent = start_with_config(&config, Dispatcher::new())
            .await
            .unwrap();

        agent.stop();
        let result = tokio::time::timeout(std::time::Duration::from_secs(1), agent.join())
            .await
            .expect("stop() must end the loop task");
        assert!(result.is_ok());
    }
}
