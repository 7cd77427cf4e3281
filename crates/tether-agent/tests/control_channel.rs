//! End-to-end tests for the control channel over real TCP.
//!
//! These tests exercise the full path an embedder and operator use: bootstrap
//! binds a port and spawns the input loop, a [`tether_client::ClientConnection`]
//! dials it, and command frames round-trip through the dispatcher. Everything
//! goes through public APIs only; loop internals are covered by the unit
//! tests in `src/server.rs`.

use std::time::Duration;

use tether_agent::{bootstrap, AgentConfig, AgentHandle, Dispatcher};
use tether_client::{ClientConnection, ClientError};
use tether_core::{Frame, FrameBuilder, PayloadReader};
use tokio::time::timeout;

/// Command keys used by these tests. The catalog is the embedder's to
/// define; these two are just what the test host registers.
const CMD_PING: u8 = 0x01;
const CMD_ECHO: u8 = 0x02;
const RESP_BIT: u8 = 0x80;

/// Starts an agent on an ephemeral loopback port with ping + echo handlers.
async fn start_test_agent() -> AgentHandle {
    let mut dispatcher = Dispatcher::new();
    dispatcher.register(CMD_PING, |_| {
        Ok(Some(
            FrameBuilder::new()
                .append_str("pong")
                .build_frame(CMD_PING | RESP_BIT),
        ))
    });
    dispatcher.register(CMD_ECHO, |payload| {
        Ok(Some(Frame::new(CMD_ECHO | RESP_BIT, payload.to_vec())))
    });

    let config = AgentConfig {
        port: 0,
        ..AgentConfig::default()
    };
    bootstrap::start_with_config(&config, dispatcher)
        .await
        .expect("ephemeral loopback bind")
}

#[tokio::test]
async fn test_ping_round_trips_through_the_agent() {
    let agent = start_test_agent().await;
    let addr = agent.local_addr().unwrap();

    let mut client = ClientConnection::connect(addr).await.unwrap();
    let response = client.request(&Frame::empty(CMD_PING)).await.unwrap();

    assert_eq!(response.key, CMD_PING | RESP_BIT);
    let mut reader = PayloadReader::new(&response.payload);
    assert_eq!(reader.read_string().unwrap(), "pong");

    client.close().await.unwrap();
    agent.stop();
    timeout(Duration::from_secs(1), agent.join())
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_sequential_requests_answer_in_order() {
    let agent = start_test_agent().await;
    let addr = agent.local_addr().unwrap();
    let mut client = ClientConnection::connect(addr).await.unwrap();

    for i in 0..5i32 {
        let request = FrameBuilder::new().append_i32(i).build_frame(CMD_ECHO);
        let response = client.request(&request).await.unwrap();
        assert_eq!(response.key, CMD_ECHO | RESP_BIT);
        let mut reader = PayloadReader::new(&response.payload);
        assert_eq!(reader.read_i32().unwrap(), i, "response {i} out of order");
    }

    client.close().await.unwrap();
    agent.stop();
}

#[tokio::test]
async fn test_unknown_command_is_dropped_and_session_survives() {
    let agent = start_test_agent().await;
    let addr = agent.local_addr().unwrap();
    let mut client = ClientConnection::connect(addr).await.unwrap();

    // No handler for 0x7E: the agent drops the frame without replying.
    client.send(&Frame::empty(0x7E)).await.unwrap();

    // The session must still serve the next valid command.
    let response = timeout(
        Duration::from_secs(1),
        client.request(&Frame::new(CMD_ECHO, vec![42])),
    )
    .await
    .expect("session must survive an unknown key")
    .unwrap();
    assert_eq!(response.payload, vec![42]);

    client.close().await.unwrap();
    agent.stop();
}

#[tokio::test]
async fn test_client_disconnect_ends_the_agent_cleanly() {
    let agent = start_test_agent().await;
    let addr = agent.local_addr().unwrap();

    let mut client = ClientConnection::connect(addr).await.unwrap();
    client.close().await.unwrap();

    // A clean client hangup ends the loop without error.
    let result = timeout(Duration::from_secs(1), agent.join())
        .await
        .expect("loop must exit on client disconnect");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_stop_while_client_is_idle() {
    let agent = start_test_agent().await;
    let addr = agent.local_addr().unwrap();

    let mut client = ClientConnection::connect(addr).await.unwrap();

    // The agent is parked reading; stop() must unblock it.
    agent.stop();
    let result = timeout(Duration::from_secs(1), agent.join())
        .await
        .expect("stop() must unblock the parked read");
    assert!(result.is_ok());

    // The next request fails: the agent is gone.
    let outcome = client.request(&Frame::empty(CMD_PING)).await;
    assert!(matches!(
        outcome,
        Err(ClientError::Disconnected) | Err(ClientError::Link(_))
    ));
}

#[tokio::test]
async fn test_connect_to_stopped_agent_is_refused() {
    let agent = start_test_agent().await;
    let addr = agent.local_addr().unwrap();
    agent.stop();
    timeout(Duration::from_secs(1), agent.join())
        .await
        .unwrap()
        .unwrap();

    let result = ClientConnection::connect(addr).await;
    assert!(result.is_err(), "stopped agent must not accept new peers");
}
