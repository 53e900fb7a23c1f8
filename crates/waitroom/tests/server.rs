//! Integration tests for the Waitroom server, handler, and full connection flow.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use waitroom::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

struct TestServer {
    ws_addr: String,
    http_addr: String,
    coordinator: Arc<Coordinator>,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), WaitroomError>>,
}

/// Starts a server on random ports.
async fn start_server(admission: AdmissionConfig) -> TestServer {
    let server = WaitroomServer::builder()
        .bind_http("127.0.0.1:0")
        .bind_ws("127.0.0.1:0")
        .admission(admission)
        .build()
        .await
        .expect("server should build");

    let ws_addr = server.ws_addr().expect("ws addr").to_string();
    let http_addr = server.http_addr().expect("http addr").to_string();
    let coordinator = server.coordinator();

    let (shutdown, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.run_until(async move {
        let _ = rx.await;
    }));

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    TestServer {
        ws_addr,
        http_addr,
        coordinator,
        shutdown,
        handle,
    }
}

fn capacity(n: usize) -> AdmissionConfig {
    AdmissionConfig {
        capacity: n,
        ..AdmissionConfig::default()
    }
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_json(ws: &mut ClientWs, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send should succeed");
}

async fn join(ws: &mut ClientWs, user_id: &str) {
    send_json(ws, json!({ "event": "joinQueue", "data": { "userId": user_id } })).await;
}

/// Next data frame as JSON, skipping control frames.
async fn recv_json(ws: &mut ClientWs) -> Value {
    let next = async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str()).expect("valid json");
                }
                Some(Ok(Message::Binary(data))) => {
                    return serde_json::from_slice(&data).expect("valid json");
                }
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), next)
        .await
        .expect("should receive a message")
}

fn position(position: u64, allowed: bool) -> Value {
    json!({ "event": "queuePosition", "data": { "position": position, "allowed": allowed } })
}

/// Polls `check` until it holds or two seconds pass.
async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

// =========================================================================
// Live channel
// =========================================================================

#[tokio::test]
async fn test_join_with_free_slot_is_admitted() {
    let server = start_server(capacity(1)).await;
    let mut ws = connect(&server.ws_addr).await;

    join(&mut ws, "a").await;

    assert_eq!(recv_json(&mut ws).await, position(0, true));
}

#[tokio::test]
async fn test_join_when_full_reports_position() {
    let server = start_server(capacity(1)).await;
    let mut ws_a = connect(&server.ws_addr).await;
    let mut ws_b = connect(&server.ws_addr).await;
    let mut ws_c = connect(&server.ws_addr).await;

    join(&mut ws_a, "a").await;
    recv_json(&mut ws_a).await;
    join(&mut ws_b, "b").await;
    assert_eq!(recv_json(&mut ws_b).await, position(1, false));
    join(&mut ws_c, "c").await;
    assert_eq!(recv_json(&mut ws_c).await, position(2, false));
}

#[tokio::test]
async fn test_join_twice_keeps_single_slot() {
    let server = start_server(capacity(1)).await;
    let mut ws = connect(&server.ws_addr).await;

    join(&mut ws, "a").await;
    recv_json(&mut ws).await;
    join(&mut ws, "a").await;

    assert_eq!(recv_json(&mut ws).await, position(0, true));
    let status = server.coordinator.status().await.unwrap();
    assert_eq!((status.active_users, status.queue_length), (1, 0));
}

#[tokio::test]
async fn test_join_without_user_id_gets_error_event() {
    let server = start_server(capacity(1)).await;
    let mut ws = connect(&server.ws_addr).await;

    send_json(&mut ws, json!({ "event": "joinQueue", "data": {} })).await;
    assert_eq!(
        recv_json(&mut ws).await,
        json!({ "event": "error", "data": { "message": "Invalid userId" } })
    );

    join(&mut ws, "").await;
    assert_eq!(recv_json(&mut ws).await["data"]["message"], "Invalid userId");
    assert_eq!(server.coordinator.status().await.unwrap().active_users, 0);
}

#[tokio::test]
async fn test_undecodable_frame_gets_error_and_connection_survives() {
    let server = start_server(capacity(1)).await;
    let mut ws = connect(&server.ws_addr).await;

    ws.send(Message::text("not json")).await.unwrap();
    let reply = recv_json(&mut ws).await;
    assert_eq!(reply["event"], "error");

    join(&mut ws, "a").await;
    assert_eq!(recv_json(&mut ws).await, position(0, true));
}

#[tokio::test]
async fn test_lapsed_session_promotes_waiting_client() {
    let server = start_server(AdmissionConfig {
        capacity: 1,
        session_ttl: Duration::from_secs(1),
        sweep_interval: Duration::from_secs(1),
        ..AdmissionConfig::default()
    })
    .await;
    let mut ws_a = connect(&server.ws_addr).await;
    let mut ws_b = connect(&server.ws_addr).await;
    let mut ws_c = connect(&server.ws_addr).await;

    join(&mut ws_a, "a").await;
    recv_json(&mut ws_a).await;
    join(&mut ws_b, "b").await;
    assert_eq!(recv_json(&mut ws_b).await, position(1, false));
    join(&mut ws_c, "c").await;
    assert_eq!(recv_json(&mut ws_c).await, position(2, false));

    // "a" never refreshes; a sweep within a couple of seconds evicts it.
    assert_eq!(recv_json(&mut ws_b).await, position(0, true));
    assert_eq!(recv_json(&mut ws_c).await, position(1, false));
    assert_eq!(
        server.coordinator.position(&SessionId::new("a").unwrap()).await.unwrap(),
        Standing::Unknown
    );
}

#[tokio::test]
async fn test_disconnect_unbinds_identity() {
    let server = start_server(capacity(1)).await;
    let mut ws = connect(&server.ws_addr).await;
    join(&mut ws, "a").await;
    recv_json(&mut ws).await;
    let id = SessionId::new("a").unwrap();
    assert!(server.coordinator.hub().is_bound(&id).await);

    ws.close(None).await.unwrap();

    let hub = server.coordinator.hub().clone();
    let unbound = eventually(|| {
        let hub = hub.clone();
        let id = id.clone();
        async move { !hub.is_bound(&id).await }
    })
    .await;
    assert!(unbound, "binding should be removed after close");
    // Unbinding leaves admission state alone.
    assert_eq!(server.coordinator.validate(&id).await.ok(), Some(()));
}

#[tokio::test]
async fn test_reconnect_takes_over_notifications() {
    let server = start_server(capacity(1)).await;
    let mut holder = connect(&server.ws_addr).await;
    join(&mut holder, "holder").await;
    recv_json(&mut holder).await;

    let mut first = connect(&server.ws_addr).await;
    join(&mut first, "b").await;
    assert_eq!(recv_json(&mut first).await, position(1, false));

    let mut second = connect(&server.ws_addr).await;
    join(&mut second, "b").await;
    assert_eq!(recv_json(&mut second).await, position(1, false));

    // Closing the old socket must not unbind the new one.
    first.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(
        server
            .coordinator
            .hub()
            .is_bound(&SessionId::new("b").unwrap())
            .await
    );
}

// =========================================================================
// HTTP listener and shutdown
// =========================================================================

#[tokio::test]
async fn test_http_listener_serves_health() {
    let server = start_server(capacity(1)).await;
    let mut stream = tokio::net::TcpStream::connect(&server.http_addr).await.unwrap();

    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "got: {response}");
    assert!(response.contains("\"status\":\"ok\""));
}

#[tokio::test]
async fn test_shutdown_stops_server() {
    let server = start_server(capacity(1)).await;

    server.shutdown.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(10), server.handle)
        .await
        .expect("server should stop")
        .expect("task should not panic");
    assert!(result.is_ok());
}
