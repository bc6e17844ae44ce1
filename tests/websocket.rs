#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    reason = "Do not need additional syntax for setting up tests"
)]

use std::net::SocketAddr;
use std::time::Duration;

use admin_realtime::{ConnectionState, EventKind, RealtimeChannel, RealtimeChannelOptions};
use futures::{SinkExt as _, StreamExt as _};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// Loopback server: greets every connection with a `new_order` event and
/// reports what the client sends back.
async fn start_server(drop_first: bool) -> (SocketAddr, mpsc::UnboundedReceiver<Message>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (received_tx, received_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut connection = 0;
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let Ok(mut ws_stream) = tokio_tungstenite::accept_async(stream).await else {
                continue;
            };
            connection += 1;

            if drop_first && connection == 1 {
                // Abrupt drop: no close frame
                drop(ws_stream);
                continue;
            }

            let greeting = json!({"type": "new_order", "id": 7, "connection": connection});
            if ws_stream
                .send(Message::Text(greeting.to_string().into()))
                .await
                .is_err()
            {
                continue;
            }

            let received = received_tx.clone();
            tokio::spawn(async move {
                while let Some(Ok(frame)) = ws_stream.next().await {
                    let closing = frame.is_close();
                    let _ = received.send(frame);
                    if closing {
                        break;
                    }
                }
            });
        }
    });

    (addr, received_rx)
}

fn options_for(addr: SocketAddr) -> RealtimeChannelOptions {
    RealtimeChannelOptions {
        base_url: Some(format!("http://{}", addr)),
        base_delay: Duration::from_millis(50),
        heartbeat_interval: None,
        ..Default::default()
    }
}

#[tokio::test]
async fn receives_events_and_sends_over_real_socket() {
    let (addr, mut received) = start_server(false).await;
    let channel = RealtimeChannel::new(options_for(addr)).unwrap();
    let mut orders = channel.subscribe(EventKind::NewOrder);

    channel.connect();
    let order = timeout(WAIT, orders.recv()).await.unwrap().unwrap();
    assert_eq!(order.get("id"), Some(&json!(7)));
    assert!(order.get("type").is_none());
    assert!(channel.is_connected());

    assert!(channel.send("ack:7"));
    match timeout(WAIT, received.recv()).await.unwrap() {
        Some(Message::Text(text)) => assert_eq!(text.as_str(), "ack:7"),
        other => panic!("unexpected frame {:?}", other),
    }

    channel.disconnect();
    match timeout(WAIT, received.recv()).await.unwrap() {
        Some(Message::Close(Some(frame))) => assert_eq!(u16::from(frame.code), 1000),
        other => panic!("expected close frame, got {:?}", other),
    }

    let mut states = channel.watch_state();
    timeout(WAIT, states.wait_for(|s| *s == ConnectionState::Closed))
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn reconnects_after_abrupt_drop() {
    let (addr, _received) = start_server(true).await;
    let channel = RealtimeChannel::new(options_for(addr)).unwrap();
    let mut orders = channel.subscribe(EventKind::NewOrder);

    channel.connect();
    let order = timeout(WAIT, orders.recv()).await.unwrap().unwrap();

    assert_eq!(order.get("connection"), Some(&json!(2)));
    assert_eq!(channel.reconnect_attempts(), 0);
    channel.disconnect();
}

#[tokio::test]
async fn refused_connection_gives_up_after_budget() {
    // Bind then release a port so nothing is listening on it
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let options = RealtimeChannelOptions {
        max_reconnect_attempts: 2,
        base_delay: Duration::from_millis(10),
        ..options_for(addr)
    };
    let channel = RealtimeChannel::new(options).unwrap();

    channel.connect();

    timeout(WAIT, async {
        while channel.reconnect_attempts() < 2 || channel.state() != ConnectionState::Closed {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    // 10ms + 20ms of backoff have elapsed; give the last attempt time to fail
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(channel.state(), ConnectionState::Closed);
    assert_eq!(channel.reconnect_attempts(), 2);
    assert!(!channel.is_connected());
}
