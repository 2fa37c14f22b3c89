//! End-to-end WebSocket protocol tests against a live dispatcher

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use tempfile::TempDir;
use tokio_tungstenite::tungstenite::Message;
use winshot::{
    capture::{CaptureEngine, MockBackend},
    config::Config,
    server::{Dispatcher, dispatch::DispatchState},
    store::ImageStore,
};

/// Starts a dispatcher on an OS-assigned port and returns its address
async fn start_dispatcher(dir: &TempDir) -> (SocketAddr, Arc<DispatchState>) {
    let store = ImageStore::open(dir.path().join("images")).await.unwrap();
    let state = Arc::new(DispatchState {
        engine: Arc::new(CaptureEngine::new(
            Arc::new(MockBackend::new()),
            Duration::from_millis(500),
        )),
        store,
        config: Config::default(),
    });

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
    let dispatcher = Dispatcher::bind(addr, state.clone()).await.unwrap();
    let local = dispatcher.local_addr().unwrap();
    tokio::spawn(dispatcher.run());
    (local, state)
}

type WsClient = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(addr: SocketAddr) -> WsClient {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", addr))
        .await
        .unwrap();
    ws
}

async fn request(ws: &mut WsClient, raw: &str) -> serde_json::Value {
    ws.send(Message::Text(raw.to_string())).await.unwrap();
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(reply) => return serde_json::from_str(&reply).unwrap(),
            Message::Close(_) => panic!("connection closed before response"),
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_window_list_over_websocket() {
    let dir = TempDir::new().unwrap();
    let (addr, _) = start_dispatcher(&dir).await;
    let mut ws = connect(addr).await;

    let reply = request(
        &mut ws,
        r#"{"id":"c1-1","type":"window_list_request","content":{}}"#,
    )
    .await;

    assert_eq!(reply["type"], "window_list_response");
    assert_eq!(reply["request_id"], "c1-1");
    assert_eq!(reply["content"]["windows"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_screenshot_over_websocket_publishes_to_store() {
    let dir = TempDir::new().unwrap();
    let (addr, state) = start_dispatcher(&dir).await;
    let mut ws = connect(addr).await;

    let reply = request(
        &mut ws,
        r#"{"id":"c2-1","type":"window_screenshot_request","content":{"window_index":1}}"#,
    )
    .await;

    assert_eq!(reply["type"], "window_screenshot_response");
    assert_eq!(reply["request_id"], "c2-1");
    assert_eq!(reply["content"]["window_id"], "Chrome:Google Chrome");

    let hash = reply["content"]["hash"].as_str().unwrap();
    let entry = state.store.get(hash).unwrap();
    assert!(entry.file_path.exists());
    assert_eq!(
        reply["content"]["local_file_path"],
        entry.file_path.to_string_lossy().as_ref()
    );
}

#[tokio::test]
async fn test_responses_arrive_in_request_order() {
    let dir = TempDir::new().unwrap();
    let (addr, _) = start_dispatcher(&dir).await;
    let mut ws = connect(addr).await;

    // Text echoes are cheap; interleave them with a capture to check that
    // one connection stays strictly sequential.
    ws.send(Message::Text(
        r#"{"id":"o-1","type":"window_screenshot_request","content":{}}"#.to_string(),
    ))
    .await
    .unwrap();
    ws.send(Message::Text(r#"{"id":"o-2","type":"text","content":"a"}"#.to_string()))
        .await
        .unwrap();
    ws.send(Message::Text(r#"{"id":"o-3","type":"text","content":"b"}"#.to_string()))
        .await
        .unwrap();

    let mut order = Vec::new();
    while order.len() < 3 {
        if let Message::Text(reply) = ws.next().await.unwrap().unwrap() {
            let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
            order.push(value["request_id"].as_str().unwrap().to_string());
        }
    }
    assert_eq!(order, vec!["o-1", "o-2", "o-3"]);
}

#[tokio::test]
async fn test_unknown_type_answered_not_dropped() {
    let dir = TempDir::new().unwrap();
    let (addr, _) = start_dispatcher(&dir).await;
    let mut ws = connect(addr).await;

    let reply = request(
        &mut ws,
        r#"{"id":"u-1","type":"make_coffee_request","content":{}}"#,
    )
    .await;

    assert_eq!(reply["type"], "error");
    assert_eq!(reply["request_id"], "u-1");
    assert_eq!(reply["content"]["code"], "UnsupportedType");
}

#[tokio::test]
async fn test_malformed_payload_answered_with_error() {
    let dir = TempDir::new().unwrap();
    let (addr, _) = start_dispatcher(&dir).await;
    let mut ws = connect(addr).await;

    let reply = request(&mut ws, "{{{{ not json").await;

    assert_eq!(reply["type"], "error");
    assert_eq!(reply["content"]["code"], "MalformedRequest");
    assert!(reply.get("request_id").is_none());
}

#[tokio::test]
async fn test_connections_are_independent() {
    let dir = TempDir::new().unwrap();
    let (addr, _) = start_dispatcher(&dir).await;

    let mut first = connect(addr).await;
    let mut second = connect(addr).await;

    let a = request(&mut first, r#"{"id":"i-1","type":"text","content":"one"}"#).await;
    let b = request(&mut second, r#"{"id":"i-2","type":"text","content":"two"}"#).await;

    assert_eq!(a["content"], "one");
    assert_eq!(b["content"], "two");
}

#[tokio::test]
async fn test_function_call_echoed_as_result() {
    let dir = TempDir::new().unwrap();
    let (addr, _) = start_dispatcher(&dir).await;
    let mut ws = connect(addr).await;

    let reply = request(
        &mut ws,
        r#"{"id":"f-1","type":"function_call","content":{"name":"status"}}"#,
    )
    .await;

    assert_eq!(reply["type"], "function_result");
    assert_eq!(reply["request_id"], "f-1");
    assert_eq!(reply["content"]["name"], "status");
}
