//! File server integration tests: raw HTTP against a live listener, plus the
//! full capture-to-fetch pipeline

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use futures::{SinkExt, StreamExt};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_tungstenite::tungstenite::Message;
use winshot::{
    capture::{CaptureEngine, MockBackend},
    config::Config,
    server::{Dispatcher, FileServer, dispatch::DispatchState},
    store::ImageStore,
    util::hash::content_hash,
};

async fn start_file_server(store: ImageStore, sweep_interval: Duration) -> SocketAddr {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
    let server = FileServer::bind(addr, store, sweep_interval).await.unwrap();
    let local = server.local_addr().unwrap();
    tokio::spawn(server.run());
    local
}

/// Issues one raw HTTP request and returns (status line, body)
async fn http_get(addr: SocketAddr, request: &str) -> (String, Vec<u8>) {
    let mut socket = tokio::net::TcpStream::connect(addr).await.unwrap();
    socket.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    socket.read_to_end(&mut response).await.unwrap();

    let header_end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("no header terminator");
    let head = String::from_utf8_lossy(&response[..header_end]).to_string();
    let status = head.lines().next().unwrap_or("").to_string();
    let body = response[header_end + 4..].to_vec();
    (status, body)
}

#[tokio::test]
async fn test_serves_stored_image() {
    let dir = TempDir::new().unwrap();
    let store = ImageStore::open(dir.path().join("images")).await.unwrap();

    let bytes = b"fake png bytes";
    let hash = content_hash(bytes);
    store.put(&hash, bytes, Duration::from_secs(3600)).await.unwrap();

    let addr = start_file_server(store, Duration::from_secs(3600)).await;
    let (status, body) = http_get(
        addr,
        &format!("GET /img/{} HTTP/1.1\r\nHost: x\r\n\r\n", hash),
    )
    .await;

    assert!(status.contains("200"));
    assert_eq!(body, bytes);
}

#[tokio::test]
async fn test_unknown_hash_is_404() {
    let dir = TempDir::new().unwrap();
    let store = ImageStore::open(dir.path().join("images")).await.unwrap();
    let addr = start_file_server(store, Duration::from_secs(3600)).await;

    let (status, _) = http_get(
        addr,
        "GET /img/0000000000000000000000000000000000000000000000000000000000000000 HTTP/1.1\r\n\r\n",
    )
    .await;
    assert!(status.contains("404"));
}

#[tokio::test]
async fn test_non_image_paths_are_404() {
    let dir = TempDir::new().unwrap();
    let store = ImageStore::open(dir.path().join("images")).await.unwrap();
    let addr = start_file_server(store, Duration::from_secs(3600)).await;

    for path in ["/", "/img/", "/img/../secrets", "/status"] {
        let (status, _) =
            http_get(addr, &format!("GET {} HTTP/1.1\r\n\r\n", path)).await;
        assert!(status.contains("404"), "expected 404 for {}", path);
    }
}

#[tokio::test]
async fn test_post_is_405() {
    let dir = TempDir::new().unwrap();
    let store = ImageStore::open(dir.path().join("images")).await.unwrap();
    let addr = start_file_server(store, Duration::from_secs(3600)).await;

    let (status, _) = http_get(addr, "POST /img/abc HTTP/1.1\r\n\r\n").await;
    assert!(status.contains("405"));
}

#[tokio::test]
async fn test_sweeper_evicts_expired_images() {
    let dir = TempDir::new().unwrap();
    let store = ImageStore::open(dir.path().join("images")).await.unwrap();

    let bytes = b"short lived";
    let hash = content_hash(bytes);
    store.put(&hash, bytes, Duration::from_millis(50)).await.unwrap();

    let addr = start_file_server(store.clone(), Duration::from_millis(100)).await;
    let request = format!("GET /img/{} HTTP/1.1\r\n\r\n", hash);

    // Eventually the sweeper runs and the URI goes stale.
    let mut evicted = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let (status, _) = http_get(addr, &request).await;
        if status.contains("404") {
            evicted = true;
            break;
        }
    }
    assert!(evicted, "expired image was never evicted");
    assert!(store.get(&hash).is_err());
}

#[tokio::test]
async fn test_capture_then_fetch_pipeline() {
    let dir = TempDir::new().unwrap();
    let store = ImageStore::open(dir.path().join("images")).await.unwrap();

    let file_addr = start_file_server(store.clone(), Duration::from_secs(3600)).await;
    let config = Config {
        file_server_port: file_addr.port(),
        ..Config::default()
    };

    let state = Arc::new(DispatchState {
        engine: Arc::new(CaptureEngine::new(
            Arc::new(MockBackend::new()),
            Duration::from_millis(500),
        )),
        store,
        config,
    });
    let dispatcher = Dispatcher::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)), state)
        .await
        .unwrap();
    let ws_addr = dispatcher.local_addr().unwrap();
    tokio::spawn(dispatcher.run());

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{}", ws_addr))
        .await
        .unwrap();
    ws.send(Message::Text(
        r#"{"id":"p-1","type":"window_screenshot_request","content":{"window_index":1}}"#
            .to_string(),
    ))
    .await
    .unwrap();

    let reply = loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Text(text) => break serde_json::from_str::<serde_json::Value>(&text).unwrap(),
            _ => {}
        }
    };

    assert_eq!(reply["type"], "window_screenshot_response");
    let uri = reply["content"]["uri"].as_str().unwrap();
    let hash = reply["content"]["hash"].as_str().unwrap();
    assert!(uri.ends_with(&format!("/img/{}", hash)));

    // Fetch the advertised URI path from the file server.
    let (status, body) = http_get(
        file_addr,
        &format!("GET /img/{} HTTP/1.1\r\n\r\n", hash),
    )
    .await;
    assert!(status.contains("200"));
    assert_eq!(content_hash(&body), hash);
    assert_eq!(&body[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
}
