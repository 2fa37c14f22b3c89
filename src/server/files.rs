//! Minimal HTTP file endpoint
//!
//! Serves exactly one route, `GET /img/{hash}`, straight off a TCP listener.
//! The surface is too small to justify an HTTP framework: one request line,
//! a couple of headers, close the connection. The server also owns the
//! periodic store sweep, since it is the component whose URIs go stale when
//! entries expire.

use std::{net::SocketAddr, time::Duration};

use chrono::Utc;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tracing::{debug, info, warn};

use crate::store::ImageStore;

/// Largest request head we bother reading; anything beyond this is noise
const MAX_REQUEST_BYTES: usize = 8 * 1024;

/// HTTP server exposing stored images by content hash
pub struct FileServer {
    listener:       TcpListener,
    store:          ImageStore,
    sweep_interval: Duration,
}

impl FileServer {
    /// Binds the listener; pass port 0 to let the OS pick one
    pub async fn bind(
        addr: SocketAddr,
        store: ImageStore,
        sweep_interval: Duration,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("File server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            store,
            sweep_interval,
        })
    }

    /// The address actually bound
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests forever, sweeping the store in the background
    pub async fn run(self) -> std::io::Result<()> {
        let sweeper_store = self.store.clone();
        let sweep_interval = self.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            // The first tick fires immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                sweeper_store.sweep(Utc::now()).await;
            }
        });

        loop {
            let (socket, peer) = self.listener.accept().await?;
            let store = self.store.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(socket, store).await {
                    debug!("File request from {} failed: {}", peer, e);
                }
            });
        }
    }
}

async fn handle_connection(mut socket: TcpStream, store: ImageStore) -> std::io::Result<()> {
    let mut buf = vec![0u8; MAX_REQUEST_BYTES];
    let mut read = 0;

    // Read until the end of the request head; bodies are ignored.
    while read < buf.len() {
        let n = socket.read(&mut buf[read..]).await?;
        if n == 0 {
            break;
        }
        read += n;
        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let head = String::from_utf8_lossy(&buf[..read]);
    let Some((method, path)) = parse_request_line(&head) else {
        return write_response(&mut socket, "400 Bad Request", "text/plain", b"bad request")
            .await;
    };

    if method != "GET" {
        return write_response(
            &mut socket,
            "405 Method Not Allowed",
            "text/plain",
            b"method not allowed",
        )
        .await;
    }

    let Some(hash) = image_hash(path) else {
        return write_response(&mut socket, "404 Not Found", "text/plain", b"not found").await;
    };

    let entry = match store.get(hash) {
        Ok(entry) => entry,
        Err(_) => {
            debug!("No entry for hash {}", hash);
            return write_response(&mut socket, "404 Not Found", "text/plain", b"not found")
                .await;
        }
    };

    match tokio::fs::read(&entry.file_path).await {
        Ok(bytes) => write_response(&mut socket, "200 OK", "image/png", &bytes).await,
        Err(e) => {
            // Entry known but file gone: a sweep raced us or the file was
            // removed externally. 404 either way.
            warn!("Stored file {:?} unreadable: {}", entry.file_path, e);
            write_response(&mut socket, "404 Not Found", "text/plain", b"not found").await
        }
    }
}

/// Parses `"GET /img/abc HTTP/1.1"` into `("GET", "/img/abc")`
fn parse_request_line(head: &str) -> Option<(&str, &str)> {
    let line = head.lines().next()?;
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let path = parts.next()?;
    parts.next()?; // HTTP version must be present
    Some((method, path))
}

/// Extracts the hash from an `/img/{hash}` path
///
/// Hashes are lowercase hex; anything else (including traversal attempts)
/// is rejected here rather than reaching the filesystem.
fn image_hash(path: &str) -> Option<&str> {
    let hash = path.strip_prefix("/img/")?;
    if hash.is_empty() || !hash.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
    {
        return None;
    }
    Some(hash)
}

async fn write_response(
    socket: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &[u8],
) -> std::io::Result<()> {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    socket.write_all(head.as_bytes()).await?;
    socket.write_all(body).await?;
    socket.flush().await
}
