//! Shared utilities for integration tests: an in-process mock upstream.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the mock upstream should do with one request.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
    pub hang: bool,
}

impl MockReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
            hang: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: format!(r#"{{"error": "status {}"}}"#, status),
            delay: Duration::ZERO,
            hang: false,
        }
    }

    pub fn rate_limited() -> Self {
        Self::status(429)
    }

    /// Accept the request and never answer.
    pub fn hang() -> Self {
        Self {
            hang: true,
            ..Self::status(200)
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A programmable HTTP/1.1 server bound to an ephemeral local port.
pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    hits: Arc<AtomicUsize>,
}

impl MockUpstream {
    /// Start a server that answers every request with the reply produced by
    /// `handler(request_index, request_line)`.
    pub async fn start<F, Fut>(handler: F) -> Self
    where
        F: Fn(usize, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = MockReply> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let hits = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(handler);

        let recorded = requests.clone();
        let counter = hits.clone();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };
                let handler = handler.clone();
                let recorded = recorded.clone();
                let counter = counter.clone();

                tokio::spawn(async move {
                    let request_line = read_request_line(&mut socket).await;
                    if request_line.is_empty() {
                        return;
                    }
                    let index = counter.fetch_add(1, Ordering::SeqCst);
                    recorded.lock().unwrap().push(request_line.clone());

                    let reply = handler(index, request_line).await;
                    if reply.hang {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        return;
                    }
                    if !reply.delay.is_zero() {
                        tokio::time::sleep(reply.delay).await;
                    }
                    write_reply(&mut socket, &reply).await;
                });
            }
        });

        Self {
            addr,
            requests,
            hits,
        }
    }

    /// Start a server that always gives the same reply.
    pub async fn fixed(reply: MockReply) -> Self {
        Self::start(move |_, _| {
            let reply = reply.clone();
            async move { reply }
        })
        .await
    }

    /// Start a server that walks through `replies` in order, repeating the
    /// last one once the script runs out.
    pub async fn scripted(replies: Vec<MockReply>) -> Self {
        let replies = Arc::new(replies);
        Self::start(move |index, _| {
            let replies = replies.clone();
            async move {
                let i = index.min(replies.len() - 1);
                replies[i].clone()
            }
        })
        .await
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of requests received so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request lines received so far, e.g. `GET /api/heroes HTTP/1.1`
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Extract the request target from a request line.
pub fn request_path(request_line: &str) -> String {
    request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("")
        .to_string()
}

async fn read_request_line(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let mut expected_len: Option<usize> = None;

    loop {
        if let Some(len) = expected_len {
            if buf.len() >= len {
                break;
            }
        }
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);

        if expected_len.is_none() {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                // Drain any body so closing the socket does not reset the connection.
                let head = String::from_utf8_lossy(&buf[..pos]).to_ascii_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                expected_len = Some(pos + 4 + body_len);
            }
        }
    }

    String::from_utf8_lossy(&buf)
        .lines()
        .next()
        .unwrap_or("")
        .to_string()
}

async fn write_reply(socket: &mut TcpStream, reply: &MockReply) {
    let status = StatusCode::from_u16(reply.status).unwrap();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown"),
        reply.body.len(),
        reply.body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}
