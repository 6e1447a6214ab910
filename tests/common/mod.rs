//! Minimal local HTTP stub for integration tests.
//!
//! Answers GET requests from a fixed route table, one connection per
//! request, and records every request target it saw.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One canned response.
#[derive(Clone)]
pub struct Route {
    pub path: &'static str,
    /// Substring the query string must contain for this route to match.
    pub query: Option<&'static str>,
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl Route {
    pub fn json(path: &'static str, body: serde_json::Value) -> Self {
        Self {
            path,
            query: None,
            status: 200,
            content_type: "application/json",
            body: body.to_string().into_bytes(),
            delay: Duration::ZERO,
        }
    }

    pub fn raw(path: &'static str, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            query: None,
            status: 200,
            content_type,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn when_query(mut self, needle: &'static str) -> Self {
        self.query = Some(needle);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A running stub server.
pub struct StubServer {
    pub base: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Request targets seen so far, in arrival order.
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }
}

/// Start a stub on an ephemeral port. Routes are tried in order.
pub async fn serve(routes: Vec<Route>) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let hits = Arc::new(Mutex::new(Vec::new()));
    let routes = Arc::new(routes);

    let recorded = Arc::clone(&hits);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let routes = Arc::clone(&routes);
            let recorded = Arc::clone(&recorded);
            tokio::spawn(async move {
                let _ = handle(stream, &routes, &recorded).await;
            });
        }
    });

    StubServer { base, hits }
}

async fn handle(
    mut stream: TcpStream,
    routes: &[Route],
    hits: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let target = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    hits.lock().unwrap().push(target.clone());

    let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
    let route = routes
        .iter()
        .find(|r| r.path == path && r.query.map_or(true, |q| query.contains(q)));

    let (status, content_type, body, delay) = match route {
        Some(r) => (r.status, r.content_type, r.body.clone(), r.delay),
        None => (404, "text/plain", b"not found".to_vec(), Duration::ZERO),
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let header = format!(
        "HTTP/1.1 {status} STUB\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(header.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.shutdown().await
}
