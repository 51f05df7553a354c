//! Minimal HTTP/1.1 server for exercising the reqwest code paths offline.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct TestServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Request lines seen so far, e.g. `GET /search?query=x HTTP/1.1`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    /// Send the body with chunked transfer encoding and no length.
    pub chunked: bool,
}

impl Reply {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            chunked: false,
        }
    }

    pub fn chunked(body: impl Into<Vec<u8>>) -> Self {
        Self {
            chunked: true,
            ..Self::ok(body)
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: b"error".to_vec(),
            chunked: false,
        }
    }
}

/// Answer every connection with `reply`.
pub async fn serve(reply: Reply) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let seen = Arc::clone(&requests);
    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let reply = reply.clone();
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let head = String::from_utf8_lossy(&head).into_owned();
                if let Some(line) = head.lines().next() {
                    seen.lock().push(line.to_string());
                }

                let mut response = format!("HTTP/1.1 {} X\r\nConnection: close\r\n", reply.status).into_bytes();
                if reply.chunked {
                    response.extend_from_slice(b"Transfer-Encoding: chunked\r\n\r\n");
                    for chunk in reply.body.chunks(7) {
                        response.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
                        response.extend_from_slice(chunk);
                        response.extend_from_slice(b"\r\n");
                    }
                    response.extend_from_slice(b"0\r\n\r\n");
                } else {
                    response.extend_from_slice(format!("Content-Length: {}\r\n\r\n", reply.body.len()).as_bytes());
                    response.extend_from_slice(&reply.body);
                }
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    TestServer {
        base_url: format!("http://{addr}"),
        requests,
        handle,
    }
}

/// NDJSON body of `n` remote results with `[P01]..[P03]` filenames.
pub fn ndjson(n: usize) -> Vec<u8> {
    let mut body = Vec::new();
    for i in 0..n {
        let line = serde_json::json!({
            "filename": format!("[P{:02}] ep.json", i % 3 + 1),
            "timestamp": format!("{}m{}s", i / 60, i % 60),
            "text": format!("line {i}"),
            "match_ratio": 100.0 - i as f64,
            "similarity": 0.75,
        });
        body.extend_from_slice(line.to_string().as_bytes());
        body.push(b'\n');
    }
    body
}
