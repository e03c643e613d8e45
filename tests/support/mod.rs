#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

#[derive(Clone)]
pub struct ResponseChunk {
    pub delay_ms: u64,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ScriptedResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub chunks: Vec<ResponseChunk>,
}

/// One-shot HTTP server that answers the n-th request with the n-th script
/// and records every JSON request body it received.
pub struct AgentServer {
    pub base_url: String,
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
    handle: JoinHandle<()>,
}

impl AgentServer {
    pub async fn start(scripts: Vec<ScriptedResponse>) -> Self {
        let scripts = Arc::new(scripts);
        let bodies = Arc::new(Mutex::new(Vec::new()));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let base_url = format!("http://{}", listener.local_addr().expect("listener address"));

        let handle = tokio::spawn({
            let bodies = Arc::clone(&bodies);
            async move {
                while let Ok((socket, _)) = listener.accept().await {
                    let scripts = Arc::clone(&scripts);
                    let bodies = Arc::clone(&bodies);
                    tokio::spawn(async move {
                        serve_one(socket, scripts, bodies).await;
                    });
                }
            }
        });

        Self {
            base_url,
            bodies,
            handle,
        }
    }

    pub fn request_count(&self) -> usize {
        self.bodies.lock().expect("bodies lock").len()
    }

    pub fn request_bodies(&self) -> Vec<serde_json::Value> {
        self.bodies.lock().expect("bodies lock").clone()
    }
}

impl Drop for AgentServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn sse(payloads: &[&str]) -> ScriptedResponse {
    let body: String = payloads
        .iter()
        .map(|payload| format!("data: {payload}\n\n"))
        .collect();
    ScriptedResponse {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: body.into_bytes(),
        }],
    }
}

/// Each payload becomes its own chunk, sent `delay_ms` after the previous one.
pub fn sse_paced(delay_ms: u64, payloads: &[&str]) -> ScriptedResponse {
    ScriptedResponse {
        status: 200,
        content_type: "text/event-stream",
        chunks: payloads
            .iter()
            .map(|payload| ResponseChunk {
                delay_ms,
                bytes: format!("data: {payload}\n\n").into_bytes(),
            })
            .collect(),
    }
}

pub fn json_error(status: u16, body: &str) -> ScriptedResponse {
    ScriptedResponse {
        status,
        content_type: "application/json",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: body.as_bytes().to_vec(),
        }],
    }
}

async fn serve_one(
    mut socket: TcpStream,
    scripts: Arc<Vec<ScriptedResponse>>,
    bodies: Arc<Mutex<Vec<serde_json::Value>>>,
) {
    let Ok(body) = read_request_body(&mut socket).await else {
        return;
    };

    let index = {
        let mut bodies = bodies.lock().expect("bodies lock");
        bodies.push(serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null));
        bodies.len() - 1
    };
    let response = scripts
        .get(index)
        .cloned()
        .unwrap_or_else(|| json_error(500, r#"{"detail":"unexpected request"}"#));

    let reason = if response.status == 200 { "OK" } else { "Error" };
    let headers = format!(
        "HTTP/1.1 {} {reason}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        response.status, response.content_type,
    );
    if socket.write_all(headers.as_bytes()).await.is_err() {
        return;
    }

    for chunk in response.chunks {
        if chunk.delay_ms > 0 {
            sleep(Duration::from_millis(chunk.delay_ms)).await;
        }
        let framed = [
            format!("{:X}\r\n", chunk.bytes.len()).into_bytes(),
            chunk.bytes,
            b"\r\n".to_vec(),
        ]
        .concat();
        if socket.write_all(&framed).await.is_err() {
            return;
        }
        let _ = socket.flush().await;
    }

    let _ = socket.write_all(b"0\r\n\r\n").await;
    let _ = socket.shutdown().await;
}

async fn read_request_body(socket: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        request.extend_from_slice(&buffer[..n]);
        if let Some(pos) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..header_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < header_end + content_length {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
    }
    Ok(request[header_end..].to_vec())
}
