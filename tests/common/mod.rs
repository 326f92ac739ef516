//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Raw request heads received by a mock backend.
#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<String>>>);

#[allow(dead_code)]
impl RequestLog {
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        401 => "401 Unauthorized",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Read the request head and return it (request line + headers).
async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request target (path + query) and returns status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, RequestLog)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = RequestLog::default();
    let f = Arc::new(f);
    let server_log = log.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let log = server_log.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let target = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();
                        log.0.lock().unwrap().push(head);

                        let (status, body) = f(target).await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_line(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, log)
}

/// Backend serving the event-management API shape for event 42.
///
/// `subscriptions_status` controls the subscription-list answer.
#[allow(dead_code)]
pub async fn start_event_api(subscriptions_status: u16) -> (SocketAddr, RequestLog) {
    start_programmable_backend(move |target: String| async move {
        if target.starts_with("/api/v2/events/42/") {
            (200, r#"{"data":[{"id":"42","title":"T"}]}"#.to_string())
        } else if target.starts_with("/api/v2/event-subscriptions/") && target.contains("42") {
            if subscriptions_status == 200 {
                (
                    200,
                    r#"{"data":[{"subscriber":{"first_name":"Ann"}},{"subscriber":{"first_name":"Bo"}}]}"#
                        .to_string(),
                )
            } else {
                (subscriptions_status, r#"{"detail":"boom"}"#.to_string())
            }
        } else {
            (404, r#"{"detail":"not found"}"#.to_string())
        }
    })
    .await
}

/// Endpoint templates pointing at a mock backend.
#[allow(dead_code)]
pub fn event_api_uris(addr: SocketAddr) -> Vec<String> {
    vec![
        format!("http://{}/api/v2/events/{{0}}/", addr),
        format!("http://{}/api/v2/event-subscriptions/?event_ids=[{{0}}]", addr),
    ]
}
