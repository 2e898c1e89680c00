//! Shared utilities for integration tests.

#![allow(dead_code)]

use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use pos_gateway::config::GatewayConfig;
use pos_gateway::http::server::AppState;
use pos_gateway::http::HyperTransport;
use pos_gateway::lifecycle::Shutdown;
use pos_gateway::pipeline::Pipeline;
use pos_gateway::security::auth::{TokenValidation, TokenValidationError, TokenValidator};
use pos_gateway::HttpServer;

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Handle to a running mock backend.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Start a mock backend that always answers 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> MockBackend {
    start_programmable_backend(move |_req| async move { (200, body.to_string()) }).await
}

/// Start a programmable mock backend on an ephemeral loopback port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn(RecordedRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        recorded.lock().unwrap().push(request.clone());

                        let (status, body) = f(request).await;
                        let response = format!(
                            "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            reason(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockBackend { addr, requests }
}

async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(RecordedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        404 => "Not Found",
        408 => "Request Timeout",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Token validator with a fixed token → claims table.
#[derive(Default)]
pub struct FakeValidator {
    tokens: HashMap<String, TokenValidation>,
    calls: Mutex<u32>,
}

impl FakeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `token` as valid for `user_id` with `roles`.
    pub fn with_user(mut self, token: &str, user_id: &str, roles: &[&str]) -> Self {
        self.tokens.insert(
            token.to_string(),
            TokenValidation {
                valid: true,
                user_id: Some(user_id.to_string()),
                roles: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
        self
    }

    pub fn calls(&self) -> u32 {
        *self.calls.lock().unwrap()
    }
}

impl TokenValidator for FakeValidator {
    fn validate<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Result<TokenValidation, TokenValidationError>> {
        *self.calls.lock().unwrap() += 1;
        let validation = self.tokens.get(token).cloned().unwrap_or_else(TokenValidation::invalid);
        Box::pin(async move { Ok(validation) })
    }
}

/// Default POS configuration with every service pointed at `backend_url`
/// and retry delays shortened for tests.
pub fn test_config(backend_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    for service in &mut config.services {
        service.base_url = backend_url.to_string();
        service.timeout_ms = 2_000;
    }
    config.retries.initial_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config.observability.metrics_enabled = false;
    config
}

/// The standard validator used across integration tests.
pub fn standard_validator() -> FakeValidator {
    FakeValidator::new()
        .with_user("customer-token", "cust-1", &["customer"])
        .with_user("staff-token", "staff-1", &["staff"])
        .with_user("admin-token", "admin-1", &["admin"])
}

/// App state over the real HTTP transport and a fake validator.
pub fn app_state(config: GatewayConfig, validator: Arc<dyn TokenValidator>) -> AppState {
    let transport = Arc::new(HyperTransport::new(config.security.max_response_body_size));
    let pipeline = Pipeline::with_collaborators(&config, transport, validator);
    AppState::new(config, pipeline)
}

/// Start the gateway on an ephemeral port. Returns its address.
pub async fn start_gateway(state: AppState, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = HttpServer::new(state).run(listener, server_shutdown).await;
    });

    wait_for_listener(addr).await;
    addr
}

/// Serve `router` on an ephemeral port until shutdown.
pub async fn serve_router(router: axum::Router, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
            })
            .await;
    });

    wait_for_listener(addr).await;
    addr
}

async fn wait_for_listener(addr: SocketAddr) {
    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("listener at {addr} never came up");
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
