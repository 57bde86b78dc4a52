#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use sitepulse_service::validation::{TargetPolicy, ValidationError, validate_site_url};
use sitepulse_service::{CheckOutcome, Prober};

/// How the fixture server answers
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Answer every request with this status
    Status(u16),
    /// 405 for HEAD, `get_status` for GET
    RejectHead { head_status: u16, get_status: u16 },
    /// Accept the connection and never answer
    Hang,
    /// 302 to the root of another local port
    RedirectTo(u16),
    /// 302 back to this server, forever
    RedirectLoop,
}

/// Minimal HTTP/1.1 server on 127.0.0.1 for probe tests
pub struct FixtureServer {
    pub addr: SocketAddr,
    methods: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl FixtureServer {
    pub async fn spawn(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let methods = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&methods);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                let seen = Arc::clone(&seen);
                tokio::spawn(async move { serve(stream, behavior, seen).await });
            }
        });

        Self { addr, methods, handle }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn methods(&self) -> Vec<String> {
        self.methods.lock().unwrap().clone()
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut stream: TcpStream, behavior: Behavior, seen: Arc<Mutex<Vec<String>>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let request = String::from_utf8_lossy(&buf);
    let method = request.split_whitespace().next().unwrap_or_default().to_string();
    seen.lock().unwrap().push(method.clone());

    let (status, location) = match behavior {
        Behavior::Status(status) => (status, None),
        Behavior::RejectHead { head_status, get_status } => {
            (if method == "HEAD" { head_status } else { get_status }, None)
        }
        Behavior::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            return;
        }
        Behavior::RedirectTo(port) => (302, Some(port)),
        Behavior::RedirectLoop => (302, stream.local_addr().ok().map(|addr| addr.port())),
    };

    let location = location.map(|port| format!("location: http://127.0.0.1:{port}/\r\n")).unwrap_or_default();
    let response =
        format!("HTTP/1.1 {status} Fixture\r\n{location}content-length: 0\r\nconnection: close\r\n\r\n");
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// An address nothing listens on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

/// Planned result of one scripted probe
#[derive(Debug, Clone, Copy)]
pub enum Scripted {
    Up(u64),
    HttpError(u16, u64),
    Down,
}

/// Prober that replays planned outcomes, then repeats `fallback`
pub struct ScriptedProber {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Scripted,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedProber {
    pub fn new(script: impl IntoIterator<Item = Scripted>, fallback: Scripted) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(outcome: Scripted) -> Self {
        Self::new([], outcome)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, url: &str, _timeout_ms: u64) -> Result<CheckOutcome, ValidationError> {
        validate_site_url(url, TargetPolicy::default())?;
        self.calls.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(match next {
            Scripted::Up(ms) => CheckOutcome::responded(200, ms, Utc::now()),
            Scripted::HttpError(code, ms) => CheckOutcome::responded(code, ms, Utc::now()),
            Scripted::Down => CheckOutcome::unreachable("scripted failure", Utc::now()),
        })
    }
}
