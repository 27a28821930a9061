//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, Request, Response, Url};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::{AgentConfig, ResolvedConfig};
use crate::fetch::Fetch;
use crate::record::LogRecord;
use crate::transmitter::is_reporting;

pub const ENDPOINT: &str = "https://collect.example.com/v1/logs";

pub fn resolved_for(endpoint: &str) -> ResolvedConfig {
    AgentConfig {
        endpoint: Some(endpoint.to_string()),
        api_key: Some("key".into()),
        api_secret: Some("secret".into()),
        page_url: None,
    }
    .resolve()
    .expect("valid test config")
}

pub fn resolved() -> ResolvedConfig {
    resolved_for(ENDPOINT)
}

/// A URL on a local port nothing listens on.
pub fn closed_port_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}{}", port, path)
}

pub fn canned(status: u16) -> Response {
    let response = http::Response::builder()
        .status(status)
        .body("")
        .expect("canned response");
    Response::from(response)
}

#[derive(Debug)]
pub struct Captured {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub record: LogRecord,
    pub reporting: bool,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.record.labels.get(key).and_then(|v| v.as_deref())
    }
}

/// Stands in for the collection endpoint: decodes every posted record.
pub struct RecordingFetch {
    tx: mpsc::UnboundedSender<Captured>,
}

impl RecordingFetch {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Captured>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (RecordingFetch { tx }, rx)
    }
}

#[async_trait]
impl Fetch for RecordingFetch {
    async fn fetch(&self, request: Request) -> reqwest::Result<Response> {
        let body = request.body().and_then(|b| b.as_bytes()).unwrap_or_default();
        let record: LogRecord = serde_json::from_slice(body).expect("log record body");
        let _ = self.tx.send(Captured {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            record,
            reporting: is_reporting(),
        });
        Ok(canned(202))
    }
}

/// Stands in for a page's HTTP target: answers every request with a fixed
/// status and counts calls.
pub struct StubFetch {
    status: u16,
    pub calls: Arc<AtomicUsize>,
}

impl StubFetch {
    pub fn new(status: u16) -> Self {
        StubFetch {
            status,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Fetch for StubFetch {
    async fn fetch(&self, _request: Request) -> reqwest::Result<Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(canned(self.status))
    }
}
