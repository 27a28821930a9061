use reqwest::header::{HeaderValue, InvalidHeaderValue, CONTENT_TYPE};
use reqwest::{Body, Method, Request, Url};
use std::cell::Cell;
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::config::ResolvedConfig;
use crate::fetch::Fetch;
use crate::record::{Labels, Level, LogRecord};

/// Header carrying the API key. The collector expects this name verbatim.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Header carrying the API secret. The collector expects this name verbatim.
pub const API_SECRET_HEADER: &str = "x-api-secret";

tokio::task_local! {
    static REPORTING: ();
}

thread_local! {
    static IN_SEND: Cell<bool> = const { Cell::new(false) };
}

/// Whether the caller is running on the reporting path: inside a delivery
/// task, or inside the synchronous part of [`Transmitter::send`].
///
/// Interceptors check this before reporting, so anything the delivery itself
/// logs, panics on or fetches is never reported again.
pub fn is_reporting() -> bool {
    REPORTING.try_with(|_| ()).is_ok() || IN_SEND.try_with(Cell::get).unwrap_or(false)
}

/// Crates that make up the delivery transport. Their connection tasks run
/// outside any delivery scope, so their events are recognised by target.
pub const TRANSPORT_TARGETS: &[&str] = &[
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
    "want",
    "tokio_util",
    "mio",
];

/// Whether an event target belongs to one of the [`TRANSPORT_TARGETS`].
pub fn is_transport_target(target: &str) -> bool {
    TRANSPORT_TARGETS.iter().any(|krate| {
        target
            .strip_prefix(krate)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    })
}

struct SendGuard {
    was_set: bool,
}

impl SendGuard {
    fn enter() -> Self {
        let was_set = IN_SEND.try_with(|flag| flag.replace(true)).unwrap_or(true);
        SendGuard { was_set }
    }
}

impl Drop for SendGuard {
    fn drop(&mut self) {
        let was_set = self.was_set;
        let _ = IN_SEND.try_with(|flag| flag.set(was_set));
    }
}

/// Sends [`LogRecord`]s to the collection endpoint, one POST per record.
///
/// Delivery goes through the *original* fetch primitive, never through an
/// intercepted one.
pub struct Transmitter {
    fetch: Arc<dyn Fetch>,
    endpoint: Url,
    api_key: String,
    api_secret: String,
    runtime: Handle,
}

impl Transmitter {
    /// **Parameters**
    /// - `config`: resolved endpoint and credentials.
    /// - `fetch`: primitive used for delivery.
    /// - `runtime`: where detached delivery tasks are spawned. Captured here
    ///   so that `send` works from threads without a runtime, such as a
    ///   panicking thread.
    pub fn new(config: &ResolvedConfig, fetch: Arc<dyn Fetch>, runtime: Handle) -> Self {
        Transmitter {
            fetch,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            runtime,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Build a record and deliver it in a detached task.
    ///
    /// Returns immediately. The task's outcome is deliberately never
    /// observed: delivery errors, non-2xx answers and a hung collector are
    /// all invisible to the caller and are never retried or re-reported.
    pub fn send(&self, level: Level, message: impl Into<String>, labels: Labels) {
        let _guard = SendGuard::enter();

        let record = LogRecord::new(level, message, labels);
        let request = match self.build_request(&record) {
            Ok(request) => request,
            Err(_) => return,
        };

        let fetch = Arc::clone(&self.fetch);
        let task = REPORTING.scope((), async move {
            let _ = execute(&*fetch, request).await;
        });
        drop(self.runtime.spawn(task));
    }

    /// Deliver a record and wait for the outcome.
    pub async fn deliver(&self, record: &LogRecord) -> Result<(), TransmitError> {
        let request = self.build_request(record)?;
        REPORTING.scope((), execute(&*self.fetch, request)).await
    }

    /// The exact request sent for `record`.
    pub fn build_request(&self, record: &LogRecord) -> Result<Request, TransmitError> {
        let body = serde_json::to_vec(record)?;

        let mut request = Request::new(Method::POST, self.endpoint.clone());
        let headers = request.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(API_KEY_HEADER, HeaderValue::from_str(&self.api_key)?);
        headers.insert(API_SECRET_HEADER, HeaderValue::from_str(&self.api_secret)?);
        *request.body_mut() = Some(Body::from(body));

        Ok(request)
    }
}

async fn execute(fetch: &dyn Fetch, request: Request) -> Result<(), TransmitError> {
    let response = fetch.fetch(request).await?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(TransmitError::Status(status.as_u16()))
    }
}

/// Why a delivery did not succeed. Only [`Transmitter::deliver`] surfaces
/// these; [`Transmitter::send`] discards them.
#[derive(thiserror::Error, Debug)]
pub enum TransmitError {
    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("credential is not a valid header value")]
    Header(#[from] InvalidHeaderValue),

    #[error("request to collection endpoint failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("collection endpoint answered with status {0}")]
    Status(u16),
}
