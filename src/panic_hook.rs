use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::interceptor::Interceptor;
use crate::record::{labels, Level, TYPE_UNCAUGHT_ERROR};
use crate::transmitter::is_reporting;

static HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

/// An error nobody caught: a panic, or an error event the host surfaces
/// from its own runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UncaughtError {
    pub message: String,
    /// Source of the error; a file path for panics.
    pub url: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub stack: Option<String>,
}

impl UncaughtError {
    pub fn new(message: impl Into<String>) -> Self {
        UncaughtError {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let backtrace = Backtrace::capture();
        let stack = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };

        let location = info.location();
        UncaughtError {
            message: payload_text(info.payload()),
            url: location.map(|l| l.file().to_string()),
            line: location.map(|l| l.line()),
            column: location.map(|l| l.column()),
            stack,
        }
    }
}

fn payload_text(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

impl Interceptor {
    /// Report an uncaught error, unless it originates from the collection
    /// endpoint or from the reporting path itself.
    pub fn on_uncaught_error(&self, error: &UncaughtError) {
        if is_reporting() || self.filter.is_self(error.url.as_deref()) {
            return;
        }

        self.transmitter.send(
            Level::Error,
            error.message.clone(),
            labels(
                TYPE_UNCAUGHT_ERROR,
                [
                    ("url", error.url.clone()),
                    ("lineNo", error.line.map(|l| l.to_string())),
                    ("columnNo", error.column.map(|c| c.to_string())),
                    ("stack", Some(error.stack.clone().unwrap_or_default())),
                ],
            ),
        );
    }
}

/// Chain a reporting hook after the current panic hook.
///
/// The previous hook is captured once and always runs first, so the default
/// panic output is unchanged. Returns `false` without touching anything when
/// a reporting hook is already installed in this process.
pub fn install_panic_hook(interceptor: Interceptor) -> bool {
    if HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        return false;
    }

    let original = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        original(info);
        interceptor.on_uncaught_error(&UncaughtError::from_panic(info));
    }));
    true
}

/// Whether [`install_panic_hook`] has run in this process.
pub fn panic_hook_installed() -> bool {
    HOOK_INSTALLED.load(Ordering::SeqCst)
}
