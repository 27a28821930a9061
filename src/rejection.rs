use std::fmt::Display;
use std::future::Future;

use crate::interceptor::Interceptor;
use crate::record::{labels, Level, TYPE_UNHANDLED_REJECTION};
use crate::render::Arg;

/// Message of every unhandled-rejection record.
pub const UNHANDLED_REJECTION_MESSAGE: &str = "Unhandled Promise rejection";

impl Interceptor {
    /// Report a failure nobody was waiting for.
    ///
    /// Unlike uncaught errors, rejections are reported even when the reason
    /// mentions the collection endpoint.
    pub fn on_unhandled_rejection(&self, reason: impl Into<Arg>) {
        let reason = reason.into().render();
        self.transmitter.send(
            Level::Error,
            UNHANDLED_REJECTION_MESSAGE,
            labels(TYPE_UNHANDLED_REJECTION, [("reason", Some(reason))]),
        );
    }

    /// Run `future` as a detached task and report it if it fails.
    ///
    /// Nothing can await the task, so an `Err` would otherwise vanish. `Ok`
    /// values are dropped.
    pub fn spawn_detached<F, T, E>(&self, future: F)
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let interceptor = self.clone();
        drop(self.runtime.spawn(async move {
            if let Err(e) = future.await {
                interceptor.on_unhandled_rejection(Arg::text(e));
            }
        }));
    }
}
