use std::any::TypeId;
use std::sync::Arc;
use tracing::span::{Attributes, Id, Record};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer};

use crate::record::{type_labels, Level, TYPE_CONSOLE};
use crate::render::EventArgs;
use crate::transmitter::{is_reporting, is_transport_target, Transmitter};

/// `tracing_subscriber` layer that wraps the original output layer and
/// reports every event it sees.
///
/// The wrapped layer is captured once at construction and receives every
/// callback exactly as it would without the wrapper. For events, it runs
/// first and synchronously; the report is sent afterwards as a detached
/// task. Events emitted on the reporting path, or by the HTTP transport
/// underneath it, are passed to the original layer but never reported.
pub struct ConsoleLayer<L> {
    inner: L,
    transmitter: Arc<Transmitter>,
}

impl<L> ConsoleLayer<L> {
    pub(crate) fn new(inner: L, transmitter: Arc<Transmitter>) -> Self {
        ConsoleLayer { inner, transmitter }
    }

    pub fn inner(&self) -> &L {
        &self.inner
    }
}

impl<S, L> Layer<S> for ConsoleLayer<L>
where
    S: Subscriber,
    L: Layer<S>,
{
    fn on_layer(&mut self, subscriber: &mut S) {
        self.inner.on_layer(subscriber);
    }

    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        self.inner.register_callsite(metadata)
    }

    fn enabled(&self, metadata: &Metadata<'_>, ctx: Context<'_, S>) -> bool {
        self.inner.enabled(metadata, ctx)
    }

    fn max_level_hint(&self) -> Option<LevelFilter> {
        self.inner.max_level_hint()
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        self.inner.on_new_span(attrs, id, ctx);
    }

    fn on_record(&self, span: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        self.inner.on_record(span, values, ctx);
    }

    fn on_follows_from(&self, span: &Id, follows: &Id, ctx: Context<'_, S>) {
        self.inner.on_follows_from(span, follows, ctx);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.inner.on_event(event, ctx);

        if is_reporting() || is_transport_target(event.metadata().target()) {
            return;
        }
        let message = EventArgs::from_event(event).render();
        self.transmitter.send(
            Level::from(event.metadata().level()),
            message,
            type_labels(TYPE_CONSOLE),
        );
    }

    fn on_enter(&self, id: &Id, ctx: Context<'_, S>) {
        self.inner.on_enter(id, ctx);
    }

    fn on_exit(&self, id: &Id, ctx: Context<'_, S>) {
        self.inner.on_exit(id, ctx);
    }

    fn on_close(&self, id: Id, ctx: Context<'_, S>) {
        self.inner.on_close(id, ctx);
    }

    fn on_id_change(&self, old: &Id, new: &Id, ctx: Context<'_, S>) {
        self.inner.on_id_change(old, new, ctx);
    }

    #[doc(hidden)]
    unsafe fn downcast_raw(&self, id: TypeId) -> Option<*const ()> {
        if id == TypeId::of::<Self>() {
            Some(self as *const Self as *const ())
        } else {
            self.inner.downcast_raw(id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetch;
    use crate::interceptor::Interceptor;
    use crate::testing::{closed_port_url, resolved, resolved_for, RecordingFetch};
    use async_trait::async_trait;
    use mockito::Server;
    use reqwest::{Request, Response};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::runtime::Handle;
    use tokio::time::{sleep, timeout};
    use tracing_subscriber::layer::{Identity, SubscriberExt};
    use tracing_subscriber::Registry;

    /// Plays the original output: remembers every message it was handed.
    #[derive(Clone, Default)]
    struct CollectingLayer {
        seen: Arc<Mutex<Vec<String>>>,
    }

    impl<S: Subscriber> Layer<S> for CollectingLayer {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let message = EventArgs::from_event(event).render();
            self.seen.lock().unwrap().push(message);
        }
    }

    /// A collector double that itself logs while delivering.
    struct ChattyFetch(RecordingFetch);

    #[async_trait]
    impl Fetch for ChattyFetch {
        async fn fetch(&self, request: Request) -> reqwest::Result<Response> {
            tracing::warn!(bytes = 42, "delivering record");
            self.0.fetch(request).await
        }
    }

    #[tokio::test]
    async fn original_runs_once_and_record_is_sent() {
        let (collector, mut rx) = RecordingFetch::new();
        let interceptor = Interceptor::new(&resolved(), Arc::new(collector), Handle::current());
        let original = CollectingLayer::default();
        let subscriber = Registry::default().with(interceptor.console_layer(original.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(x = 1, "boom");
        });

        assert_eq!(*original.seen.lock().unwrap(), [r#"boom {"x":1}"#]);

        let captured = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(captured.record.message, r#"boom {"x":1}"#);
        assert_eq!(captured.record.level, Level::Error);
        assert_eq!(captured.label("type"), Some("console"));
        assert_eq!(captured.record.labels.len(), 1);
    }

    #[tokio::test]
    async fn each_tracing_level_maps_to_a_record_level() {
        let (collector, mut rx) = RecordingFetch::new();
        let interceptor = Interceptor::new(&resolved(), Arc::new(collector), Handle::current());
        let subscriber = Registry::default().with(interceptor.console_layer(CollectingLayer::default()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::trace!("t");
            tracing::debug!("d");
            tracing::info!("i");
            tracing::warn!("w");
            tracing::error!("e");
        });

        let mut levels = Vec::new();
        for _ in 0..5 {
            let captured = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
            levels.push((captured.record.message.clone(), captured.record.level));
        }
        levels.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            levels,
            [
                ("d".to_string(), Level::Debug),
                ("e".to_string(), Level::Error),
                ("i".to_string(), Level::Info),
                ("t".to_string(), Level::Log),
                ("w".to_string(), Level::Warn),
            ]
        );
    }

    #[tokio::test]
    async fn events_from_delivery_are_not_reported() {
        let (collector, mut rx) = RecordingFetch::new();
        let interceptor =
            Interceptor::new(&resolved(), Arc::new(ChattyFetch(collector)), Handle::current());
        let original = CollectingLayer::default();
        let subscriber = Registry::default().with(interceptor.console_layer(original.clone()));
        let _default = tracing::subscriber::set_default(subscriber);

        tracing::info!("page event");

        let captured = timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        assert_eq!(captured.record.message, "page event");

        sleep(Duration::from_millis(50)).await;
        assert!(rx.try_recv().is_err());

        // The original output still saw the delivery's own event.
        let seen = original.seen.lock().unwrap().clone();
        assert_eq!(seen, ["page event", r#"delivering record {"bytes":42}"#]);
    }

    #[tokio::test]
    async fn verbose_transport_events_do_not_feed_back() {
        let mut server = Server::new_async().await;
        let collector = server
            .mock("POST", "/v1/logs")
            .with_status(202)
            .expect(1)
            .create_async()
            .await;

        let config = resolved_for(&format!("{}/v1/logs", server.url()));
        let interceptor =
            Interceptor::new(&config, Arc::new(reqwest::Client::new()), Handle::current());
        let subscriber = Registry::default()
            .with(interceptor.console_layer(Identity::new()))
            .with(LevelFilter::DEBUG);
        let _default = tracing::subscriber::set_default(subscriber);

        tracing::info!("one page event");

        let delivered = async {
            while !collector.matched_async().await {
                sleep(Duration::from_millis(20)).await;
            }
        };
        timeout(Duration::from_secs(5), delivered).await.unwrap();

        // Connection tasks keep logging after the POST; none of it is sent.
        sleep(Duration::from_millis(500)).await;
        collector.assert_async().await;
    }

    #[tokio::test]
    async fn original_output_runs_once_when_delivery_fails() {
        let config = resolved_for(&closed_port_url("/v1/logs"));
        let interceptor =
            Interceptor::new(&config, Arc::new(reqwest::Client::new()), Handle::current());
        let original = CollectingLayer::default();
        let subscriber = Registry::default()
            .with(interceptor.console_layer(original.clone()))
            .with(LevelFilter::DEBUG);
        let _default = tracing::subscriber::set_default(subscriber);

        tracing::error!(order_id = 7, "checkout failed");

        // Let the failed delivery run to completion.
        sleep(Duration::from_millis(300)).await;

        let seen = original.seen.lock().unwrap().clone();
        let page_events = seen
            .iter()
            .filter(|m| m.as_str() == r#"checkout failed {"order_id":7}"#)
            .count();
        assert_eq!(page_events, 1);
    }
}
