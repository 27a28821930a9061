use std::sync::Arc;
use tokio::runtime::Handle;

use crate::config::ResolvedConfig;
use crate::fetch::{Fetch, InterceptedFetch};
use crate::layer::ConsoleLayer;
use crate::self_ref::SelfReferenceFilter;
use crate::transmitter::Transmitter;

/// The agent's context: one transmitter and one self-reference filter shared
/// by every wrapper it hands out.
///
/// Building an `Interceptor` patches nothing. Wrappers are produced by
/// [`Interceptor::console_layer`] and [`Interceptor::fetch`], and process-wide
/// hooks are installed by [`crate::init::install`]. Independent instances can
/// coexist, which is what the tests rely on.
#[derive(Clone)]
pub struct Interceptor {
    pub(crate) transmitter: Arc<Transmitter>,
    pub(crate) filter: Arc<SelfReferenceFilter>,
    pub(crate) runtime: Handle,
}

impl Interceptor {
    /// **Parameters**
    /// - `config`: resolved endpoint and credentials.
    /// - `original_fetch`: the unwrapped primitive used for delivery.
    /// - `runtime`: where delivery and detached tasks are spawned.
    pub fn new(config: &ResolvedConfig, original_fetch: Arc<dyn Fetch>, runtime: Handle) -> Self {
        let transmitter = Arc::new(Transmitter::new(config, original_fetch, runtime.clone()));
        let filter = Arc::new(SelfReferenceFilter::new(
            &config.endpoint,
            config.page_url.clone(),
        ));
        Interceptor {
            transmitter,
            filter,
            runtime,
        }
    }

    pub fn transmitter(&self) -> &Arc<Transmitter> {
        &self.transmitter
    }

    pub fn filter(&self) -> &SelfReferenceFilter {
        &self.filter
    }

    /// Wrap the original output layer so its events are also reported.
    pub fn console_layer<L>(&self, original: L) -> ConsoleLayer<L> {
        ConsoleLayer::new(original, Arc::clone(&self.transmitter))
    }

    /// Wrap a fetch primitive so its failures are reported.
    pub fn fetch<F: Fetch>(&self, original: F) -> InterceptedFetch<F> {
        InterceptedFetch::new(original, Arc::clone(&self.transmitter), Arc::clone(&self.filter))
    }
}
