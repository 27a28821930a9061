use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use crate::config::AgentConfig;
use crate::env::{env_or, LOGGYTO_LOG_LEVEL_ENV, LOGGYTO_STDOUT_ENV};
use crate::fetch::InterceptedFetch;
use crate::interceptor::Interceptor;
use crate::panic_hook::install_panic_hook;

static INSTALLED: AtomicBool = AtomicBool::new(false);

/// Options for the process-wide subscriber set up by [`install`].
///
/// **Fields**
/// - `enable_stdout`: keep the `fmt` layer as the original output. When
///   `false`, events are only reported.
/// - `max_level`: most verbose level the subscriber accepts, for the
///   original output and reporting alike.
#[derive(Clone, Debug)]
pub struct InstallOptions {
    pub enable_stdout: bool,
    pub max_level: LevelFilter,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            enable_stdout: true,
            max_level: LevelFilter::INFO,
        }
    }
}

impl InstallOptions {
    /// Read `LOGGYTO_STDOUT` and `LOGGYTO_LOG_LEVEL`, keeping defaults for
    /// unparsable values.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enable_stdout: env_or(LOGGYTO_STDOUT_ENV, "true")
                .parse()
                .unwrap_or(defaults.enable_stdout),
            max_level: env_or(LOGGYTO_LOG_LEVEL_ENV, "info")
                .parse()
                .unwrap_or(defaults.max_level),
        }
    }
}

/// Handle to an installed agent.
pub struct Agent {
    interceptor: Interceptor,
    fetch: InterceptedFetch<Client>,
}

impl Agent {
    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    /// The intercepted HTTP client; route the host's own requests through it.
    pub fn fetch(&self) -> &InterceptedFetch<Client> {
        &self.fetch
    }
}

/// Install the agent for this process.
///
/// **Effects**
///
/// Sets the global `tracing` subscriber to a [`Registry`] whose original
/// `fmt` output is wrapped by a console interceptor, and chains a reporting
/// panic hook after the current one. Must be called from within a Tokio
/// runtime; its handle runs every delivery.
///
/// **Returns**
/// - `Ok(Some(agent))` when the configuration is complete.
/// - `Ok(None)` when it is not: the same subscriber is installed without
///   the wrapper, one warning is logged through it, no hook is chained and
///   no request is ever made.
/// - `Err(InstallError::AlreadyInstalled)` on every call after the first.
pub fn install(config: &AgentConfig, options: InstallOptions) -> Result<Option<Agent>, InstallError> {
    let runtime = Handle::try_current().map_err(|_| InstallError::NoRuntime)?;
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Err(InstallError::AlreadyInstalled);
    }

    let stdout = options.enable_stdout.then(tracing_subscriber::fmt::layer);

    let resolved = match config.resolve() {
        Ok(resolved) => resolved,
        Err(reason) => {
            let subscriber = Registry::default().with(stdout).with(options.max_level);
            tracing::subscriber::set_global_default(subscriber)?;
            tracing::warn!(%reason, "loggyto agent disabled");
            return Ok(None);
        }
    };

    let client = Client::new();
    let interceptor = Interceptor::new(&resolved, Arc::new(client.clone()), runtime);

    let subscriber = Registry::default()
        .with(interceptor.console_layer(stdout))
        .with(options.max_level);
    tracing::subscriber::set_global_default(subscriber)?;

    install_panic_hook(interceptor.clone());

    let fetch = interceptor.fetch(client);
    Ok(Some(Agent { interceptor, fetch }))
}

/// Equivalent to [`install`] with configuration and options read from the
/// environment. This is the recommended entrypoint for typical services.
pub fn init() -> Result<Option<Agent>, InstallError> {
    install(&AgentConfig::from_env(), InstallOptions::from_env())
}

#[derive(thiserror::Error, Debug)]
pub enum InstallError {
    #[error("agent is already installed in this process")]
    AlreadyInstalled,

    #[error("install must be called from within a Tokio runtime")]
    NoRuntime,

    #[error("failed to set global subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}
