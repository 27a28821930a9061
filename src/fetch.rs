use async_trait::async_trait;
use reqwest::{Client, Request, RequestBuilder, Response};
use std::sync::Arc;

use crate::record::{labels, type_labels, Level, TYPE_FETCH};
use crate::self_ref::SelfReferenceFilter;
use crate::transmitter::{is_reporting, Transmitter};

/// The network primitive the agent both uses and intercepts.
///
/// `reqwest::Client` is the stock implementation; hosts route their own
/// HTTP calls through an [`InterceptedFetch`] to get failures reported.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: Request) -> reqwest::Result<Response>;
}

#[async_trait]
impl Fetch for Client {
    async fn fetch(&self, request: Request) -> reqwest::Result<Response> {
        self.execute(request).await
    }
}

#[async_trait]
impl<F: Fetch + ?Sized> Fetch for Arc<F> {
    async fn fetch(&self, request: Request) -> reqwest::Result<Response> {
        (**self).fetch(request).await
    }
}

/// A [`Fetch`] that reports failed calls of the wrapped original.
///
/// Responses and errors are handed back exactly as the original produced
/// them. Calls to the collection endpoint are passed through untouched and
/// never reported.
pub struct InterceptedFetch<F> {
    original: F,
    transmitter: Arc<Transmitter>,
    filter: Arc<SelfReferenceFilter>,
}

impl<F: Fetch> InterceptedFetch<F> {
    pub(crate) fn new(
        original: F,
        transmitter: Arc<Transmitter>,
        filter: Arc<SelfReferenceFilter>,
    ) -> Self {
        InterceptedFetch {
            original,
            transmitter,
            filter,
        }
    }

    /// The primitive captured at construction.
    pub fn original(&self) -> &F {
        &self.original
    }
}

impl InterceptedFetch<Client> {
    /// Build `builder` and run it through the interceptor.
    pub async fn send(&self, builder: RequestBuilder) -> reqwest::Result<Response> {
        let request = builder.build()?;
        self.fetch(request).await
    }

    /// The underlying client, for building requests.
    pub fn client(&self) -> &Client {
        &self.original
    }
}

#[async_trait]
impl<F: Fetch> Fetch for InterceptedFetch<F> {
    async fn fetch(&self, request: Request) -> reqwest::Result<Response> {
        if self.filter.is_self(&request) {
            return self.original.fetch(request).await;
        }

        match self.original.fetch(request).await {
            Ok(response) => {
                let status = response.status();
                if !(status.is_success() || status.is_redirection()) && !is_reporting() {
                    self.transmitter.send(
                        Level::Warn,
                        format!(
                            "Fetch to {} failed with status {}",
                            response.url(),
                            status.as_u16()
                        ),
                        labels(TYPE_FETCH, [("status", Some(status.as_u16().to_string()))]),
                    );
                }
                Ok(response)
            }
            Err(err) => {
                if !is_reporting() {
                    self.transmitter.send(
                        Level::Error,
                        format!("Fetch failed: {}", err),
                        type_labels(TYPE_FETCH),
                    );
                }
                Err(err)
            }
        }
    }
}
