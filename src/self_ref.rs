use reqwest::{Request, Url};

/// A candidate target to compare against the collection endpoint.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Text(&'a str),
    Url(&'a Url),
    None,
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(s: &'a str) -> Self {
        Target::Text(s)
    }
}

impl<'a> From<&'a String> for Target<'a> {
    fn from(s: &'a String) -> Self {
        Target::Text(s.as_str())
    }
}

impl<'a> From<&'a Url> for Target<'a> {
    fn from(url: &'a Url) -> Self {
        Target::Url(url)
    }
}

impl<'a> From<&'a Request> for Target<'a> {
    fn from(request: &'a Request) -> Self {
        Target::Url(request.url())
    }
}

impl<'a> From<Option<&'a str>> for Target<'a> {
    fn from(s: Option<&'a str>) -> Self {
        s.map_or(Target::None, Target::Text)
    }
}

/// Decides whether a target is the collection endpoint itself, so that the
/// agent never reports on its own traffic.
///
/// Only path components are compared. Anything that cannot be resolved to a
/// URL is treated as "not self".
#[derive(Debug, Clone)]
pub struct SelfReferenceFilter {
    endpoint_path: String,
    base: Url,
}

impl SelfReferenceFilter {
    /// `page_url` is the base for relative targets; without one, relative
    /// targets resolve against the endpoint.
    pub fn new(endpoint: &Url, page_url: Option<Url>) -> Self {
        SelfReferenceFilter {
            endpoint_path: endpoint.path().to_string(),
            base: page_url.unwrap_or_else(|| endpoint.clone()),
        }
    }

    pub fn endpoint_path(&self) -> &str {
        &self.endpoint_path
    }

    pub fn is_self<'a>(&self, target: impl Into<Target<'a>>) -> bool {
        match target.into() {
            Target::Url(url) => url.path() == self.endpoint_path,
            Target::Text(raw) => self
                .base
                .join(raw)
                .map(|url| url.path() == self.endpoint_path)
                .unwrap_or(false),
            Target::None => false,
        }
    }
}
