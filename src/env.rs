/// Environment variable names used by this crate for configuring the agent
/// from a service's environment.
///
/// These are purely helpers; the interceptors themselves never read the
/// environment.

/// Collection endpoint URL, e.g. `https://collect.example.com/v1/logs`.
pub const LOGGYTO_ENDPOINT_ENV: &str = "LOGGYTO_ENDPOINT";

/// API key sent in the `x-api-key` header.
pub const LOGGYTO_API_KEY_ENV: &str = "LOGGYTO_API_KEY";

/// API secret sent in the `x-api-secret` header.
pub const LOGGYTO_API_SECRET_ENV: &str = "LOGGYTO_API_SECRET";

/// Optional base URL that relative request targets are resolved against.
pub const LOGGYTO_PAGE_URL_ENV: &str = "LOGGYTO_PAGE_URL";

/// Whether the original `fmt` output stays enabled (`true`/`false`).
pub const LOGGYTO_STDOUT_ENV: &str = "LOGGYTO_STDOUT";

/// Maximum level seen by the subscriber, e.g. `info` or `debug`.
pub const LOGGYTO_LOG_LEVEL_ENV: &str = "LOGGYTO_LOG_LEVEL";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable, treating unset and non-unicode values alike.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
