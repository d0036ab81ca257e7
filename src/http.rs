//! Shared HTTP client construction for the collaborator clients

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};

pub const USER_AGENT: &str = concat!("MotoWeather/", env!("CARGO_PKG_VERSION"));

/// Build an HTTP client with a request timeout.
///
/// With `max_retries > 0` transient failures (connect errors, 5xx, 429) are
/// retried with exponential backoff; with zero the client never retries.
pub fn build_client(timeout_seconds: u32, max_retries: u32) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.into()))
        .user_agent(USER_AGENT)
        .build()
        .with_context(|| "Failed to create HTTP client")?;

    let builder = ClientBuilder::new(client);
    let client = if max_retries > 0 {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        builder
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    } else {
        builder.build()
    };

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_build() {
        assert!(build_client(15, 0).is_ok());
        assert!(build_client(15, 3).is_ok());
    }

    #[test]
    fn test_user_agent_carries_version() {
        assert!(USER_AGENT.starts_with("MotoWeather/"));
    }
}
