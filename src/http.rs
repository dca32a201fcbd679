use std::time::Duration;

use anyhow::Context as _;

/// Request deadline for identity and Firestore calls unless overridden.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 10;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Outbound client with a request deadline; the connect deadline never exceeds it.
pub fn client_with_timeout(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .build()
        .context("build http client")
}
