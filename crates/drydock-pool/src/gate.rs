//! Tree health gate.
//!
//! Polls the external status endpoint before the pool mutates the shared
//! integration branch. Transient endpoint failures are retried with
//! exponential backoff; exhausting every attempt resolves to the
//! configured unreachable policy instead of propagating an error, so a
//! flaky health signal can never wedge the queue on its own.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use drydock_core::TreeStatus;

/// What an unreachable status endpoint resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreachablePolicy {
    /// Assume the tree is open.
    FailOpen,
    /// Assume the tree is closed.
    FailClosed,
}

/// Gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateConfig {
    /// Status endpoint returning `{"general_state": ...}` as JSON.
    pub status_url: String,

    /// Maximum fetch attempts before the unreachable policy applies.
    pub max_attempts: u32,

    /// Base delay for exponential backoff between attempts (milliseconds).
    pub backoff_base_ms: u64,

    /// Per-request deadline (milliseconds).
    pub request_timeout_ms: u64,

    /// Verdict when every attempt fails.
    pub on_unreachable: UnreachablePolicy,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            status_url: std::env::var("DRYDOCK_STATUS_URL").unwrap_or_else(|_| {
                "https://tree-status.stevedores.org/current?format=json".to_string()
            }),
            max_attempts: 5,
            backoff_base_ms: 1_000,
            request_timeout_ms: 10_000,
            on_unreachable: UnreachablePolicy::FailOpen,
        }
    }
}

impl GateConfig {
    /// Create a config from environment variables.
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Override the status endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.status_url = url.into();
        self
    }

    /// Resolve an unreachable endpoint to "closed" instead of "open".
    pub fn fail_closed(mut self) -> Self {
        self.on_unreachable = UnreachablePolicy::FailClosed;
        self
    }
}

/// Wire shape of the status resource.
#[derive(Debug, Deserialize)]
struct TreeStatusResponse {
    general_state: String,
}

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("status endpoint returned HTTP {0}")]
    BadStatus(u16),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Polls the tree status endpoint and answers go/no-go.
pub struct TreeGate {
    config: GateConfig,
    http: reqwest::Client,
}

impl TreeGate {
    /// Create a gate for the given configuration.
    pub fn new(config: GateConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(concat!("drydock/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, http }
    }

    /// Whether it is safe to mutate the tree right now.
    ///
    /// Issues up to `max_attempts` fetches. The first well-formed response
    /// is decoded and answers immediately, short-circuiting the remaining
    /// attempts; bad status codes and transport errors sleep
    /// `backoff_base_ms × 2^(attempt − 1)` and retry. When every attempt
    /// fails the verdict falls back to `on_unreachable`.
    pub async fn is_open(&self) -> bool {
        let mut status = None;
        let mut attempts_used = 0u32;

        for attempt in 1..=self.config.max_attempts {
            attempts_used = attempt;
            match self.fetch_status().await {
                Ok(s) => {
                    status = Some(s);
                    break;
                }
                Err(err) => {
                    debug!(attempt, error = %err, "tree status fetch failed");
                    if attempt < self.config.max_attempts {
                        tokio::time::sleep(backoff_delay(self.config.backoff_base_ms, attempt))
                            .await;
                    }
                }
            }
        }

        let Some(status) = status else {
            let open = self.config.on_unreachable == UnreachablePolicy::FailOpen;
            warn!(
                url = %self.config.status_url,
                attempts = attempts_used,
                assumed_open = open,
                "could not get a tree status, applying unreachable policy"
            );
            return open;
        };

        if attempts_used > 1 {
            warn!(
                url = %self.config.status_url,
                attempts = attempts_used,
                "tree status needed multiple attempts"
            );
        }

        debug!(state = %status, "tree status");
        status.is_go()
    }

    async fn fetch_status(&self) -> Result<TreeStatus, FetchError> {
        let response = self.http.get(&self.config.status_url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::BadStatus(response.status().as_u16()));
        }
        let body: TreeStatusResponse = response.json().await?;
        Ok(TreeStatus::from_state(&body.general_state))
    }
}

/// Sleep duration before retrying after attempt `attempt` (1-based).
fn backoff_delay(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms * 2u64.pow(attempt - 1))
}
