//! Request pacing for polite hiscore scraping.
//!
//! Wraps any [`HiscoreClient`] so that consecutive page requests are at
//! least `delay` apart. All requests target the same host, so a single
//! timestamp is tracked and requests are serialised behind it.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use wom_leaders_core::throttle::{ThrottleConfig, ThrottledHiscoreClient};
//! # use wom_leaders_core::{AppError, HiscoreClient, Metric, PlayerRankEntry};
//! # #[derive(Clone)] struct MyClient;
//! # impl HiscoreClient for MyClient {
//! #     async fn fetch_page(&self, _: Metric, _: u32)
//! #         -> Result<Vec<PlayerRankEntry>, AppError> { todo!() }
//! # }
//! let client = ThrottledHiscoreClient::new(MyClient, ThrottleConfig::new(Duration::from_secs(5)));
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::error::AppError;
use crate::metric::Metric;
use crate::models::PlayerRankEntry;
use crate::traits::HiscoreClient;

/// Configuration for the throttled client.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Minimum delay between consecutive hiscore requests.
    pub delay: Duration,
}

impl ThrottleConfig {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
        }
    }
}

/// A [`HiscoreClient`] wrapper that enforces a minimum gap between requests.
#[derive(Clone)]
pub struct ThrottledHiscoreClient<H> {
    inner: H,
    config: ThrottleConfig,
    /// Time the previous request was let through.
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl<H: HiscoreClient> ThrottledHiscoreClient<H> {
    pub fn new(inner: H, config: ThrottleConfig) -> Self {
        Self {
            inner,
            config,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait until `delay` has passed since the previous request, then
    /// record the current time. The lock is held while sleeping so
    /// concurrent callers queue up behind each other.
    async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.delay {
                let sleep_duration = self.config.delay - elapsed;
                tracing::debug!(
                    sleep_ms = %sleep_duration.as_millis(),
                    "Throttling hiscore request"
                );
                tokio::time::sleep(sleep_duration).await;
            }
        }

        *last = Some(Instant::now());
    }
}

impl<H: HiscoreClient> HiscoreClient for ThrottledHiscoreClient<H> {
    async fn fetch_page(
        &self,
        metric: Metric,
        page: u32,
    ) -> Result<Vec<PlayerRankEntry>, AppError> {
        self.wait_turn().await;
        self.inner.fetch_page(metric, page).await
    }
}
