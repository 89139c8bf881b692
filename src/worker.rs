use log::{debug, info, warn};
use std::time::Duration;
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::Config;
use crate::detect::{AvailabilityState, Detector};
use crate::error::Result;
use crate::fetch::{Fetcher, PollResult};
use crate::notify::Notifier;
use crate::stopwatch::Stopwatch;
use crate::tracker::{NotificationEvent, StateTracker};

/// Polls one page, classifies it and notifies on every availability change.
pub struct Worker {
    fetcher: Fetcher,
    detector: Detector,
    tracker: StateTracker,
    notifier: Option<Notifier>,
    poll_interval: Duration,
}

impl Worker {
    /// # Errors
    ///
    /// Fails if the HTTP client or the page detector cannot be built.
    pub fn new(url: Url, config: &Config, notifier: Option<Notifier>) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(url, config.connect_timeout, config.read_timeout)?,
            detector: Detector::new()?,
            tracker: StateTracker::new(),
            notifier,
            poll_interval: config.poll_interval,
        })
    }

    pub fn last_status(&self) -> &AvailabilityState {
        self.tracker.last_status()
    }

    /// Polls until `token` is cancelled, then releases the HTTP client.
    ///
    /// A cancellation interrupts a pending request or the pause between
    /// polls, but a notification that has started is always finished.
    pub async fn run(mut self, token: CancellationToken) {
        info!("Watching {}", self.fetcher.url());
        info!(
            "Poll interval: {:.2} seconds",
            self.poll_interval.as_secs_f64()
        );
        if self.notifier.is_none() {
            warn!("No notification channel is enabled, changes will only be logged");
        }

        loop {
            // Check if we should shutdown before starting new cycle
            if token.is_cancelled() {
                info!("Shutdown requested, stopping watcher");
                break;
            }

            let mut stopwatch = Stopwatch::new(true);
            let result = select! {
                result = self.fetcher.fetch() => result,
                () = token.cancelled() => {
                    info!("Shutdown requested during request");
                    break;
                }
            };
            let elapsed = stopwatch.stop().unwrap_or_default();
            info!("Request took {:.2}s.", elapsed.as_secs_f64());

            self.handle(&result, elapsed).await;

            // Interruptible sleep
            select! {
                () = sleep(self.poll_interval) => {},
                () = token.cancelled() => {
                    info!("Shutdown requested during sleep");
                    break;
                }
            }
        }

        self.fetcher.close();
        info!("Watcher stopped gracefully");
    }

    /// One uninterruptible cycle: fetch, classify, notify.
    pub async fn poll_once(&mut self) -> Option<NotificationEvent> {
        let mut stopwatch = Stopwatch::new(true);
        let result = self.fetcher.fetch().await;
        let elapsed = stopwatch.stop().unwrap_or_default();
        self.handle(&result, elapsed).await
    }

    async fn handle(&mut self, result: &PollResult, elapsed: Duration) -> Option<NotificationEvent> {
        let state = self.detector.classify(result, elapsed);
        match &state {
            AvailabilityState::Available => debug!("{}: UP", self.fetcher.url()),
            AvailabilityState::Unavailable(reason) => {
                debug!("{}: DOWN ({reason})", self.fetcher.url());
            }
            AvailabilityState::Unknown => {}
        }

        let event = self.tracker.observe(state)?;
        match &event {
            NotificationEvent::Success => info!("{} is back online", self.fetcher.url()),
            NotificationEvent::Error(_) => warn!("{} went offline", self.fetcher.url()),
        }
        if let Some(notifier) = self.notifier.as_mut() {
            notifier.notify(&event).await;
        }
        Some(event)
    }
}
