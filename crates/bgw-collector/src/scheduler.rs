//! Cycle scheduler
//!
//! Runs one cycle immediately, then one per interval, forever. Triggers are
//! delivered through a [`Ticker`] whose channel holds at most one pending
//! tick, so a slow cycle is followed by a single catch-up cycle rather than a
//! burst.

use bgw_common::Result;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::pipeline::{Cycle, CycleReport};

/// Fixed-period trigger source with a capacity-one queue
pub struct Ticker {
    rx: mpsc::Receiver<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Start ticking; the first tick arrives one `period` from now.
    pub fn start(period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                match tx.try_send(()) {
                    Ok(()) => {},
                    Err(TrySendError::Full(())) => {
                        debug!("Previous trigger still pending, dropping tick");
                    },
                    Err(TrySendError::Closed(())) => break,
                }
            }
        });

        Self { rx, handle }
    }

    /// Wait for the next trigger
    pub async fn tick(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drives a [`Cycle`] on a fixed interval
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the startup cycle only; its failure is returned to the caller.
    pub async fn run_once<C: Cycle>(&self, cycle: &C) -> Result<CycleReport> {
        info!("Running initial collection cycle");
        cycle.run_cycle().await
    }

    /// Run forever.
    ///
    /// Returns only if the startup cycle fails. Later failures are logged and
    /// the next trigger proceeds as usual.
    pub async fn run<C: Cycle>(&self, cycle: &C) -> Result<()> {
        self.run_once(cycle).await?;

        info!(interval_secs = self.interval.as_secs(), "Entering periodic collection");
        let mut ticker = Ticker::start(self.interval);

        while ticker.tick().await.is_some() {
            if let Err(e) = cycle.run_cycle().await {
                error!(error = %e, publish = e.is_publish(), "Failed to submit data");
            }
        }

        Ok(())
    }
}
