use std::{sync::Arc, time::Duration};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::utils::clock::Clock;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Emitted once a second while an activity is being timed. Display only:
/// receiving a tick never causes a persistence write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedTick {
    pub elapsed: chrono::Duration,
}

/// Periodically reports how long the open activity has been running.
///
/// Elapsed time is always measured as `now - started_at` against the original
/// start moment, never accumulated, so a ticker resumed after a process
/// restart needs no drift correction.
pub struct ElapsedTicker {
    next: mpsc::Sender<ElapsedTick>,
    started_at: DateTime<Utc>,
    shutdown: CancellationToken,
    period: Duration,
    time_provider: Arc<dyn Clock>,
}

impl ElapsedTicker {
    pub fn new(
        next: mpsc::Sender<ElapsedTick>,
        started_at: DateTime<Utc>,
        shutdown: CancellationToken,
        period: Duration,
        time_provider: Arc<dyn Clock>,
    ) -> Self {
        Self {
            next,
            started_at,
            shutdown,
            period,
            time_provider,
        }
    }

    /// Executes the ticker event loop.
    pub async fn run(self) -> Result<()> {
        let mut tick_point = self.time_provider.instant();
        loop {
            tick_point += self.period;

            let elapsed = self.time_provider.time() - self.started_at;
            debug!("Reporting elapsed time {elapsed}");
            if self.next.send(ElapsedTick { elapsed }).await.is_err() {
                // The display side is gone, nothing left to report to.
                return Ok(());
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(tick_point) => ()
            }
        }
    }
}

/// Handle to a spawned ticker. The token is cancelled on drop as well, so a
/// dangling tick loop can't outlive the tracking state it reports on.
pub struct TickerGuard {
    token: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl TickerGuard {
    pub fn spawn(
        started_at: DateTime<Utc>,
        sink: mpsc::Sender<ElapsedTick>,
        time_provider: Arc<dyn Clock>,
    ) -> Self {
        let token = CancellationToken::new();
        let ticker = ElapsedTicker::new(
            sink,
            started_at,
            token.clone(),
            TICK_PERIOD,
            time_provider,
        );
        let task = tokio::spawn(async move {
            ticker.run().await.inspect_err(|e| {
                error!("Elapsed ticker stopped with an error {e:?}");
            })
        });
        Self { token, task }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TickerGuard {
    fn drop(&mut self) {
        self.token.cancel();
        self.task.abort();
    }
}
