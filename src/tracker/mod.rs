//! The start/stop state machine for the activity currently being timed.
//! [Tracker] is the only place that moves records between the open slot and
//! the day-partitioned set.

pub mod ticker;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;

use crate::{
    store::{
        document_store::DocumentStore,
        entities::{ActivityColor, ActivityRecord, OpenActivity},
        repository::ActivityRepository,
    },
    utils::clock::Clock,
};

use ticker::{ElapsedTick, TickerGuard};

/// What happened on a start request.
#[derive(Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started(OpenActivity),
    /// There already was an open record; it is returned untouched and keeps
    /// running.
    AlreadyTracking(OpenActivity),
}

/// Drives the `Idle` / `Tracking` state machine. State is derived from the
/// repository's open slot, so a fresh process rehydrates into the same state
/// the previous one left behind.
pub struct Tracker<S> {
    repository: ActivityRepository<S>,
    time_provider: Arc<dyn Clock>,
    tick_sink: Option<mpsc::Sender<ElapsedTick>>,
    ticker: Option<TickerGuard>,
}

impl<S: DocumentStore> Tracker<S> {
    pub fn new(repository: ActivityRepository<S>, time_provider: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            time_provider,
            tick_sink: None,
            ticker: None,
        }
    }

    /// Attaches a channel that will receive one [ElapsedTick] per second
    /// while tracking. Without a sink no ticker is ever spawned.
    pub fn with_tick_sink(mut self, sink: mpsc::Sender<ElapsedTick>) -> Self {
        self.tick_sink = Some(sink);
        self
    }

    pub fn repository(&self) -> &ActivityRepository<S> {
        &self.repository
    }

    /// Re-reads the open slot after a process start. If an activity was
    /// running, the elapsed ticker resumes from the original start moment.
    pub async fn rehydrate(&mut self) -> Result<Option<OpenActivity>> {
        let current = self.repository.current().await?;
        if let Some(open) = &current {
            self.spawn_ticker(open);
        }
        Ok(current)
    }

    /// `Idle -> Tracking`. Starting while already tracking is a no-op that
    /// leaves the open record exactly as it was.
    pub async fn start(
        &mut self,
        title: Option<String>,
        color: Option<ActivityColor>,
    ) -> Result<StartOutcome> {
        if let Some(open) = self.repository.current().await? {
            return Ok(StartOutcome::AlreadyTracking(open));
        }

        let open = OpenActivity::begin(title, color, self.time_provider.time());
        info!("Starting activity {} ({})", open.title, open.id);
        self.repository.set_current(Some(open.clone())).await?;
        self.spawn_ticker(&open);
        Ok(StartOutcome::Started(open))
    }

    /// Retitles the open record. Persisted immediately so a process restart
    /// recovers the in-progress title. Returns `None` when idle.
    pub async fn rename(&mut self, title: &str) -> Result<Option<OpenActivity>> {
        let Some(mut open) = self.repository.current().await? else {
            return Ok(None);
        };
        open.title = title.trim().to_string();
        self.repository.set_current(Some(open.clone())).await?;
        Ok(Some(open))
    }

    /// `Tracking -> Idle`: finalizes the open record into the day partition
    /// of its start. Returns `None` when idle.
    pub async fn stop(&mut self) -> Result<Option<ActivityRecord>> {
        let Some(open) = self.repository.current().await? else {
            return Ok(None);
        };

        // Cancel before touching state so no tick can reference a record
        // that's already been finalized.
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }

        let record = open.finalize(self.time_provider.time());
        info!(
            "Stopping activity {} ({}) after {}",
            record.title, record.id, record.duration
        );
        self.repository.upsert(record.clone()).await?;
        self.repository.set_current(None).await?;
        Ok(Some(record))
    }

    fn spawn_ticker(&mut self, open: &OpenActivity) {
        if let Some(sink) = &self.tick_sink {
            self.ticker = Some(TickerGuard::spawn(
                open.start,
                sink.clone(),
                self.time_provider.clone(),
            ));
        }
    }
}
