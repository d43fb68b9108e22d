use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    store::{
        document_store::DocumentStore, repository::ActivityRepository, settings::Settings,
    },
    tracker::Tracker,
    utils::{
        clock::DefaultClock,
        format::{format_clock, format_time_of_day},
    },
};

use super::open_display;

/// Command to process `status --watch`: stays in the foreground repainting
/// the elapsed time once a second. Ctrl-C only leaves the view; the activity
/// keeps running and the next process picks it up from its original start.
pub async fn process_watch_command<S: DocumentStore>(
    repository: ActivityRepository<S>,
    settings: Settings,
) -> Result<()> {
    let (sender, receiver) = mpsc::channel(10);
    let mut tracker = Tracker::new(repository, Arc::new(DefaultClock)).with_tick_sink(sender);

    let Some(open) = tracker.rehydrate().await? else {
        println!("Nothing is being tracked");
        return Ok(());
    };
    println!(
        "Tracking {} since {}. Ctrl-C leaves it running.",
        open_display(&open),
        format_time_of_day(open.start.with_timezone(&Local), settings.hour_format)
    );

    let mut ticks = ReceiverStream::new(receiver);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(());
            }
            tick = ticks.next() => {
                match tick {
                    Some(tick) => {
                        print!("\r{}", format_clock(tick.elapsed));
                        std::io::stdout().flush()?;
                    }
                    None => return Ok(()),
                }
            }
        }
    }
}
