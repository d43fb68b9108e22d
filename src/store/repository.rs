use std::collections::HashSet;

use anyhow::Result;
use chrono::NaiveDate;
use tracing::debug;

use crate::utils::time::local_day;

use super::{
    document_store::DocumentStore,
    entities::{ActivityRecord, Document, OpenActivity, UNNAMED_TITLE},
};

/// Reads and writes activity records against a [DocumentStore].
///
/// The repository never keeps a live in-memory copy: every operation loads the
/// full document, applies its change and writes the merged result back, so a
/// write scoped to one day can't clobber records of other days that were never
/// loaded.
pub struct ActivityRepository<S> {
    store: S,
}

impl<S: DocumentStore> ActivityRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn load_or_default(&self) -> Result<Document> {
        Ok(self.store.load().await?.unwrap_or_default())
    }

    /// Records whose start falls on `day` in local time, in storage order.
    /// Callers sort.
    pub async fn get_by_date(&self, day: NaiveDate) -> Result<Vec<ActivityRecord>> {
        let document = self.load_or_default().await?;
        Ok(document
            .activities
            .into_iter()
            .filter(|record| local_day(record.start) == day)
            .collect())
    }

    pub async fn get_all(&self) -> Result<Vec<ActivityRecord>> {
        Ok(self.load_or_default().await?.activities)
    }

    /// Replaces the record with the same id in place, or appends it.
    pub async fn upsert(&self, record: ActivityRecord) -> Result<()> {
        let mut document = self.load_or_default().await?;
        match document.activities.iter_mut().find(|v| v.id == record.id) {
            Some(existing) => *existing = record,
            None => document.activities.push(record),
        }
        self.store.save(&document).await
    }

    /// Edits the title of a finished record, the only mutation allowed after
    /// finalize. Returns whether the id was found.
    pub async fn rename(&self, id: &str, title: &str) -> Result<bool> {
        let mut document = self.load_or_default().await?;
        let Some(record) = document.activities.iter_mut().find(|v| v.id == id) else {
            return Ok(false);
        };
        let title = title.trim();
        record.title = if title.is_empty() {
            UNNAMED_TITLE.to_string()
        } else {
            title.to_string()
        };
        self.store.save(&document).await?;
        Ok(true)
    }

    /// Removes the record permanently. Persists only when a removal actually
    /// happened, so a miss leaves the stored bytes untouched.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut document = self.load_or_default().await?;
        let before = document.activities.len();
        document.activities.retain(|v| v.id != id);
        if document.activities.len() == before {
            return Ok(false);
        }
        self.store.save(&document).await?;
        Ok(true)
    }

    /// Swaps out one day's records wholesale: everything stored under other
    /// days stays exactly as it was.
    pub async fn replace_day(&self, day: NaiveDate, records: Vec<ActivityRecord>) -> Result<()> {
        let mut document = self.load_or_default().await?;
        document
            .activities
            .retain(|record| local_day(record.start) != day);
        document.activities.extend(records);
        self.store.save(&document).await
    }

    /// Merges imported records into the full set, de-duplicated by id.
    /// Existing records win; duplicates are dropped, not overwritten. Returns
    /// how many records were actually added.
    pub async fn merge_imported(&self, records: Vec<ActivityRecord>) -> Result<usize> {
        let mut document = self.load_or_default().await?;
        let mut known = document
            .activities
            .iter()
            .map(|v| v.id.clone())
            .collect::<HashSet<_>>();

        let mut added = 0;
        for record in records {
            if known.insert(record.id.clone()) {
                document.activities.push(record);
                added += 1;
            }
        }

        debug!("Merging import added {added} records");
        if added > 0 {
            self.store.save(&document).await?;
        }
        Ok(added)
    }

    /// The single open-record slot, independent of the day-partitioned set.
    pub async fn current(&self) -> Result<Option<OpenActivity>> {
        Ok(self.load_or_default().await?.current)
    }

    pub async fn set_current(&self, current: Option<OpenActivity>) -> Result<()> {
        let mut document = self.load_or_default().await?;
        document.current = current;
        self.store.save(&document).await
    }

    /// Removes every stored activity and the open slot.
    pub async fn clear(&self) -> Result<()> {
        self.store.save(&Document::default()).await
    }
}
