use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    store::{
        document_store::DocumentStore,
        entities::{ActivityColor, ActivityRecord},
        repository::ActivityRepository,
    },
    utils::time::whole_seconds,
};

#[derive(Debug, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records actually added to the store. Entries whose id already existed
    /// are dropped, not overwritten.
    pub imported: usize,
    /// Entries that failed validation and were silently skipped.
    pub skipped: usize,
}

/// Merges an interchange file into the store.
///
/// The payload must be a JSON array. Entries missing a non-empty id or title,
/// or with unparseable or reversed timestamps, are dropped one by one; if
/// nothing survives the whole import fails and the stored data is left
/// untouched.
pub async fn import_file<S: DocumentStore>(
    repository: &ActivityRepository<S>,
    path: &Path,
) -> Result<ImportSummary> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Can't read import file {path:?}"))?;

    let (records, skipped) = parse_payload(&raw)?;
    let imported = repository.merge_imported(records).await?;
    Ok(ImportSummary { imported, skipped })
}

/// Validates the raw payload down to well-formed records. Fails before any
/// storage is touched.
pub fn parse_payload(raw: &str) -> Result<(Vec<ActivityRecord>, usize)> {
    let payload: Value =
        serde_json::from_str(raw).context("Import file is not valid JSON")?;

    let Value::Array(entries) = payload else {
        bail!("Invalid data format: expected an array of activities");
    };

    let total = entries.len();
    let records = entries
        .into_iter()
        .filter_map(|entry| {
            let record = validate_entry(&entry);
            if record.is_none() {
                warn!("Skipping invalid import entry {entry}");
            }
            record
        })
        .collect::<Vec<_>>();

    if records.is_empty() {
        bail!("No valid activities found in the imported file");
    }

    let skipped = total - records.len();
    debug!("Parsed import payload: {} valid, {skipped} skipped", records.len());
    Ok((records, skipped))
}

/// An entry is valid when it carries a non-empty id and title and timestamps
/// that parse into an interval with `start < end`. Everything else about the
/// entry is optional.
fn validate_entry(entry: &Value) -> Option<ActivityRecord> {
    let id = non_empty_string(entry.get("id")?)?;
    let title = non_empty_string(entry.get("title")?)?;
    let start = parse_timestamp(entry.get("start")?)?;
    let end = parse_timestamp(entry.get("end")?)?;
    if end <= start {
        return None;
    }

    // A duration computed by whoever exported the entry is kept as is;
    // it's only derived here when absent.
    let duration = entry
        .get("duration")
        .and_then(Value::as_i64)
        .filter(|v| *v > 0)
        .map(chrono::Duration::seconds)
        .unwrap_or(end - start);

    let color = entry
        .get("color")
        .and_then(|v| serde_json::from_value::<ActivityColor>(v.clone()).ok());

    Some(ActivityRecord {
        id,
        title,
        start,
        end,
        duration,
        color,
    })
}

fn non_empty_string(value: &Value) -> Option<String> {
    let s = value.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Accepts RFC 3339 strings and epoch milliseconds, the two forms the export
/// side and the original data ever used.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|v| whole_seconds(v.with_timezone(&Utc))),
        Value::Number(n) => {
            let millis = n.as_i64()?;
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(whole_seconds)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use crate::store::{
        document_store::{JsonDocumentStore, DOCUMENT_FILE},
        repository::ActivityRepository,
    };

    use super::{import_file, parse_payload, ImportSummary};

    const LUNCH: &str =
        r#"[{"id":"a", "title":"Lunch", "start":"2024-01-01T12:00:00Z", "end":"2024-01-01T12:30:00Z"}]"#;

    fn repository_in(dir: &std::path::Path) -> ActivityRepository<JsonDocumentStore> {
        ActivityRepository::new(JsonDocumentStore::new(dir).unwrap())
    }

    async fn import_str(
        repository: &ActivityRepository<JsonDocumentStore>,
        dir: &std::path::Path,
        payload: &str,
    ) -> Result<ImportSummary> {
        let path = dir.join("import.json");
        std::fs::write(&path, payload)?;
        import_file(repository, &path).await
    }

    #[tokio::test]
    async fn test_import_into_empty_store() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository_in(dir.path());

        let summary = import_str(&repository, dir.path(), LUNCH).await?;
        assert_eq!(
            summary,
            ImportSummary {
                imported: 1,
                skipped: 0
            }
        );

        let all = repository.get_all().await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "a");
        assert_eq!(all[0].title, "Lunch");
        assert_eq!(all[0].duration, chrono::Duration::seconds(1800));
        Ok(())
    }

    #[tokio::test]
    async fn test_reimport_does_not_duplicate() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository_in(dir.path());

        import_str(&repository, dir.path(), LUNCH).await?;
        let second = import_str(&repository, dir.path(), LUNCH).await?;

        assert_eq!(second.imported, 0);
        let all = repository.get_all().await?;
        assert_eq!(all.iter().filter(|v| v.id == "a").count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_record_wins_over_import() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository_in(dir.path());
        import_str(&repository, dir.path(), LUNCH).await?;

        let conflicting =
            r#"[{"id":"a", "title":"Dinner", "start":"2024-06-01T18:00:00Z", "end":"2024-06-01T19:00:00Z"}]"#;
        let summary = import_str(&repository, dir.path(), conflicting).await;

        // All entries collided, so nothing was imported, but the payload
        // itself was valid.
        assert_eq!(summary?.imported, 0);
        assert_eq!(repository.get_all().await?[0].title, "Lunch");
        Ok(())
    }

    #[tokio::test]
    async fn test_non_array_payload_fails_and_leaves_store_alone() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository_in(dir.path());
        import_str(&repository, dir.path(), LUNCH).await?;
        let before = std::fs::read(dir.path().join(DOCUMENT_FILE))?;

        let result = import_str(&repository, dir.path(), "\"not an array\"").await;

        assert!(result.is_err());
        assert_eq!(std::fs::read(dir.path().join(DOCUMENT_FILE))?, before);
        Ok(())
    }

    #[tokio::test]
    async fn test_all_invalid_entries_fail_the_import() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository_in(dir.path());

        let result = import_str(&repository, dir.path(), "[{}]").await;

        assert!(result.is_err());
        assert!(repository.get_all().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_entries_are_dropped_silently() -> Result<()> {
        let dir = tempdir()?;
        let repository = repository_in(dir.path());

        let mixed = r#"[
            {"id":"a", "title":"Lunch", "start":"2024-01-01T12:00:00Z", "end":"2024-01-01T12:30:00Z"},
            {"id":"", "title":"No id", "start":"2024-01-01T12:00:00Z", "end":"2024-01-01T12:30:00Z"},
            {"id":"b", "title":"Backwards", "start":"2024-01-01T13:00:00Z", "end":"2024-01-01T12:30:00Z"},
            {"id":"c", "title":"Bad date", "start":"sometime", "end":"2024-01-01T12:30:00Z"},
            42
        ]"#;
        let summary = import_str(&repository, dir.path(), mixed).await?;

        assert_eq!(
            summary,
            ImportSummary {
                imported: 1,
                skipped: 4
            }
        );
        Ok(())
    }

    #[test]
    fn test_epoch_millis_timestamps_are_accepted() {
        let payload = r#"[{"id":"a", "title":"Lunch", "start":1704110400000, "end":1704112200000}]"#;
        let (records, skipped) = parse_payload(payload).unwrap();

        assert_eq!(skipped, 0);
        assert_eq!(
            records[0].start,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(records[0].duration, chrono::Duration::minutes(30));
    }

    #[test]
    fn test_provided_duration_is_kept() {
        let payload = r#"[{"id":"a", "title":"Lunch", "start":"2024-01-01T12:00:00Z", "end":"2024-01-01T12:30:00Z", "duration": 1700}]"#;
        let (records, _) = parse_payload(payload).unwrap();
        assert_eq!(records[0].duration, chrono::Duration::seconds(1700));
    }
}
