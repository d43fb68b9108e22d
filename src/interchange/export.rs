use std::{fmt::Display, path::{Path, PathBuf}, str::FromStr};

use anyhow::{anyhow, Result};
use chrono::{Local, NaiveDate, SecondsFormat};
use serde::Serialize;
use tracing::info;

use crate::{
    store::{
        document_store::DocumentStore,
        entities::{ActivityColor, ActivityRecord},
        repository::ActivityRepository,
    },
    utils::{format::format_clock, time::local_day},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(anyhow!("Export format must be json or csv, got {s}")),
        }
    }
}

/// Flat entry written to JSON exports. Timestamps go out as RFC 3339 so the
/// file round-trips through import.
#[derive(Debug, Serialize)]
struct ExportedEntry {
    id: String,
    title: String,
    start: String,
    end: String,
    duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<ActivityColor>,
}

impl From<&ActivityRecord> for ExportedEntry {
    fn from(record: &ActivityRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            start: record.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end: record.end.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration: record.duration.num_seconds(),
            color: record.color,
        }
    }
}

pub fn to_json(records: &[ActivityRecord]) -> Result<String> {
    let entries = records.iter().map(ExportedEntry::from).collect::<Vec<_>>();
    Ok(serde_json::to_string_pretty(&entries)?)
}

/// One row per activity: the partition day, title, local wall-clock start and
/// end, and the duration as `HH:MM:SS`.
pub fn to_csv(records: &[ActivityRecord]) -> String {
    let mut out = String::from("Date,Activity,Start Time,End Time,Duration\n");

    for record in records {
        let row = [
            local_day(record.start).format("%Y-%m-%d").to_string(),
            csv_escape(record.display_title()),
            record
                .start
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            record
                .end
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            format_clock(record.duration),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `lapse-export-YYYYMMDD.json` / `.csv`, stamped with the given day.
pub fn export_file_name(format: ExportFormat, stamp: NaiveDate) -> String {
    format!("lapse-export-{}.{format}", stamp.format("%Y%m%d"))
}

/// Serializes the full activity set into one file under `out_dir` and
/// returns its path.
pub async fn write_export<S: DocumentStore>(
    repository: &ActivityRepository<S>,
    format: ExportFormat,
    out_dir: &Path,
    stamp: NaiveDate,
) -> Result<PathBuf> {
    let mut records = repository.get_all().await?;
    records.sort_by_key(|v| v.start);

    let contents = match format {
        ExportFormat::Json => to_json(&records)?,
        ExportFormat::Csv => to_csv(&records),
    };

    let path = out_dir.join(export_file_name(format, stamp));
    tokio::fs::write(&path, contents).await?;
    info!("Exported {} records to {:?}", records.len(), path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{
        interchange::import::parse_payload,
        store::{
            document_store::JsonDocumentStore,
            entities::{ActivityColor, ActivityRecord},
            repository::ActivityRepository,
        },
    };

    use super::{export_file_name, to_csv, to_json, write_export, ExportFormat};

    fn record(id: &str, title: &str, start: DateTime<Utc>, minutes: i64) -> ActivityRecord {
        ActivityRecord {
            id: id.to_string(),
            title: title.to_string(),
            start,
            end: start + Duration::minutes(minutes),
            duration: Duration::minutes(minutes),
            color: Some(ActivityColor::Amber),
        }
    }

    #[test]
    fn test_csv_shape_and_escaping() {
        let start = Local
            .with_ymd_and_hms(2024, 3, 15, 9, 15, 0)
            .unwrap()
            .with_timezone(&Utc);
        let rendered = to_csv(&[
            record("a", "Emails", start, 45),
            record("b", "Call \"sales\", then notes", start + Duration::hours(2), 125),
        ]);

        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "Date,Activity,Start Time,End Time,Duration");
        assert_eq!(
            lines[1],
            "2024-03-15,Emails,2024-03-15 09:15:00,2024-03-15 10:00:00,00:45:00"
        );
        assert_eq!(
            lines[2],
            "2024-03-15,\"Call \"\"sales\"\", then notes\",2024-03-15 11:15:00,2024-03-15 13:20:00,02:05:00"
        );
    }

    #[test]
    fn test_json_export_roundtrips_through_import() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 9, 15, 0).unwrap();
        let records = vec![
            record("a", "Emails", start, 45),
            record("b", "Review", start + Duration::hours(2), 30),
        ];

        let exported = to_json(&records).unwrap();
        let (imported, skipped) = parse_payload(&exported).unwrap();

        assert_eq!(skipped, 0);
        assert_eq!(imported, records);
    }

    #[test]
    fn test_export_file_name_is_date_stamped() {
        let stamp = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            export_file_name(ExportFormat::Json, stamp),
            "lapse-export-20240315.json"
        );
        assert_eq!(
            export_file_name(ExportFormat::Csv, stamp),
            "lapse-export-20240315.csv"
        );
    }

    #[tokio::test]
    async fn test_write_export_creates_the_file() -> Result<()> {
        let dir = tempdir()?;
        let repository = ActivityRepository::new(JsonDocumentStore::new(dir.path())?);
        repository
            .upsert(record(
                "a",
                "Emails",
                Utc.with_ymd_and_hms(2024, 3, 15, 9, 15, 0).unwrap(),
                45,
            ))
            .await?;

        let out = tempdir()?;
        let stamp = NaiveDate::from_ymd_opt(2024, 3, 16).unwrap();
        let path = write_export(&repository, ExportFormat::Csv, out.path(), stamp).await?;

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "lapse-export-20240316.csv"
        );
        assert!(std::fs::read_to_string(path)?.starts_with("Date,Activity"));
        Ok(())
    }
}
