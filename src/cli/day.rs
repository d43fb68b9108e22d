use anyhow::Result;
use chrono::{Duration, Local, NaiveDate, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser};

use crate::{
    store::{
        document_store::DocumentStore,
        entities::ActivityRecord,
        repository::ActivityRepository,
        settings::{DateStyle, Settings},
    },
    utils::{
        format::{format_compact, format_time_of_day},
        time::day_start,
    },
};

use super::Args;

/// Width of a full hour bar in the timeline, in characters.
const BAR_WIDTH: usize = 40;

#[derive(Debug, Parser)]
pub struct DayCommand {
    #[arg(
        short,
        long = "day",
        help = "Day to show. Examples are \"today\", \"yesterday\", \"15/03/2025\""
    )]
    day: Option<String>,
}

/// Command to process the `day` command: one day's activities as a list plus
/// an hour-by-hour timeline of where the time went.
pub async fn process_day_command<S: DocumentStore>(
    repository: &ActivityRepository<S>,
    settings: Settings,
    DayCommand { day }: DayCommand,
) -> Result<()> {
    let day = parse_day(day, settings.date_style)?;
    let mut records = repository.get_by_date(day).await?;

    let total = records
        .iter()
        .fold(Duration::zero(), |total, v| total + v.duration);
    println!(
        "{} - {} activities, {} tracked",
        day.format("%a %Y-%m-%d"),
        records.len(),
        format_compact(total)
    );

    if records.is_empty() {
        return Ok(());
    }

    // Newest first, the way the original list reads.
    records.sort_by(|a, b| b.start.cmp(&a.start));
    println!();
    for record in &records {
        let start = format_time_of_day(record.start.with_timezone(&Local), settings.hour_format);
        let end = format_time_of_day(record.end.with_timezone(&Local), settings.hour_format);
        let title = match record.color {
            Some(color) => color.paint().paint(record.display_title()).to_string(),
            None => record.display_title().to_string(),
        };
        println!(
            "  {start} - {end}  {:>9}  {title}  ({})",
            format_compact(record.duration),
            record.id
        );
    }

    println!();
    for (hour, tracked) in hour_histogram(&records, day).iter().enumerate() {
        let bar = bar_for(*tracked);
        if tracked.is_zero() {
            println!("  {hour:02} |");
        } else {
            println!("  {hour:02} |{bar} {}", format_compact(*tracked));
        }
    }
    Ok(())
}

fn parse_day(input: Option<String>, date_style: DateStyle) -> Result<NaiveDate> {
    let Some(input) = input else {
        return Ok(Local::now().date_naive());
    };
    match parse_date_string(&input, Local::now(), date_style.into()) {
        Ok(v) => Ok(v.date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to parse day {input}: {e}"),
            )
            .into()),
    }
}

/// Sums, for each of the day's 24 hours, how much tracked time falls inside
/// it. Records are clamped to hour bounds, so one spanning several hours
/// contributes proportionally to each.
pub fn hour_histogram(records: &[ActivityRecord], day: NaiveDate) -> [Duration; 24] {
    let mut buckets = [Duration::zero(); 24];
    let midnight = day_start(day).with_timezone(&Utc);
    for (hour, bucket) in buckets.iter_mut().enumerate() {
        let from = midnight + Duration::hours(hour as i64);
        let to = from + Duration::hours(1);
        for record in records {
            *bucket += record.overlap_with(from, to);
        }
    }
    buckets
}

fn bar_for(tracked: Duration) -> String {
    let full = Duration::hours(1).num_seconds() as f64;
    let chars = (tracked.num_seconds() as f64 / full * BAR_WIDTH as f64).round() as usize;
    let chars = chars.clamp(usize::from(!tracked.is_zero()), BAR_WIDTH);
    "█".repeat(chars)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Local, TimeZone, Utc};

    use crate::store::entities::{ActivityColor, ActivityRecord};

    use super::{bar_for, hour_histogram, BAR_WIDTH};

    fn record(start: DateTime<Utc>, minutes: i64) -> ActivityRecord {
        ActivityRecord {
            id: "a".into(),
            title: "Work".into(),
            start,
            end: start + Duration::minutes(minutes),
            duration: Duration::minutes(minutes),
            color: Some(ActivityColor::Blue),
        }
    }

    #[test]
    fn test_hour_histogram_splits_across_hours() {
        let start = Local.with_ymd_and_hms(2024, 3, 15, 9, 15, 0).unwrap();
        let records = [record(start.with_timezone(&Utc), 90)];

        let buckets = hour_histogram(&records, start.date_naive());

        assert_eq!(buckets[9], Duration::minutes(45));
        assert_eq!(buckets[10], Duration::minutes(45));
        assert_eq!(buckets[8], Duration::zero());
        assert_eq!(buckets[11], Duration::zero());
    }

    #[test]
    fn test_hour_histogram_clips_past_midnight() {
        // Started at 23:30 and ran for an hour; only the half hour inside the
        // start day shows up.
        let start = Local.with_ymd_and_hms(2024, 3, 15, 23, 30, 0).unwrap();
        let records = [record(start.with_timezone(&Utc), 60)];

        let buckets = hour_histogram(&records, start.date_naive());

        assert_eq!(buckets[23], Duration::minutes(30));
        assert_eq!(
            buckets.iter().fold(Duration::zero(), |a, v| a + *v),
            Duration::minutes(30)
        );
    }

    #[test]
    fn test_bar_width_is_proportional() {
        assert_eq!(bar_for(Duration::zero()), "");
        assert_eq!(bar_for(Duration::minutes(60)).chars().count(), BAR_WIDTH);
        assert_eq!(
            bar_for(Duration::minutes(30)).chars().count(),
            BAR_WIDTH / 2
        );
        // Tiny but nonzero activity still paints one character.
        assert_eq!(bar_for(Duration::seconds(10)).chars().count(), 1);
    }
}
