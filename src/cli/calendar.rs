use std::collections::HashMap;

use anyhow::Result;
use chrono::{Datelike, Duration, Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser};
use now::DateTimeNow;

use crate::{
    store::{
        document_store::DocumentStore,
        repository::ActivityRepository,
        settings::{DateStyle, Settings},
    },
    utils::{
        format::format_compact,
        time::{day_start, local_day},
    },
};

use super::Args;

#[derive(Debug, Parser)]
pub struct CalendarCommand {
    #[arg(
        short,
        long,
        help = "Month to show. Examples are \"today\", \"last month\", \"15/03/2025\""
    )]
    month: Option<String>,
}

/// How much was tracked on a day, bucketed for the calendar cell marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DensityLevel {
    None,
    Low,
    Medium,
    High,
    Peak,
}

impl DensityLevel {
    pub fn from_tracked(total: Duration) -> Self {
        if total <= Duration::zero() {
            DensityLevel::None
        } else if total < Duration::hours(1) {
            DensityLevel::Low
        } else if total < Duration::hours(3) {
            DensityLevel::Medium
        } else if total < Duration::hours(6) {
            DensityLevel::High
        } else {
            DensityLevel::Peak
        }
    }

    pub fn mark(&self) -> char {
        match self {
            DensityLevel::None => '·',
            DensityLevel::Low => '░',
            DensityLevel::Medium => '▒',
            DensityLevel::High => '▓',
            DensityLevel::Peak => '█',
        }
    }
}

/// Command to process the `cal` command: a month grid where every day carries
/// a marker for how much was tracked on it.
pub async fn process_calendar_command<S: DocumentStore>(
    repository: &ActivityRepository<S>,
    settings: Settings,
    CalendarCommand { month }: CalendarCommand,
) -> Result<()> {
    let first = parse_month(month, settings.date_style)?;
    let last = day_start(first).end_of_month().date_naive();

    let totals = tracked_per_day(repository).await?;
    let month_total = day_range(first, last)
        .filter_map(|day| totals.get(&day))
        .fold(Duration::zero(), |total, v| total + *v);

    println!(
        "{} - {} tracked",
        first.format("%B %Y"),
        format_compact(month_total)
    );
    println!("  Mo Tu We Th Fr Sa Su");

    let mut line = String::from("  ");
    line.push_str(&"   ".repeat(first.weekday().num_days_from_monday() as usize));
    for day in day_range(first, last) {
        let level =
            DensityLevel::from_tracked(totals.get(&day).copied().unwrap_or_else(Duration::zero));
        line.push_str(&format!("{:2}{}", day.day(), level.mark()));
        if day.weekday().num_days_from_monday() == 6 {
            println!("{line}");
            line = String::from("  ");
        }
    }
    if line.trim().is_empty() {
        return Ok(());
    }
    println!("{line}");
    Ok(())
}

/// Total tracked duration per local day across the whole store.
async fn tracked_per_day<S: DocumentStore>(
    repository: &ActivityRepository<S>,
) -> Result<HashMap<NaiveDate, Duration>> {
    let mut totals = HashMap::<NaiveDate, Duration>::new();
    for record in repository.get_all().await? {
        *totals
            .entry(local_day(record.start))
            .or_insert_with(Duration::zero) += record.duration;
    }
    Ok(totals)
}

fn parse_month(input: Option<String>, date_style: DateStyle) -> Result<NaiveDate> {
    let moment = match input {
        None => Local::now(),
        Some(input) => match parse_date_string(&input, Local::now(), date_style.into()) {
            Ok(v) => v,
            Err(e) => {
                return Err(Args::command()
                    .error(
                        clap::error::ErrorKind::ValueValidation,
                        format!("Failed to parse month {input}: {e}"),
                    )
                    .into())
            }
        },
    };
    Ok(moment.beginning_of_month().date_naive())
}

fn day_range(first: NaiveDate, last: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(first), move |day| {
        let next = day.succ_opt().expect("End of time should never happen");
        (next <= last).then_some(next)
    })
}
