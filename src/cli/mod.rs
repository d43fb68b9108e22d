pub mod calendar;
pub mod day;
pub mod watch;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use chrono::{Local, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::{
    interchange::{
        export::{write_export, ExportFormat},
        import::import_file,
    },
    store::{
        document_store::JsonDocumentStore,
        entities::{ActivityColor, OpenActivity, UNNAMED_TITLE},
        repository::ActivityRepository,
        settings::{DateStyle, HourFormat, Settings},
    },
    tracker::{StartOutcome, Tracker},
    utils::{
        clock::DefaultClock,
        dir::create_application_default_path,
        format::{format_clock, format_compact, format_time_of_day},
        logging::{enable_logging, CLI_PREFIX},
    },
};

use calendar::CalendarCommand;
use day::DayCommand;

#[derive(Parser, Debug)]
#[command(name = "Lapse", version)]
#[command(about = "Start/stop time tracker for your terminal", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start timing an activity")]
    Start {
        #[arg(help = "What you're about to do. Can be set or changed later with rename")]
        title: Option<String>,
        #[arg(long, help = "Color used when the activity is listed")]
        color: Option<ActivityColor>,
    },
    #[command(about = "Stop the running activity and file it under its start day")]
    Stop {},
    #[command(about = "Rename the running activity, or a finished one with --id")]
    Rename {
        title: String,
        #[arg(long, help = "Id of a finished activity to rename instead")]
        id: Option<String>,
    },
    #[command(about = "Show what's currently being tracked")]
    Status {
        #[arg(long, help = "Stay on screen and update the elapsed time every second")]
        watch: bool,
    },
    #[command(about = "List one day's activities with an hour-by-hour timeline")]
    Day {
        #[command(flatten)]
        command: DayCommand,
    },
    #[command(about = "Show a month at a glance with per-day tracking density")]
    Cal {
        #[command(flatten)]
        command: CalendarCommand,
    },
    #[command(about = "Delete a finished activity permanently")]
    Delete {
        #[arg(help = "Id of the activity, as printed by the day view")]
        id: String,
    },
    #[command(about = "Merge activities from a JSON export into the store")]
    Import {
        file: PathBuf,
    },
    #[command(about = "Write all activities to a date-stamped file")]
    Export {
        #[arg(long, default_value_t = ExportFormat::Json, help = "json or csv")]
        format: ExportFormat,
        #[arg(long, help = "Directory to write into. Defaults to the current one")]
        out: Option<PathBuf>,
    },
    #[command(about = "Show or change display preferences")]
    Config {
        #[arg(long, help = "Hour format used when printing times: 12 or 24")]
        hour_format: Option<HourFormat>,
        #[arg(long, help = "Date input style: uk (day/month) or us (month/day)")]
        date_style: Option<DateStyle>,
    },
    #[command(about = "Delete every stored activity and the open one")]
    Clear {
        #[arg(long, help = "Required. Clearing can't be undone")]
        yes: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let application_dir = match &args.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            dir.clone()
        }
        None => create_application_default_path()?,
    };

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &application_dir, logging_level, args.log)?;

    let settings = Settings::load_or_default(&application_dir);
    let repository = ActivityRepository::new(JsonDocumentStore::new(&application_dir)?);

    match args.commands {
        Commands::Start { title, color } => {
            let mut tracker = Tracker::new(repository, Arc::new(DefaultClock));
            match tracker.start(title, color).await? {
                StartOutcome::Started(open) => {
                    println!(
                        "Started {} at {}",
                        open_display(&open),
                        started_at(&open, settings)
                    );
                }
                StartOutcome::AlreadyTracking(open) => {
                    println!(
                        "Already tracking {} since {}. Stop it first.",
                        open_display(&open),
                        started_at(&open, settings)
                    );
                }
            }
            Ok(())
        }
        Commands::Stop {} => {
            let mut tracker = Tracker::new(repository, Arc::new(DefaultClock));
            match tracker.stop().await? {
                Some(record) => println!(
                    "Stopped {} after {}",
                    record.title,
                    format_compact(record.duration)
                ),
                None => println!("Nothing is being tracked"),
            }
            Ok(())
        }
        Commands::Rename { title, id } => {
            match id {
                Some(id) => {
                    if repository.rename(&id, &title).await? {
                        println!("Renamed {id} to {title}");
                    } else {
                        println!("No activity with id {id}");
                    }
                }
                None => {
                    let mut tracker = Tracker::new(repository, Arc::new(DefaultClock));
                    match tracker.rename(&title).await? {
                        Some(open) => println!("Now tracking {}", open_display(&open)),
                        None => {
                            println!("Nothing is being tracked. Use --id to rename a finished activity")
                        }
                    }
                }
            }
            Ok(())
        }
        Commands::Status { watch: true } => watch::process_watch_command(repository, settings).await,
        Commands::Status { watch: false } => {
            match repository.current().await? {
                Some(open) => println!(
                    "Tracking {} since {}, {} elapsed",
                    open_display(&open),
                    started_at(&open, settings),
                    format_clock(open.elapsed(Utc::now()))
                ),
                None => println!("Nothing is being tracked"),
            }
            Ok(())
        }
        Commands::Day { command } => day::process_day_command(&repository, settings, command).await,
        Commands::Cal { command } => {
            calendar::process_calendar_command(&repository, settings, command).await
        }
        Commands::Delete { id } => {
            if repository.delete(&id).await? {
                println!("Deleted {id}");
            } else {
                println!("No activity with id {id}");
            }
            Ok(())
        }
        Commands::Import { file } => {
            let summary = import_file(&repository, &file).await?;
            println!(
                "Imported {} activities ({} invalid entries skipped)",
                summary.imported, summary.skipped
            );
            Ok(())
        }
        Commands::Export { format, out } => {
            let out_dir = out.unwrap_or_else(|| PathBuf::from("."));
            let path =
                write_export(&repository, format, &out_dir, Local::now().date_naive()).await?;
            println!("Exported to {}", path.display());
            Ok(())
        }
        Commands::Config {
            hour_format,
            date_style,
        } => {
            let mut settings = settings;
            if hour_format.is_none() && date_style.is_none() {
                println!("hour format: {}", settings.hour_format);
                println!("date style:  {}", settings.date_style);
                return Ok(());
            }
            if let Some(hour_format) = hour_format {
                settings.hour_format = hour_format;
            }
            if let Some(date_style) = date_style {
                settings.date_style = date_style;
            }
            settings.save(&application_dir)?;
            println!(
                "Saved: hour format {}, date style {}",
                settings.hour_format, settings.date_style
            );
            Ok(())
        }
        Commands::Clear { yes } => {
            if !yes {
                return Err(Args::command()
                    .error(
                        clap::error::ErrorKind::MissingRequiredArgument,
                        "Pass --yes to confirm deleting every stored activity",
                    )
                    .into());
            }
            repository.clear().await?;
            println!("All activities removed");
            Ok(())
        }
    }
}

/// Title of an open record, painted in its color when it has one.
fn open_display(open: &OpenActivity) -> String {
    let title = if open.title.trim().is_empty() {
        UNNAMED_TITLE
    } else {
        &open.title
    };
    match open.color {
        Some(color) => color.paint().paint(title).to_string(),
        None => title.to_string(),
    }
}

fn started_at(open: &OpenActivity, settings: Settings) -> String {
    format_time_of_day(open.start.with_timezone(&Local), settings.hour_format)
}
