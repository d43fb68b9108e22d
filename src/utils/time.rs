use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

/// The calendar day a record belongs to: the local calendar day of its start.
/// A record that runs past midnight stays whole under its start day, and DST
/// transitions follow whatever the local offset was at the start moment.
pub fn local_day(moment: DateTime<Utc>) -> NaiveDate {
    moment.with_timezone(&Local).date_naive()
}

/// Local midnight opening the given day. During a DST gap the earliest valid
/// wall-clock moment is used instead.
pub fn day_start(day: NaiveDate) -> DateTime<Local> {
    day.and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .expect("every day has a first valid moment")
}

/// Returns start of the next day.
pub fn next_day_start<Tz: TimeZone>(date: DateTime<Tz>) -> DateTime<Tz> {
    (date + Duration::days(1)).with_time(NaiveTime::MIN).unwrap()
}

/// Drops the sub-second part of a moment. Timestamps are stored with second
/// granularity, so start and end are truncated before any duration math.
pub fn whole_seconds(moment: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_opt(moment.timestamp(), 0).unwrap()
}
