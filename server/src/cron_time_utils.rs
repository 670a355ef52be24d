use anyhow::{anyhow, Context};
use chrono::{DateTime, Days, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

/// Parses a wall-clock time written as `HH:MM`.
pub fn parse_send_time(send_time: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(send_time.trim(), "%H:%M")
        .with_context(|| format!("Invalid send time {send_time:?}, expected HH:MM"))
}

pub fn parse_timezone(timezone: &str) -> anyhow::Result<Tz> {
    timezone
        .trim()
        .parse::<Tz>()
        .map_err(|e| anyhow!("Invalid timezone {timezone:?}: {e}"))
}

/// Six-field cron expression (with seconds) firing once a day at `send_time`.
pub fn daily_cron_expression(send_time: &str) -> anyhow::Result<String> {
    let time = parse_send_time(send_time)?;
    Ok(format!("0 {} {} * * *", time.minute(), time.hour()))
}

/// First occurrence of `send_time` in `tz` strictly after `now`.
pub fn next_daily_run(send_time: NaiveTime, tz: Tz, now: DateTime<Utc>) -> Option<DateTime<Tz>> {
    let local_now = now.with_timezone(&tz);
    let today = local_now.date_naive();

    [today, today.checked_add_days(Days::new(1))?]
        .into_iter()
        .filter_map(|day| tz.from_local_datetime(&day.and_time(send_time)).earliest())
        .find(|candidate| *candidate > local_now)
}
