use chrono::{DateTime, Days, FixedOffset, NaiveDate, TimeZone};
use chrono_tz::Tz;

/// Parse a calendar date in YYYY-MM-DD format
pub fn parse_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").ok()
}

/// Midnight at the start of `date` in the given zone.
///
/// When midnight falls into a DST gap the date is anchored at midnight UTC
/// instead, which keeps the result on the same calendar day.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<FixedOffset> {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    tz.from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
        .fixed_offset()
}

/// Query window for an inclusive date range: from the first day's midnight
/// up to (excluding) the midnight after the last day.
pub fn query_window(
    start_date: NaiveDate,
    end_date: NaiveDate,
    tz: Tz,
) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    let time_min = local_midnight(start_date, tz);
    let day_after = end_date.checked_add_days(Days::new(1)).unwrap_or(end_date);
    let time_max = local_midnight(day_after, tz);
    (time_min, time_max)
}

/// Short day label such as "Jan 5"
pub fn day_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

/// Render a number of hours as "2h 30m"
pub fn format_hours(hours: f64) -> String {
    if !hours.is_finite() {
        return "-".to_string();
    }

    let total_minutes = (hours * 60.0).round() as i64;
    let sign = if total_minutes < 0 { "-" } else { "" };
    let total_minutes = total_minutes.abs();
    let (h, m) = (total_minutes / 60, total_minutes % 60);

    match (h, m) {
        (0, m) => format!("{}{}m", sign, m),
        (h, 0) => format!("{}{}h", sign, h),
        (h, m) => format!("{}{}h {}m", sign, h, m),
    }
}

/// Human readable span of an event for the timeline
pub fn format_span(start: &DateTime<FixedOffset>, end: &DateTime<FixedOffset>, all_day: bool) -> String {
    if all_day {
        let last_day = end
            .date_naive()
            .checked_sub_days(Days::new(1))
            .unwrap_or_else(|| end.date_naive());
        if last_day <= start.date_naive() {
            return format!("{} (all day)", start.format("%a %b %-d"));
        }
        return format!(
            "{} - {} (all day)",
            start.format("%a %b %-d"),
            last_day.format("%a %b %-d")
        );
    }

    if start.date_naive() == end.date_naive() {
        format!("{} - {}", start.format("%a %b %-d, %H:%M"), end.format("%H:%M"))
    } else {
        format!(
            "{} - {}",
            start.format("%a %b %-d, %H:%M"),
            end.format("%a %b %-d, %H:%M")
        )
    }
}
