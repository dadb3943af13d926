//! Calendar export for extracted key dates.
//!
//! Only dates that parse as a real calendar date are exportable; the rest are hidden
//! from presentation layers. Links target the Google Calendar event template.

use crate::model::{AnalysisResult, KeyDate};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};

const CALENDAR_BASE: &str = "https://calendar.google.com/calendar/render?action=TEMPLATE";

/// Parse an ISO-8601 style date or date-time into its calendar date.
pub fn parse_date(raw: &str) -> Option<Date> {
    let raw = raw.trim();
    if let Ok(d) = Date::parse(raw, format_description!("[year]-[month]-[day]")) {
        return Some(d);
    }
    if let Ok(dt) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(dt.date());
    }
    PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    )
    .ok()
    .map(|dt| dt.date())
}

pub fn is_exportable(entry: &KeyDate) -> bool {
    parse_date(&entry.date).is_some()
}

/// Dates eligible for calendar export, in extraction order.
pub fn exportable_dates(analysis: &AnalysisResult) -> Vec<&KeyDate> {
    analysis.dates.iter().filter(|d| is_exportable(d)).collect()
}

fn compact(d: Date) -> String {
    format!("{:04}{:02}{:02}", d.year(), u8::from(d.month()), d.day())
}

/// Build an all-day event deep link for `entry`, or `None` if its date does not parse.
pub fn calendar_link(entry: &KeyDate) -> Option<String> {
    let start = parse_date(&entry.date)?;
    // All-day events use an exclusive end date.
    let end = start.next_day().unwrap_or(start);
    let title = format!("Contract Date: {}", entry.kind);
    let details = format!("Contract deadline for {}", entry.kind);

    Some(format!(
        "{CALENDAR_BASE}&text={}&dates={}/{}&details={}",
        urlencoding::encode(&title),
        compact(start),
        compact(end),
        urlencoding::encode(&details),
    ))
}
