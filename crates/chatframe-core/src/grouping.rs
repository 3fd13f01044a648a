//! Date grouping — where the renderer puts date separators, plus the
//! time/date labels it prints.

use chrono::{DateTime, Local, NaiveDate, TimeZone, Timelike, Utc};

use crate::types::Message;

/// One rendered row: either a date separator or the message at `index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedRow {
    Separator { date: NaiveDate, index: usize },
    Message { index: usize },
}

fn to_zone<Tz: TimeZone>(ts: i64, tz: &Tz) -> DateTime<Tz> {
    let utc = DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or(DateTime::UNIX_EPOCH);
    utc.with_timezone(tz)
}

/// Calendar date of a timestamp in `tz`.
pub fn calendar_date<Tz: TimeZone>(ts: i64, tz: &Tz) -> NaiveDate {
    to_zone(ts, tz).date_naive()
}

/// Insert a separator before the first message and before every message whose
/// calendar date (in `tz`) differs from the previous message's.
pub fn group_by_date_in<'a, Tz, I>(messages: I, tz: &Tz) -> Vec<FeedRow>
where
    Tz: TimeZone,
    I: IntoIterator<Item = &'a Message>,
{
    let mut rows = Vec::new();
    let mut previous: Option<NaiveDate> = None;
    for (index, msg) in messages.into_iter().enumerate() {
        let date = calendar_date(msg.ts, tz);
        if previous != Some(date) {
            rows.push(FeedRow::Separator { date, index });
        }
        rows.push(FeedRow::Message { index });
        previous = Some(date);
    }
    rows
}

/// `group_by_date_in` using the local time zone.
pub fn group_by_date<'a, I>(messages: I) -> Vec<FeedRow>
where
    I: IntoIterator<Item = &'a Message>,
{
    group_by_date_in(messages, &Local)
}

/// Twelve-hour clock label: `09:05 AM`, `12:00 PM`, `12:30 AM`.
pub fn time_label_in<Tz: TimeZone>(ts: i64, tz: &Tz) -> String {
    let t = to_zone(ts, tz);
    let (pm, hour) = t.hour12();
    format!("{:02}:{:02} {}", hour, t.minute(), if pm { "PM" } else { "AM" })
}

pub fn time_label(ts: i64) -> String {
    time_label_in(ts, &Local)
}

/// Separator label: `Tue Dec 15 2015`.
pub fn date_label(date: NaiveDate) -> String {
    date.format("%a %b %d %Y").to_string()
}
