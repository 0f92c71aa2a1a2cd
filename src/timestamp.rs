//! Org planning timestamps.
//!
//! `SCHEDULED: <...>` and `CLOSED: [...]` markers carry a date, an
//! optional weekday display token, and an optional time of day. The
//! weekday text is locale display only: it is ignored on input and
//! produced through the [`WeekdayNames`] collaborator on output, so the
//! merge semantics never depend on it.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::error::{Error, Result};

/// Marker prefix for scheduled stamps (angle brackets).
pub const SCHEDULED_PREFIX: &str = "SCHEDULED: ";

/// Marker prefix for closed stamps (square brackets).
pub const CLOSED_PREFIX: &str = "CLOSED: ";

/// A point in time as org markup records it.
///
/// `has_time` distinguishes `<2015-12-09 Wed>` from
/// `<2015-12-09 Wed 20:40>`; a date-only stamp sits at midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrgStamp {
    pub when: NaiveDateTime,
    pub has_time: bool,
}

impl OrgStamp {
    /// Date-only stamp at midnight.
    pub fn date(date: NaiveDate) -> Self {
        Self {
            when: date.and_time(NaiveTime::MIN),
            has_time: false,
        }
    }

    /// Stamp with an explicit time of day.
    pub fn at(when: NaiveDateTime) -> Self {
        Self {
            when,
            has_time: true,
        }
    }

    /// The current local time, with time of day recorded.
    pub fn now() -> Self {
        let now = Local::now().naive_local();
        Self::at(now.with_nanosecond(0).unwrap_or(now))
    }

    /// Render the stamp body (`2015-12-09 Wed 20:40`) without brackets.
    pub fn body(&self, names: &dyn WeekdayNames) -> String {
        let mut out = format!(
            "{} {}",
            self.when.format("%Y-%m-%d"),
            names.abbrev(self.when.weekday())
        );
        if self.has_time {
            out.push_str(&format!(" {}", self.when.format("%H:%M")));
        }
        out
    }
}

/// Weekday display names. Locale lookup lives behind this seam; the
/// default is plain English abbreviations.
pub trait WeekdayNames {
    fn abbrev(&self, weekday: Weekday) -> String;
}

/// English three-letter weekday abbreviations.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishWeekdays;

impl WeekdayNames for EnglishWeekdays {
    fn abbrev(&self, weekday: Weekday) -> String {
        let name = match weekday {
            Weekday::Mon => "Mon",
            Weekday::Tue => "Tue",
            Weekday::Wed => "Wed",
            Weekday::Thu => "Thu",
            Weekday::Fri => "Fri",
            Weekday::Sat => "Sat",
            Weekday::Sun => "Sun",
        };
        name.to_string()
    }
}

/// Parse a stamp body: `YYYY-MM-DD[ Wd[ HH:MM[-HH:MM]]]`.
///
/// The second element is the end of a time range, when one is present.
pub fn parse_stamp_body(body: &str) -> Result<(OrgStamp, Option<OrgStamp>)> {
    let mut tokens = body.split_whitespace();
    let date_token = tokens
        .next()
        .ok_or_else(|| Error::InvalidStamp(body.to_string()))?;
    let date = NaiveDate::parse_from_str(date_token, "%Y-%m-%d")
        .map_err(|_| Error::InvalidStamp(body.to_string()))?;

    let mut start_time: Option<NaiveTime> = None;
    let mut end_time: Option<NaiveTime> = None;

    for token in tokens {
        if !token.contains(':') {
            // Weekday display token; carries no information.
            continue;
        }
        if start_time.is_some() {
            return Err(Error::InvalidStamp(body.to_string()));
        }
        match token.split_once('-') {
            Some((from, to)) => {
                start_time = Some(parse_hm(from, body)?);
                end_time = Some(parse_hm(to, body)?);
            }
            None => start_time = Some(parse_hm(token, body)?),
        }
    }

    let start = match start_time {
        Some(time) => OrgStamp::at(date.and_time(time)),
        None => OrgStamp::date(date),
    };
    let end = end_time.map(|time| OrgStamp::at(date.and_time(time)));
    Ok((start, end))
}

fn parse_hm(token: &str, body: &str) -> Result<NaiveTime> {
    let invalid = || Error::InvalidStamp(body.to_string());
    let (hours, minutes) = token.split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

/// Render `SCHEDULED: <...>`, including the end of a time range if both
/// ends carry a time of day.
pub fn format_scheduled(
    start: &OrgStamp,
    end: Option<&OrgStamp>,
    names: &dyn WeekdayNames,
) -> String {
    let mut body = start.body(names);
    if start.has_time {
        if let Some(end) = end.filter(|end| end.has_time) {
            body.push_str(&format!("-{}", end.when.format("%H:%M")));
        }
    }
    format!("{SCHEDULED_PREFIX}<{body}>")
}

/// Render `CLOSED: [...]`.
pub fn format_closed(stamp: &OrgStamp, names: &dyn WeekdayNames) -> String {
    format!("{CLOSED_PREFIX}[{}]", stamp.body(names))
}
