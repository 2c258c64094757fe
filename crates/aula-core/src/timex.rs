//! Timex expressions: date/time strings with a classifiable ambiguity type.
//!
//! The wire form is a restricted timex string:
//! - `2024-05-01`: a definite date
//! - `2024-05-01T09:00`: a definite date-time
//! - `2024-05-01TMO`: a date with a vague day-part (morning/afternoon/...)
//! - `XXXX-05-01`: a partial date with wildcard segments
//!
//! Only the first two count as definite; everything else makes the date
//! resolver sub-dialog ask again.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Vague day-part markers a timex time component may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPart {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "MO" => Some(Self::Morning),
            "AF" => Some(Self::Afternoon),
            "EV" => Some(Self::Evening),
            "NI" => Some(Self::Night),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
        }
    }
}

/// Structural classification of a timex string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimexKind {
    /// No expression at all.
    Empty,
    /// Present but not a timex we understand.
    Invalid,
    /// Fully specified date, no time component.
    Date(NaiveDate),
    /// Fully specified date and exact time.
    DateTime(NaiveDateTime),
    /// Date is known, time of day is only a vague day-part.
    DateWithVagueTime { date: NaiveDate, part: DayPart },
    /// One or more segments are wildcards (`XXXX-05-01`).
    PartialDate,
}

impl TimexKind {
    pub fn is_definite(&self) -> bool {
        matches!(self, Self::Date(_) | Self::DateTime(_))
    }
}

/// Classify a timex string by structure alone.
pub fn classify(timex: &str) -> TimexKind {
    let trimmed = timex.trim();
    if trimmed.is_empty() {
        return TimexKind::Empty;
    }

    let (date_part, time_part) = match trimmed.split_once('T') {
        Some((d, t)) => (d, Some(t)),
        None => (trimmed, None),
    };

    if date_part.contains('X') {
        return if looks_like_partial_date(date_part) {
            TimexKind::PartialDate
        } else {
            TimexKind::Invalid
        };
    }

    let date = match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(d) => d,
        Err(_) => return TimexKind::Invalid,
    };

    match time_part {
        None => TimexKind::Date(date),
        Some(t) => {
            if let Some(part) = DayPart::from_code(t) {
                return TimexKind::DateWithVagueTime { date, part };
            }
            parse_time(t)
                .map(|time| TimexKind::DateTime(date.and_time(time)))
                .unwrap_or(TimexKind::Invalid)
        }
    }
}

fn looks_like_partial_date(s: &str) -> bool {
    !s.is_empty()
        && s.split('-')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_digit() || c == 'X'))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// A free-text answer parsed from the user while resolving a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserDateInput {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Time only; must be merged with an already-known date.
    Time(NaiveTime),
}

/// Leniently parse a user's date/time answer. `reference` anchors relative
/// words like "today".
pub fn parse_user_input(text: &str, reference: NaiveDate) -> Option<UserDateInput> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.to_lowercase().as_str() {
        "today" => return Some(UserDateInput::Date(reference)),
        "tomorrow" => return reference.checked_add_days(Days::new(1)).map(UserDateInput::Date),
        _ => {}
    }

    for fmt in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%d/%m/%Y %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(UserDateInput::DateTime(dt));
        }
    }
    for fmt in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(UserDateInput::Date(d));
        }
    }
    parse_time(trimmed).map(UserDateInput::Time)
}

/// Render a timex as the wire string.
pub fn to_timex_string(input: &UserDateInput) -> Option<String> {
    match input {
        UserDateInput::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        UserDateInput::DateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M").to_string()),
        UserDateInput::Time(_) => None,
    }
}

/// Combine a time-only answer with a previously known date.
pub fn with_time(date: NaiveDate, time: NaiveTime) -> String {
    date.and_time(time).format("%Y-%m-%dT%H:%M").to_string()
}

/// Natural-language rendering for confirmation messages, relative to
/// `reference` (normally today).
pub fn to_natural_language(timex: &str, reference: NaiveDate) -> String {
    match classify(timex) {
        TimexKind::Date(d) => natural_day(d, reference),
        TimexKind::DateTime(dt) => format!(
            "{} at {}",
            natural_day(dt.date(), reference),
            dt.format("%H:%M")
        ),
        TimexKind::DateWithVagueTime { date, part } => {
            format!("{} in the {}", natural_day(date, reference), part.label())
        }
        _ => timex.to_string(),
    }
}

/// Render a single day relative to `reference`.
pub fn natural_day(date: NaiveDate, reference: NaiveDate) -> String {
    if date == reference {
        "today".to_string()
    } else if Some(date) == reference.checked_add_days(Days::new(1)) {
        "tomorrow".to_string()
    } else {
        date.format("%A, %-d %B %Y").to_string()
    }
}
