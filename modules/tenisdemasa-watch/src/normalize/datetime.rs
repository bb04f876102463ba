use std::sync::LazyLock;

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};

use super::diacritics::fold_diacritics;

static RE_NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})\b").unwrap());

static RE_TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{1,2}):(\d{2})\b").unwrap());

static RE_MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s+(ianuarie|februarie|martie|aprilie|mai|iunie|iulie|august|septembrie|octombrie|noiembrie|decembrie)\s+(\d{4})\b",
    )
    .unwrap()
});

static RE_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(astazi|azi|ieri)\s*,?\s*(\d{1,2}):(\d{2})\b").unwrap()
});

static RE_ABBREVIATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})[.\s]+(ian|feb|mar|apr|mai|iun|iul|aug|sep|oct|noi|nov|dec)[.\s]+(\d{4})\s*,?\s*(\d{1,2}):(\d{2})\b",
    )
    .unwrap()
});

/// A date and/or time pulled out of free text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Schedule {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

impl Schedule {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.time.is_none()
    }

    /// Date combined with the time (midnight when no time was found).
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        let date = self.date?;
        let time = self.time.or_else(|| NaiveTime::from_hms_opt(0, 0, 0))?;
        Some(date.and_time(time))
    }
}

/// One date/time pattern. [`DATE_RULES`] is the priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    /// `DD.MM.YYYY` (also `/` or `-`), with an `HH:MM` anywhere in the text.
    Numeric,
    /// `22 martie 2025`.
    MonthName,
    /// `Astăzi, 19:20` / `Ieri, 20:43`, resolved against the current date.
    Relative,
    /// `15.mar.2025, 00:03`.
    AbbreviatedMonth,
}

pub const DATE_RULES: [DateRule; 4] = [
    DateRule::Numeric,
    DateRule::MonthName,
    DateRule::Relative,
    DateRule::AbbreviatedMonth,
];

impl DateRule {
    pub fn apply(self, text: &str, today: NaiveDate) -> Option<Schedule> {
        match self {
            Self::Numeric => numeric(text),
            Self::MonthName => month_name(text),
            Self::Relative => relative(text, today),
            Self::AbbreviatedMonth => abbreviated(text),
        }
    }
}

/// Extract a date/time from `text`, trying [`DATE_RULES`] in order. Total:
/// unmatched text yields an empty schedule.
pub fn extract_schedule(text: &str, today: NaiveDate) -> Schedule {
    DATE_RULES
        .iter()
        .find_map(|rule| rule.apply(text, today))
        .unwrap_or_default()
}

/// Parse a forum timestamp (`Astăzi, 19:20`, `15.mar.2025, 00:03`, ...).
/// Only a match carrying a date counts.
pub fn parse_timestamp(text: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    extract_schedule(text.trim(), today).datetime()
}

fn num<T: std::str::FromStr>(caps: &Captures<'_>, i: usize) -> Option<T> {
    caps.get(i)?.as_str().parse().ok()
}

fn full_year(year: i32) -> i32 {
    if year < 100 {
        2000 + year
    } else {
        year
    }
}

fn first_time(text: &str) -> Option<NaiveTime> {
    RE_TIME.captures_iter(text).find_map(|caps| {
        NaiveTime::from_hms_opt(num(&caps, 1)?, num(&caps, 2)?, 0)
    })
}

fn numeric(text: &str) -> Option<Schedule> {
    RE_NUMERIC_DATE.captures_iter(text).find_map(|caps| {
        let date =
            NaiveDate::from_ymd_opt(full_year(num(&caps, 3)?), num(&caps, 2)?, num(&caps, 1)?)?;
        Some(Schedule {
            date: Some(date),
            time: first_time(text),
        })
    })
}

fn month_number(name: &str) -> Option<u32> {
    let n = match name.to_lowercase().as_str() {
        "ianuarie" | "ian" => 1,
        "februarie" | "feb" => 2,
        "martie" | "mar" => 3,
        "aprilie" | "apr" => 4,
        "mai" => 5,
        "iunie" | "iun" => 6,
        "iulie" | "iul" => 7,
        "august" | "aug" => 8,
        "septembrie" | "sep" => 9,
        "octombrie" | "oct" => 10,
        "noiembrie" | "noi" | "nov" => 11,
        "decembrie" | "dec" => 12,
        _ => return None,
    };
    Some(n)
}

fn month_name(text: &str) -> Option<Schedule> {
    RE_MONTH_NAME.captures_iter(text).find_map(|caps| {
        let month = month_number(caps.get(2)?.as_str())?;
        let date = NaiveDate::from_ymd_opt(num(&caps, 3)?, month, num(&caps, 1)?)?;
        Some(Schedule {
            date: Some(date),
            time: None,
        })
    })
}

fn relative(text: &str, today: NaiveDate) -> Option<Schedule> {
    let folded = fold_diacritics(text);
    let caps = RE_RELATIVE.captures(&folded)?;
    let date = match caps.get(1)?.as_str().to_lowercase().as_str() {
        "ieri" => today.checked_sub_days(Days::new(1))?,
        _ => today,
    };
    let time = NaiveTime::from_hms_opt(num(&caps, 2)?, num(&caps, 3)?, 0)?;
    Some(Schedule {
        date: Some(date),
        time: Some(time),
    })
}

fn abbreviated(text: &str) -> Option<Schedule> {
    RE_ABBREVIATED.captures_iter(text).find_map(|caps| {
        let month = month_number(caps.get(2)?.as_str())?;
        let date = NaiveDate::from_ymd_opt(num(&caps, 3)?, month, num(&caps, 1)?)?;
        let time = NaiveTime::from_hms_opt(num(&caps, 4)?, num(&caps, 5)?, 0)?;
        Some(Schedule {
            date: Some(date),
            time: Some(time),
        })
    })
}
