//! Fuzzy date/time extraction
//!
//! Scans free text for date and time fragments and ignores every other
//! word. A result is only returned when it lies strictly after the
//! reference time; a past result is indistinguishable from no result.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::{Captures, Regex};
use std::sync::LazyLock;

const DISPLAY_FORMAT: &str = "%A, %B %d, %Y at %I:%M %p";

const MONTH: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

const MONTH_PREFIXES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("ISO date pattern is valid")
});

/// The `T` between date and time in `2026-10-20T15:00` (already lower-cased)
static ISO_TIME_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4}-\d{1,2}-\d{1,2})t(\d)").expect("ISO separator pattern is valid")
});

static SLASH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b").expect("slash date pattern is valid")
});

static MONTH_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b{MONTH}\b\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("month-day pattern is valid")
});

static DAY_MONTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,2}})(st|nd|rd|th)?\s+(of\s+)?{MONTH}\b\.?(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("day-month pattern is valid")
});

/// "the 20th" on its own: a day of the current month
static ORDINAL_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?:st|nd|rd|th)\b").expect("ordinal day pattern is valid")
});

static RELATIVE_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(day after tomorrow|day before yesterday|tomorrow|today|tonight|yesterday)\b")
        .expect("relative day pattern is valid")
});

static OFFSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bin\s+(\d{1,3}|an?)\s+(minutes?|mins?|hours?|hrs?|days?|weeks?)\b")
        .expect("offset pattern is valid")
});

static WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(next|this|coming|last)\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tues?|wed|thurs?|thu|fri|sat|sun)\b",
    )
    .expect("weekday pattern is valid")
});

static TIME_12H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*([ap])\.?\s*m\b\.?").expect("12h time pattern is valid")
});

static TIME_24H: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").expect("24h time pattern is valid")
});

static NAMED_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(noon|midday|midnight)\b").expect("named time pattern is valid")
});

static AT_HOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bat\s+(\d{1,2})\b").expect("bare hour pattern is valid"));

/// Outcome of looking for one kind of fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fragment<T> {
    Missing,
    Valid(T),
    /// Recognised but not a real calendar value (e.g. February 30, 13pm)
    Invalid,
}

impl<T> Fragment<T> {
    fn from_option(value: Option<T>) -> Self {
        value.map_or(Fragment::Invalid, Fragment::Valid)
    }

    fn value_or(self, default: T) -> T {
        match self {
            Fragment::Valid(value) => value,
            Fragment::Missing | Fragment::Invalid => default,
        }
    }
}

/// Render a timestamp the way confirmation messages show it,
/// e.g. `Thursday, October 15, 2026 at 10:00 AM`.
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DISPLAY_FORMAT).to_string()
}

/// Extract a future date/time relative to the local wall clock.
pub fn extract_datetime(text: &str) -> Option<NaiveDateTime> {
    extract_datetime_at(text, Local::now().naive_local())
}

/// Extract a date/time strictly later than `now`.
///
/// Unparseable text and results at or before `now` both yield `None`.
pub fn extract_datetime_at(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let lower = text.to_lowercase();
    let text = ISO_TIME_SEPARATOR.replace_all(&lower, "$1 $2");
    let parsed = parse_fuzzy(&text, now)?;
    (parsed > now).then_some(parsed)
}

fn parse_fuzzy(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    if let Some(instant) = find_instant_offset(text, now) {
        return Some(instant);
    }

    let today = now.date();
    match (find_date(text, today), find_time(text)) {
        (Fragment::Invalid, _)
        | (_, Fragment::Invalid)
        | (Fragment::Missing, Fragment::Missing) => None,
        (date, time) => Some(NaiveDateTime::new(
            date.value_or(today),
            time.value_or(NaiveTime::MIN),
        )),
    }
}

/// "in 2 hours" / "in 30 minutes" name an exact instant and override any
/// other fragment.
fn find_instant_offset(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let caps = OFFSET.captures(text)?;
    let count = offset_count(&caps)?;
    let unit = caps.get(2)?.as_str();
    if unit.starts_with("min") {
        Some(now + Duration::minutes(count))
    } else if unit.starts_with('h') {
        Some(now + Duration::hours(count))
    } else {
        None
    }
}

fn offset_count(caps: &Captures<'_>) -> Option<i64> {
    match caps.get(1)?.as_str() {
        "a" | "an" => Some(1),
        digits => digits.parse().ok(),
    }
}

fn find_date(text: &str, today: NaiveDate) -> Fragment<NaiveDate> {
    if let Some(caps) = ISO_DATE.captures(text) {
        let year = caps.get(1).and_then(|y| y.as_str().parse::<i32>().ok());
        return Fragment::from_option(ymd(year, number(&caps, 2), number(&caps, 3)));
    }

    if let Some(caps) = SLASH_DATE.captures(text) {
        let year = match caps.get(3) {
            Some(y) if y.as_str().len() == 2 => y.as_str().parse::<i32>().ok().map(|y| 2000 + y),
            Some(y) => y.as_str().parse().ok(),
            None => Some(today.year()),
        };
        return Fragment::from_option(ymd(year, number(&caps, 1), number(&caps, 2)));
    }

    if let Some(caps) = MONTH_DAY.captures(text) {
        let month = caps.get(1).and_then(|m| month_number(m.as_str()));
        let year = year_or_current(&caps, 3, today);
        return Fragment::from_option(ymd(year, month, number(&caps, 2)));
    }

    if let Some(caps) = DAY_MONTH.captures(text) {
        let month_name = caps.get(4).map_or("", |m| m.as_str());
        // "at 3 may work": a bare number before "may" is not a date
        let bare_may = month_name == "may"
            && caps.get(2).is_none()
            && caps.get(3).is_none()
            && caps.get(5).is_none();
        if !bare_may {
            let year = year_or_current(&caps, 5, today);
            let month = month_number(month_name);
            return Fragment::from_option(ymd(year, month, number(&caps, 1)));
        }
    }

    if let Some(caps) = ORDINAL_DAY.captures(text) {
        let day = number(&caps, 1);
        return Fragment::from_option(ymd(Some(today.year()), Some(today.month()), day));
    }

    if let Some(caps) = RELATIVE_DAY.captures(text) {
        let days = match caps.get(1).map(|m| m.as_str()) {
            Some("day after tomorrow") => 2,
            Some("day before yesterday") => -2,
            Some("tomorrow") => 1,
            Some("yesterday") => -1,
            _ => 0,
        };
        return Fragment::Valid(today + Duration::days(days));
    }

    if let Some(caps) = OFFSET.captures(text) {
        let unit = caps.get(2).map_or("", |m| m.as_str());
        if let Some(count) = offset_count(&caps) {
            if unit.starts_with('d') {
                return Fragment::Valid(today + Duration::days(count));
            }
            if unit.starts_with('w') {
                return Fragment::Valid(today + Duration::weeks(count));
            }
        }
    }

    if let Some(caps) = WEEKDAY.captures(text) {
        if let Some(target) = caps.get(2).and_then(|m| weekday(m.as_str())) {
            let modifier = caps.get(1).map(|m| m.as_str());
            return Fragment::Valid(resolve_weekday(today, target, modifier));
        }
    }

    Fragment::Missing
}

fn find_time(text: &str) -> Fragment<NaiveTime> {
    if let Some(caps) = TIME_12H.captures(text) {
        let hour = number(&caps, 1).filter(|h| (1..=12).contains(h));
        let minute = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok());
        let pm = caps.get(3).is_some_and(|m| m.as_str() == "p");
        let time = hour
            .zip(minute)
            .and_then(|(h, m)| NaiveTime::from_hms_opt(h % 12 + if pm { 12 } else { 0 }, m, 0));
        return Fragment::from_option(time);
    }

    if let Some(caps) = TIME_24H.captures(text) {
        let time = number(&caps, 1)
            .zip(number(&caps, 2))
            .and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0));
        return Fragment::from_option(time);
    }

    if let Some(caps) = NAMED_TIME.captures(text) {
        let hour = if caps.get(1).is_some_and(|m| m.as_str() == "midnight") {
            0
        } else {
            12
        };
        return Fragment::from_option(NaiveTime::from_hms_opt(hour, 0, 0));
    }

    if let Some(caps) = AT_HOUR.captures(text) {
        let time = number(&caps, 1).and_then(|h| NaiveTime::from_hms_opt(h, 0, 0));
        return Fragment::from_option(time);
    }

    Fragment::Missing
}

/// Weekday arithmetic. A bare or "this" weekday may be today; "next" and
/// "coming" are always strictly ahead; "last" is always strictly behind.
fn resolve_weekday(today: NaiveDate, target: Weekday, modifier: Option<&str>) -> NaiveDate {
    let ahead = (target.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let offset = match modifier {
        Some("next" | "coming") if ahead == 0 => 7,
        Some("last") if ahead == 0 => -7,
        Some("last") => i64::from(ahead) - 7,
        _ => i64::from(ahead),
    };
    today + Duration::days(offset)
}

fn weekday(name: &str) -> Option<Weekday> {
    [
        ("mon", Weekday::Mon),
        ("tue", Weekday::Tue),
        ("wed", Weekday::Wed),
        ("thu", Weekday::Thu),
        ("fri", Weekday::Fri),
        ("sat", Weekday::Sat),
        ("sun", Weekday::Sun),
    ]
    .into_iter()
    .find(|(prefix, _)| name.starts_with(prefix))
    .map(|(_, day)| day)
}

fn month_number(name: &str) -> Option<u32> {
    MONTH_PREFIXES
        .iter()
        .zip(1u32..)
        .find(|(prefix, _)| name.starts_with(*prefix))
        .map(|(_, month)| month)
}

fn year_or_current(caps: &Captures<'_>, group: usize, today: NaiveDate) -> Option<i32> {
    match caps.get(group) {
        Some(y) => y.as_str().parse().ok(),
        None => Some(today.year()),
    }
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

fn ymd(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year?, month?, day?)
}
