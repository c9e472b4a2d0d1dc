//! Value formatters, relative periods, date formatting and the list encoding used by
//! option-bearing attributes.

use crate::error::{FieldsError, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime};
use std::fmt::Write;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const DEFAULT_FORMATTER: &str = "comma";

const LIST_SEPARATOR: char = ';';
const PAIR_SEPARATOR: char = ':';
const LIST_ESCAPE: char = '\\';

/// Named ways of joining several selected values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormatter {
    Comma,
    Semicolon,
    Space,
    NewLine,
    Bullets,
    Numbered,
    Json,
}

impl ValueFormatter {
    pub const ALL: [ValueFormatter; 7] = [
        ValueFormatter::Comma,
        ValueFormatter::Semicolon,
        ValueFormatter::Space,
        ValueFormatter::NewLine,
        ValueFormatter::Bullets,
        ValueFormatter::Numbered,
        ValueFormatter::Json,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValueFormatter::Comma => "comma",
            ValueFormatter::Semicolon => "semicolon",
            ValueFormatter::Space => "space",
            ValueFormatter::NewLine => "new_line",
            ValueFormatter::Bullets => "bullets",
            ValueFormatter::Numbered => "numbered",
            ValueFormatter::Json => "json",
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn format(self, values: &[String]) -> String {
        match self {
            ValueFormatter::Comma => values.join(", "),
            ValueFormatter::Semicolon => values.join("; "),
            ValueFormatter::Space => values.join(" "),
            ValueFormatter::NewLine => values.join("\n"),
            ValueFormatter::Bullets => values
                .iter()
                .map(|v| format!("• {}", v))
                .collect::<Vec<_>>()
                .join("\n"),
            ValueFormatter::Numbered => values
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{}. {}", i + 1, v))
                .collect::<Vec<_>>()
                .join("\n"),
            ValueFormatter::Json => serde_json::to_string(values).unwrap_or_default(),
        }
    }
}

/// Joins `values` with the named formatter, or with `formatter` taken literally.
///
/// An empty selection has no value.
pub fn join_values(values: &[String], formatter: &str) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    Some(match ValueFormatter::by_name(formatter) {
        Some(named) => named.format(values),
        None => values.join(formatter),
    })
}

/// Dates relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePeriod {
    Today,
    Yesterday,
    Tomorrow,
}

impl TimePeriod {
    pub fn code(self) -> &'static str {
        match self {
            TimePeriod::Today => "today",
            TimePeriod::Yesterday => "yesterday",
            TimePeriod::Tomorrow => "tomorrow",
        }
    }

    pub fn by_code(code: &str) -> Option<Self> {
        match code.trim() {
            "today" => Some(TimePeriod::Today),
            "yesterday" => Some(TimePeriod::Yesterday),
            "tomorrow" => Some(TimePeriod::Tomorrow),
            _ => None,
        }
    }

    /// Midnight of the period's day, relative to `now`.
    pub fn start(self, now: DateTime<Local>) -> NaiveDateTime {
        let today = now.date_naive();
        let day = match self {
            TimePeriod::Today => today,
            TimePeriod::Yesterday => today - Duration::days(1),
            TimePeriod::Tomorrow => today + Duration::days(1),
        };
        day.and_time(chrono::NaiveTime::MIN)
    }
}

/// Parses `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD HH:MM`.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(chrono::NaiveTime::MIN));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// The canonical attribute form of a stored date.
pub fn write_date(date: &NaiveDateTime) -> String {
    if date.time() == chrono::NaiveTime::MIN {
        date.format("%Y-%m-%d").to_string()
    } else {
        date.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

fn strftime_items(pattern: &str) -> Result<Vec<Item<'_>>> {
    let items: Vec<Item> = StrftimeItems::new(pattern).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(FieldsError::InvalidFormat(pattern.to_string()));
    }
    Ok(items)
}

/// Formats a local timestamp. Invalid patterns are an error, never a panic.
pub fn format_local(value: &DateTime<Local>, pattern: &str) -> Result<String> {
    let items = strftime_items(pattern)?;
    let mut out = String::new();
    write!(out, "{}", value.format_with_items(items.into_iter()))
        .map_err(|_| FieldsError::InvalidFormat(pattern.to_string()))?;
    Ok(out)
}

/// Formats a date without a timezone. Timezone specifiers are rejected as invalid.
pub fn format_naive(value: &NaiveDateTime, pattern: &str) -> Result<String> {
    let items = strftime_items(pattern)?;
    let mut out = String::new();
    write!(out, "{}", value.format_with_items(items.into_iter()))
        .map_err(|_| FieldsError::InvalidFormat(pattern.to_string()))?;
    Ok(out)
}

/// Checks a strftime pattern without formatting anything.
pub fn is_valid_pattern(pattern: &str) -> bool {
    strftime_items(pattern).is_ok()
}

// --- List encoding ---

/// Joins items with `;`, escaping `;`, `:` and `\` with a backslash.
pub fn encode_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| escape_item(item.as_ref()))
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

pub fn decode_list(encoded: &str) -> Vec<String> {
    if encoded.is_empty() {
        return Vec::new();
    }
    split_unescaped(encoded, LIST_SEPARATOR)
        .into_iter()
        .map(unescape_item)
        .collect()
}

/// Splits a `title:value` pair on the first unescaped `:`. Without one the whole item is
/// the value.
pub fn decode_pair(raw: &str) -> (Option<String>, Option<String>) {
    let parts = split_unescaped(raw, PAIR_SEPARATOR);
    let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
    match parts.as_slice() {
        [value] => (None, non_empty(unescape_item(value))),
        [title, rest @ ..] => {
            let value = rest.join(&PAIR_SEPARATOR.to_string());
            (non_empty(unescape_item(title)), non_empty(unescape_item(&value)))
        }
        [] => (None, None),
    }
}

pub fn encode_pair(title: Option<&str>, value: Option<&str>) -> String {
    match (title, value) {
        (Some(title), Some(value)) => format!("{}:{}", escape_item(title), escape_item(value)),
        (Some(title), None) => format!("{}:", escape_item(title)),
        (None, Some(value)) => escape_item(value),
        (None, None) => String::new(),
    }
}

/// Decodes a `title:value;title:value` option list.
pub fn decode_pairs(encoded: &str) -> Vec<(Option<String>, Option<String>)> {
    if encoded.is_empty() {
        return Vec::new();
    }
    split_unescaped(encoded, LIST_SEPARATOR)
        .into_iter()
        .map(decode_pair)
        .filter(|(title, value)| title.is_some() || value.is_some())
        .collect()
}

pub fn encode_pairs<'a>(pairs: impl IntoIterator<Item = (Option<&'a str>, Option<&'a str>)>) -> String {
    pairs
        .into_iter()
        .map(|(title, value)| encode_pair(title, value))
        .collect::<Vec<_>>()
        .join(&LIST_SEPARATOR.to_string())
}

fn escape_item(item: &str) -> String {
    let mut out = String::with_capacity(item.len());
    for c in item.chars() {
        if matches!(c, LIST_SEPARATOR | PAIR_SEPARATOR | LIST_ESCAPE) {
            out.push(LIST_ESCAPE);
        }
        out.push(c);
    }
    out
}

fn unescape_item(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == LIST_ESCAPE {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

// Splits on `sep` outside escapes; pieces keep their escapes.
fn split_unescaped(raw: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in raw.char_indices() {
        if escaped {
            escaped = false;
        } else if c == LIST_ESCAPE {
            escaped = true;
        } else if c == sep {
            parts.push(&raw[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&raw[start..]);
    parts
}
