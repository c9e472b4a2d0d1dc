//! Bare placeholders from before typed fields existed: `{{date}}`, `{{ time }}`,
//! `{{snippet: <id>}}` and friends.
//!
//! They all become one [`LegacyValue`] that delegates to a function picked when the
//! placeholder is read. The placeholder text itself is never rewritten.

use super::format;
use super::value::{expand_snippet, DeviceInfoKind, RandomKind};
use super::Memo;
use crate::engine::ResolveContext;
use crate::error::Result;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const SNIPPET_PREFIX: &str = "snippet:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyKind {
    Platform,
    IpAddress,
    Time,
    Date,
    DateTime,
    DayOfWeek,
    DayOfMonth,
    DayOfMonthZero,
    Year,
    YearShort,
    Hour24,
    Hour12,
    Minutes,
    Seconds,
    AmPm,
    TimeZone,
    Month,
    MonthNumber,
    MonthNumberZero,
    RandomDigit,
    RandomLatin,
    Snippet,
}

static LEGACY_IDS: Lazy<HashMap<&'static str, LegacyKind>> = Lazy::new(|| {
    use LegacyKind::*;
    [
        Platform,
        IpAddress,
        Time,
        Date,
        DateTime,
        DayOfWeek,
        DayOfMonth,
        DayOfMonthZero,
        Year,
        YearShort,
        Hour24,
        Hour12,
        Minutes,
        Seconds,
        AmPm,
        TimeZone,
        Month,
        MonthNumber,
        MonthNumberZero,
        RandomDigit,
        RandomLatin,
    ]
    .into_iter()
    .map(|kind| (kind.id(), kind))
    .collect()
});

impl LegacyKind {
    pub fn id(self) -> &'static str {
        match self {
            LegacyKind::Platform => "platform",
            LegacyKind::IpAddress => "ip_address",
            LegacyKind::Time => "time",
            LegacyKind::Date => "date",
            LegacyKind::DateTime => "date_time",
            LegacyKind::DayOfWeek => "day_of_week",
            LegacyKind::DayOfMonth => "day_of_month",
            LegacyKind::DayOfMonthZero => "day_of_month_zero",
            LegacyKind::Year => "year",
            LegacyKind::YearShort => "year_short",
            LegacyKind::Hour24 => "hour24",
            LegacyKind::Hour12 => "hour12",
            LegacyKind::Minutes => "minutes",
            LegacyKind::Seconds => "seconds",
            LegacyKind::AmPm => "am_pm",
            LegacyKind::TimeZone => "timezone",
            LegacyKind::Month => "month",
            LegacyKind::MonthNumber => "month_number",
            LegacyKind::MonthNumberZero => "month_number_zero",
            LegacyKind::RandomDigit => "random_digit",
            LegacyKind::RandomLatin => "random_latin",
            LegacyKind::Snippet => "snippet",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            LegacyKind::Platform => "Platform",
            LegacyKind::IpAddress => "IP address",
            LegacyKind::Time => "Time",
            LegacyKind::Date => "Date",
            LegacyKind::DateTime => "Date and time",
            LegacyKind::DayOfWeek => "Day of week",
            LegacyKind::DayOfMonth => "Day of month",
            LegacyKind::DayOfMonthZero => "Day of month (01)",
            LegacyKind::Year => "Year",
            LegacyKind::YearShort => "Year (yy)",
            LegacyKind::Hour24 => "Hour (24h)",
            LegacyKind::Hour12 => "Hour (12h)",
            LegacyKind::Minutes => "Minutes",
            LegacyKind::Seconds => "Seconds",
            LegacyKind::AmPm => "AM/PM",
            LegacyKind::TimeZone => "Time zone",
            LegacyKind::Month => "Month",
            LegacyKind::MonthNumber => "Month number",
            LegacyKind::MonthNumberZero => "Month number (01)",
            LegacyKind::RandomDigit => "Random digit",
            LegacyKind::RandomLatin => "Random letter",
            LegacyKind::Snippet => "Snippet",
        }
    }

    /// strftime pattern for the clock-based kinds.
    fn pattern(self) -> Option<&'static str> {
        Some(match self {
            LegacyKind::Time => "%H:%M",
            LegacyKind::Date => "%Y-%m-%d",
            LegacyKind::DateTime => "%Y-%m-%d %H:%M",
            LegacyKind::DayOfWeek => "%A",
            LegacyKind::DayOfMonth => "%-d",
            LegacyKind::DayOfMonthZero => "%d",
            LegacyKind::Year => "%Y",
            LegacyKind::YearShort => "%y",
            LegacyKind::Hour24 => "%-H",
            LegacyKind::Hour12 => "%-I",
            LegacyKind::Minutes => "%M",
            LegacyKind::Seconds => "%S",
            LegacyKind::AmPm => "%p",
            LegacyKind::TimeZone => "%:z",
            LegacyKind::Month => "%B",
            LegacyKind::MonthNumber => "%-m",
            LegacyKind::MonthNumberZero => "%m",
            _ => return None,
        })
    }
}

type Provider = Arc<dyn Fn(&ResolveContext<'_>) -> Result<Option<String>> + Send + Sync>;

fn provider<F>(f: F) -> Provider
where
    F: Fn(&ResolveContext<'_>) -> Result<Option<String>> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A legacy placeholder bound to the function that computes it.
#[derive(Clone)]
pub struct LegacyValue {
    kind: LegacyKind,
    argument: Option<String>,
    provider: Provider,
    memo: Memo,
}

impl fmt::Debug for LegacyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyValue")
            .field("kind", &self.kind)
            .field("argument", &self.argument)
            .field("memo", &self.memo)
            .finish_non_exhaustive()
    }
}

impl LegacyValue {
    /// Recognizes a legacy placeholder body, ignoring surrounding whitespace.
    pub fn lookup(body: &str) -> Option<Self> {
        let body = body.trim();
        if let Some(rest) = body.strip_prefix(SNIPPET_PREFIX) {
            let id = rest.trim();
            return (!id.is_empty()).then(|| Self::snippet(id));
        }
        LEGACY_IDS.get(body).map(|kind| Self::computed(*kind))
    }

    fn snippet(id: &str) -> Self {
        let snippet_id = id.to_string();
        Self {
            kind: LegacyKind::Snippet,
            argument: Some(id.to_string()),
            provider: provider(move |rc| expand_snippet(rc, &snippet_id)),
            memo: Memo::default(),
        }
    }

    fn computed(kind: LegacyKind) -> Self {
        let provider = match kind {
            LegacyKind::Platform => {
                provider(|rc| Ok(Some(rc.context().device().value_for(DeviceInfoKind::Platform))))
            }
            LegacyKind::IpAddress => {
                provider(|rc| Ok(Some(rc.context().device().value_for(DeviceInfoKind::IpAddress))))
            }
            LegacyKind::RandomDigit => {
                provider(|rc| Ok(Some(rc.context().random().generate(RandomKind::Digit, &[]))))
            }
            LegacyKind::RandomLatin => {
                provider(|rc| Ok(Some(rc.context().random().generate(RandomKind::Latin, &[]))))
            }
            other => {
                let pattern = other.pattern().unwrap_or(format::DEFAULT_DATETIME_FORMAT);
                provider(move |rc| format::format_local(&rc.now(), pattern).map(Some))
            }
        };
        Self {
            kind,
            argument: None,
            provider,
            memo: Memo::default(),
        }
    }

    pub fn kind(&self) -> LegacyKind {
        self.kind
    }

    /// The note id of a legacy snippet.
    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub(crate) fn resolve(&mut self, rc: &ResolveContext<'_>) -> Result<Option<String>> {
        let provider = &self.provider;
        self.memo.get_or_try_init(|| provider(rc))
    }

    pub(crate) fn has_value(&self) -> bool {
        self.memo.has_value()
    }

    pub(crate) fn clear(&mut self) {
        self.memo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_ids_with_whitespace() {
        assert_eq!(LegacyValue::lookup("date").unwrap().kind(), LegacyKind::Date);
        assert_eq!(LegacyValue::lookup(" time ").unwrap().kind(), LegacyKind::Time);
        assert!(LegacyValue::lookup("dates").is_none());
    }

    #[test]
    fn snippet_takes_an_id() {
        let value = LegacyValue::lookup("snippet: abc ").unwrap();
        assert_eq!(value.kind(), LegacyKind::Snippet);
        assert_eq!(value.argument(), Some("abc"));
        assert!(LegacyValue::lookup("snippet:").is_none());
        assert!(LegacyValue::lookup("snippet").is_none());
    }

    #[test]
    fn every_clock_kind_has_a_valid_pattern() {
        for kind in LEGACY_IDS.values() {
            if let Some(pattern) = kind.pattern() {
                assert!(format::is_valid_pattern(pattern), "{pattern}");
            }
        }
        assert_eq!(LEGACY_IDS.len(), 21);
    }
}
