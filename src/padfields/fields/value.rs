//! Computed values: resolved from collaborators, once per field.

use super::format::{self, DEFAULT_DATETIME_FORMAT};
use super::{parse_attr, text_attr, Memo};
use crate::codec::{Attributes, FieldSpec};
use crate::context::ExpansionContext;
use crate::engine::ResolveContext;
use crate::error::{FieldsError, Result};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardValue {
    pub(crate) memo: Memo,
}

impl ClipboardValue {
    pub(crate) fn from_spec(_spec: &FieldSpec, _context: &ExpansionContext) -> Result<Self> {
        Ok(Self::default())
    }

    pub(crate) fn resolve(&mut self, rc: &ResolveContext<'_>) -> Result<Option<String>> {
        self.memo
            .get_or_try_init(|| rc.context().clipboard().current_text())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeValue {
    pub format: String,
    pub(crate) memo: Memo,
}

impl DateTimeValue {
    pub(crate) const KEYS: &'static [&'static str] = &["format"];

    pub(crate) fn from_spec(spec: &FieldSpec, _context: &ExpansionContext) -> Result<Self> {
        let format = text_attr(spec, "format").unwrap_or_else(|| DEFAULT_DATETIME_FORMAT.to_string());
        if !format::is_valid_pattern(&format) {
            return Err(FieldsError::invalid_attribute(
                spec.type_id(),
                "format",
                format!("'{}' is not a strftime pattern", format),
            ));
        }
        Ok(Self {
            format,
            memo: Memo::default(),
        })
    }

    pub(crate) fn write(&self, attrs: &mut Attributes) {
        if self.format != DEFAULT_DATETIME_FORMAT {
            attrs.set("format", &self.format);
        }
    }

    pub(crate) fn resolve(&mut self, rc: &ResolveContext<'_>) -> Result<Option<String>> {
        let format = &self.format;
        self.memo
            .get_or_try_init(|| format::format_local(&rc.now(), format).map(Some))
    }
}

/// Which device fact a `device` placeholder shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceInfoKind {
    #[default]
    Platform,
    Os,
    Arch,
    Family,
    Hostname,
    Username,
    Locale,
    IpAddress,
}

impl DeviceInfoKind {
    pub const ALL: [DeviceInfoKind; 8] = [
        DeviceInfoKind::Platform,
        DeviceInfoKind::Os,
        DeviceInfoKind::Arch,
        DeviceInfoKind::Family,
        DeviceInfoKind::Hostname,
        DeviceInfoKind::Username,
        DeviceInfoKind::Locale,
        DeviceInfoKind::IpAddress,
    ];

    pub fn id(self) -> &'static str {
        match self {
            DeviceInfoKind::Platform => "platform",
            DeviceInfoKind::Os => "os",
            DeviceInfoKind::Arch => "arch",
            DeviceInfoKind::Family => "family",
            DeviceInfoKind::Hostname => "hostname",
            DeviceInfoKind::Username => "username",
            DeviceInfoKind::Locale => "locale",
            DeviceInfoKind::IpAddress => "ip_address",
        }
    }

    pub fn by_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfoValue {
    pub kind: DeviceInfoKind,
    pub(crate) memo: Memo,
}

impl DeviceInfoValue {
    pub(crate) const KEYS: &'static [&'static str] = &["kind"];

    pub(crate) fn from_spec(spec: &FieldSpec, _context: &ExpansionContext) -> Result<Self> {
        let kind = match spec.attr("kind") {
            None => DeviceInfoKind::default(),
            Some(id) => DeviceInfoKind::by_id(id).ok_or_else(|| {
                FieldsError::invalid_attribute(spec.type_id(), "kind", format!("unknown device info '{}'", id))
            })?,
        };
        Ok(Self {
            kind,
            memo: Memo::default(),
        })
    }

    pub(crate) fn write(&self, attrs: &mut Attributes) {
        attrs.set("kind", self.kind.id());
    }

    pub(crate) fn resolve(&mut self, rc: &ResolveContext<'_>) -> Result<Option<String>> {
        let kind = self.kind;
        self.memo
            .get_or_try_init(|| Ok(Some(rc.context().device().value_for(kind))))
    }
}

/// What a `random` placeholder generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandomKind {
    #[default]
    Digit,
    Latin,
    /// An integer in `[options[0], options[1]]`, 0..=100 by default.
    Number,
    Uuid,
    /// One of `options`.
    Custom,
}

impl RandomKind {
    pub const ALL: [RandomKind; 5] = [
        RandomKind::Digit,
        RandomKind::Latin,
        RandomKind::Number,
        RandomKind::Uuid,
        RandomKind::Custom,
    ];

    pub fn id(self) -> &'static str {
        match self {
            RandomKind::Digit => "digit",
            RandomKind::Latin => "latin",
            RandomKind::Number => "number",
            RandomKind::Uuid => "uuid",
            RandomKind::Custom => "custom",
        }
    }

    pub fn by_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// Inclusive bounds for [`RandomKind::Number`], low first.
    pub fn number_bounds(options: &[String]) -> (i64, i64) {
        let bound = |i: usize, default: i64| {
            options
                .get(i)
                .and_then(|s| s.trim().parse::<i64>().ok())
                .unwrap_or(default)
        };
        let (a, b) = (bound(0, 0), bound(1, 100));
        (a.min(b), a.max(b))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RandomValue {
    pub kind: RandomKind,
    pub options: Vec<String>,
    pub(crate) memo: Memo,
}

impl RandomValue {
    pub(crate) const KEYS: &'static [&'static str] = &["kind", "options"];

    pub(crate) fn from_spec(spec: &FieldSpec, _context: &ExpansionContext) -> Result<Self> {
        let kind = match spec.attr("kind") {
            None => RandomKind::default(),
            Some(id) => RandomKind::by_id(id).ok_or_else(|| {
                FieldsError::invalid_attribute(spec.type_id(), "kind", format!("unknown random kind '{}'", id))
            })?,
        };
        Ok(Self {
            kind,
            options: format::decode_list(spec.attr("options").unwrap_or_default()),
            memo: Memo::default(),
        })
    }

    pub(crate) fn write(&self, attrs: &mut Attributes) {
        attrs.set("kind", self.kind.id());
        if !self.options.is_empty() {
            attrs.set("options", format::encode_list(&self.options));
        }
    }

    pub(crate) fn resolve(&mut self, rc: &ResolveContext<'_>) -> Result<Option<String>> {
        let (kind, options) = (self.kind, &self.options);
        self.memo
            .get_or_try_init(|| Ok(Some(rc.context().random().generate(kind, options))))
    }
}

/// The text of another stored note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetValue {
    pub snippet_id: String,
    pub(crate) memo: Memo,
}

impl SnippetValue {
    pub(crate) const KEYS: &'static [&'static str] = &["ref"];

    pub(crate) fn from_spec(spec: &FieldSpec, _context: &ExpansionContext) -> Result<Self> {
        let snippet_id = parse_attr::<String>(spec, "ref")?
            .ok_or_else(|| FieldsError::invalid_attribute(spec.type_id(), "ref", "missing note id"))?;
        Ok(Self {
            snippet_id,
            memo: Memo::default(),
        })
    }

    pub(crate) fn write(&self, attrs: &mut Attributes) {
        attrs.set("ref", &self.snippet_id);
    }

    pub(crate) fn resolve(&mut self, rc: &ResolveContext<'_>) -> Result<Option<String>> {
        let id = &self.snippet_id;
        self.memo.get_or_try_init(|| expand_snippet(rc, id))
    }
}

/// Looks up note `id` and expands it one level deeper.
///
/// A missing note has no value. At the depth cap, or for notes that opt out of
/// expansion, the raw note text is returned.
pub(crate) fn expand_snippet(rc: &ResolveContext<'_>, id: &str) -> Result<Option<String>> {
    let Some(note) = rc.context().snippets().find_by_id(id)? else {
        debug!(snippet = id, "snippet note not found");
        return Ok(None);
    };
    if !note.expand_allowed {
        return Ok(Some(note.text));
    }
    if !rc.can_descend() {
        debug!(
            snippet = id,
            level = rc.config().level(),
            "recursion cap reached, inserting raw snippet text"
        );
        return Ok(Some(note.text));
    }
    Ok(Some(rc.expand_nested(&note.text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_one;

    fn ctx() -> ExpansionContext {
        ExpansionContext::default()
    }

    #[test]
    fn device_kind_must_be_known() {
        let spec = parse_one("{{device:kind=os}}").unwrap();
        assert_eq!(
            DeviceInfoValue::from_spec(&spec, &ctx()).unwrap().kind,
            DeviceInfoKind::Os
        );
        let bad = parse_one("{{device:kind=toaster}}").unwrap();
        assert!(DeviceInfoValue::from_spec(&bad, &ctx()).is_err());
    }

    #[test]
    fn random_options_are_a_list() {
        let spec = parse_one("{{random:kind=custom,options=heads;tails}}").unwrap();
        let value = RandomValue::from_spec(&spec, &ctx()).unwrap();
        assert_eq!(value.kind, RandomKind::Custom);
        assert_eq!(value.options, vec!["heads".to_string(), "tails".to_string()]);
    }

    #[test]
    fn number_bounds_are_ordered() {
        assert_eq!(RandomKind::number_bounds(&[]), (0, 100));
        assert_eq!(
            RandomKind::number_bounds(&["9".into(), "3".into()]),
            (3, 9)
        );
        assert_eq!(RandomKind::number_bounds(&["x".into()]), (0, 100));
    }

    #[test]
    fn datetime_rejects_bad_patterns() {
        let spec = parse_one("{{datetime:format=%25Q}}").unwrap();
        assert!(DateTimeValue::from_spec(&spec, &ctx()).is_err());
        let ok = parse_one("{{datetime}}").unwrap();
        assert_eq!(
            DateTimeValue::from_spec(&ok, &ctx()).unwrap().format,
            DEFAULT_DATETIME_FORMAT
        );
    }

    #[test]
    fn snippet_needs_a_reference() {
        let spec = parse_one("{{snippet}}").unwrap();
        assert!(SnippetValue::from_spec(&spec, &ctx()).is_err());
        let spec = parse_one("{{snippet:ref=abc}}").unwrap();
        assert_eq!(SnippetValue::from_spec(&spec, &ctx()).unwrap().snippet_id, "abc");
    }
}
