//! # Fields
//!
//! A [`Field`] is the materialized, stateful form of one placeholder. The set of
//! behaviors is closed: [`FieldKind`] has one variant per placeholder type and every
//! operation is an exhaustive `match`, so adding a type means the compiler walks you
//! through each operation that must learn about it.
//!
//! Variants fall into four groups:
//!
//! - user inputs ([`input`]): text, number, date, select, barcode, toggle
//! - computed values ([`value`]): clipboard, date/time, device info, random, snippet
//! - references ([`reference`]): mirror another field in the same text
//! - fallbacks: [`LegacyValue`] for old bare placeholders, and `Unknown`
//!
//! Computed values are memoized inside the field ([`Memo`]): a field resolved twice
//! during one render yields the same clipboard text or random token.
//!
//! All fields share [`FieldMeta`]: the optional `id` used to match session input, the
//! inline label, a `prefix`/`suffix` wrapped around non-empty values, and the advisory
//! `required` flag.

pub mod format;
mod input;
mod legacy;
mod reference;
mod value;

pub use input::{BarcodeField, DateField, NumberField, SelectField, SelectOption, TextField, ToggleField};
pub use legacy::{LegacyKind, LegacyValue};
pub use reference::{ReferenceBinding, ReferenceField};
pub use value::{
    ClipboardValue, DateTimeValue, DeviceInfoKind, DeviceInfoValue, RandomKind, RandomValue,
    SnippetValue,
};

use crate::codec::{Attributes, FieldSpec};
use crate::engine::ResolveContext;
use crate::error::{FieldsError, Result};
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// Built-in placeholder type ids.
pub mod type_ids {
    pub const TEXT: &str = "formtext";
    pub const NUMBER: &str = "formnumber";
    pub const DATE: &str = "formdate";
    pub const SELECT: &str = "formselect";
    pub const BARCODE: &str = "formbarcode";
    pub const TOGGLE: &str = "formtoggle";
    pub const REFERENCE: &str = "formref";
    pub const CLIPBOARD: &str = "clipboard";
    pub const DATETIME: &str = "datetime";
    pub const DEVICE: &str = "device";
    pub const RANDOM: &str = "random";
    pub const SNIPPET: &str = "snippet";
}

pub const UNKNOWN_LABEL: &str = "unknown";

const COMMON_KEYS: &[&str] = &["id", "prefix", "suffix", "required"];

/// Attributes every field type understands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMeta {
    pub id: Option<String>,
    pub label: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub required: bool,
    default_label: String,
    source: String,
    extra: Attributes,
}

impl FieldMeta {
    pub(crate) fn from_spec(spec: &FieldSpec, default_label: &str, kind_keys: &[&str]) -> Self {
        let extra = spec
            .attributes()
            .iter()
            .filter(|(key, _)| !COMMON_KEYS.contains(key) && !kind_keys.contains(key))
            .fold(Attributes::new(), |mut attrs, (key, value)| {
                attrs.set(key, value);
                attrs
            });
        Self {
            id: text_attr(spec, "id"),
            label: spec.label().map(str::to_string),
            prefix: spec.attr("prefix").filter(|s| !s.is_empty()).map(str::to_string),
            suffix: spec.attr("suffix").filter(|s| !s.is_empty()).map(str::to_string),
            required: spec.attr("required").and_then(parse_bool).unwrap_or(false),
            default_label: default_label.to_string(),
            source: spec.source().to_string(),
            extra,
        }
    }

    pub fn default_label(&self) -> &str {
        &self.default_label
    }

    /// Attributes this field's type does not know. Written back unchanged.
    pub fn extra(&self) -> &Attributes {
        &self.extra
    }
}

/// Cached result of a computed value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memo(Option<Option<String>>);

impl Memo {
    /// Returns the cached value, computing it on first use. Errors are not cached.
    pub fn get_or_try_init(
        &mut self,
        init: impl FnOnce() -> Result<Option<String>>,
    ) -> Result<Option<String>> {
        if let Some(value) = &self.0 {
            return Ok(value.clone());
        }
        let value = init()?;
        self.0 = Some(value.clone());
        Ok(value)
    }

    pub fn is_computed(&self) -> bool {
        self.0.is_some()
    }

    pub fn has_value(&self) -> bool {
        matches!(self.0, Some(Some(_)))
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Text(TextField),
    Number(NumberField),
    Date(DateField),
    Select(SelectField),
    Barcode(BarcodeField),
    Toggle(ToggleField),
    Reference(ReferenceField),
    Clipboard(ClipboardValue),
    DateTime(DateTimeValue),
    DeviceInfo(DeviceInfoValue),
    Random(RandomValue),
    Snippet(SnippetValue),
    Legacy(LegacyValue),
    Unknown,
}

impl FieldKind {
    /// Writes this variant's own attributes, in canonical order.
    pub fn write_attributes(&self, attrs: &mut Attributes) {
        match self {
            FieldKind::Text(f) => f.write(attrs),
            FieldKind::Number(f) => f.write(attrs),
            FieldKind::Date(f) => f.write(attrs),
            FieldKind::Select(f) => f.write(attrs),
            FieldKind::Barcode(f) => f.write(attrs),
            FieldKind::Toggle(f) => f.write(attrs),
            FieldKind::Reference(f) => f.write(attrs),
            FieldKind::Clipboard(_) => {}
            FieldKind::DateTime(f) => f.write(attrs),
            FieldKind::DeviceInfo(f) => f.write(attrs),
            FieldKind::Random(f) => f.write(attrs),
            FieldKind::Snippet(f) => f.write(attrs),
            FieldKind::Legacy(_) | FieldKind::Unknown => {}
        }
    }

    /// Every attribute key this variant reads.
    pub fn attribute_keys(&self) -> &'static [&'static str] {
        match self {
            FieldKind::Text(_) => TextField::KEYS,
            FieldKind::Number(_) => NumberField::KEYS,
            FieldKind::Date(_) => DateField::KEYS,
            FieldKind::Select(_) => SelectField::KEYS,
            FieldKind::Barcode(_) => BarcodeField::KEYS,
            FieldKind::Toggle(_) => ToggleField::KEYS,
            FieldKind::Reference(_) => ReferenceField::KEYS,
            FieldKind::Clipboard(_) => &[],
            FieldKind::DateTime(_) => DateTimeValue::KEYS,
            FieldKind::DeviceInfo(_) => DeviceInfoValue::KEYS,
            FieldKind::Random(_) => RandomValue::KEYS,
            FieldKind::Snippet(_) => SnippetValue::KEYS,
            FieldKind::Legacy(_) | FieldKind::Unknown => &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    type_id: String,
    meta: FieldMeta,
    kind: FieldKind,
    /// Set once user input lands on the field, even input that empties it.
    touched: bool,
}

impl Field {
    pub(crate) fn new(type_id: impl Into<String>, meta: FieldMeta, kind: FieldKind) -> Self {
        Self {
            type_id: type_id.into(),
            meta,
            kind,
            touched: false,
        }
    }

    /// The fallback for anything that is not a known type. Keeps the verbatim source.
    pub(crate) fn unknown(spec: &FieldSpec) -> Self {
        let mut meta = FieldMeta::from_spec(spec, "Unknown", &[]);
        meta.extra = Attributes::new();
        Self::new(spec.type_id(), meta, FieldKind::Unknown)
    }

    pub(crate) fn legacy(spec: &FieldSpec, value: LegacyValue) -> Self {
        let meta = FieldMeta {
            default_label: value.kind().title().to_string(),
            source: spec.source().to_string(),
            ..FieldMeta::default()
        };
        Self::new(value.kind().id(), meta, FieldKind::Legacy(value))
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn meta(&self) -> &FieldMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut FieldMeta {
        &mut self.meta
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut FieldKind {
        &mut self.kind
    }

    /// The placeholder text this field was parsed from.
    pub fn source(&self) -> &str {
        &self.meta.source
    }

    /// The key that matches this field against session fields: `id`, else the label.
    pub fn identity_key(&self) -> Option<&str> {
        self.meta.id.as_deref().or(self.meta.label.as_deref())
    }

    pub fn label(&self) -> String {
        match &self.kind {
            FieldKind::Reference(r) => r.label(self.meta.label.as_deref()),
            _ => self
                .meta
                .label
                .clone()
                .unwrap_or_else(|| self.meta.default_label.clone()),
        }
    }

    pub fn is_user_input(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Text(_)
                | FieldKind::Number(_)
                | FieldKind::Date(_)
                | FieldKind::Select(_)
                | FieldKind::Barcode(_)
                | FieldKind::Toggle(_)
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, FieldKind::Reference(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.kind, FieldKind::Unknown)
    }

    pub fn is_snippet(&self) -> bool {
        match &self.kind {
            FieldKind::Snippet(_) => true,
            FieldKind::Legacy(legacy) => legacy.kind() == LegacyKind::Snippet,
            _ => false,
        }
    }

    /// Whether the user entered something here, directly or through a session field.
    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn has_value(&self) -> bool {
        match &self.kind {
            FieldKind::Text(f) => f.has_value(),
            FieldKind::Number(f) => f.has_value(),
            FieldKind::Date(f) => f.has_value(),
            FieldKind::Select(f) => f.has_value(),
            FieldKind::Barcode(f) => f.has_value(),
            FieldKind::Toggle(f) => f.has_value(),
            FieldKind::Reference(f) => f.has_value(),
            FieldKind::Clipboard(f) => f.memo.has_value(),
            FieldKind::DateTime(f) => f.memo.has_value(),
            FieldKind::DeviceInfo(f) => f.memo.has_value(),
            FieldKind::Random(f) => f.memo.has_value(),
            FieldKind::Snippet(f) => f.memo.has_value(),
            FieldKind::Legacy(f) => f.has_value(),
            FieldKind::Unknown => false,
        }
    }

    /// Drops user input or cached values. Computed values recompute on next resolve.
    pub fn clear(&mut self) {
        match &mut self.kind {
            FieldKind::Text(f) => f.clear(),
            FieldKind::Number(f) => f.clear(),
            FieldKind::Date(f) => f.clear(),
            FieldKind::Select(f) => f.clear(),
            FieldKind::Barcode(f) => f.clear(),
            FieldKind::Toggle(f) => f.clear(),
            FieldKind::Reference(f) => f.clear(),
            FieldKind::Clipboard(f) => f.memo.clear(),
            FieldKind::DateTime(f) => f.memo.clear(),
            FieldKind::DeviceInfo(f) => f.memo.clear(),
            FieldKind::Random(f) => f.memo.clear(),
            FieldKind::Snippet(f) => f.memo.clear(),
            FieldKind::Legacy(f) => f.clear(),
            FieldKind::Unknown => {}
        }
    }

    /// Copies the user-entered state of `other` into this field.
    ///
    /// Fields of different variants are left untouched.
    pub fn apply_from(&mut self, other: &Field) {
        match (&mut self.kind, &other.kind) {
            (FieldKind::Text(f), FieldKind::Text(o)) => f.apply_from(o),
            (FieldKind::Number(f), FieldKind::Number(o)) => f.apply_from(o),
            (FieldKind::Date(f), FieldKind::Date(o)) => f.apply_from(o),
            (FieldKind::Select(f), FieldKind::Select(o)) => f.apply_from(o),
            (FieldKind::Barcode(f), FieldKind::Barcode(o)) => f.apply_from(o),
            (FieldKind::Toggle(f), FieldKind::Toggle(o)) => f.apply_from(o),
            _ => return,
        }
        self.touched |= other.touched;
    }

    /// Parses raw user input into this field's typed state.
    pub fn set_input(&mut self, raw: &str) -> Result<()> {
        let result = match &mut self.kind {
            FieldKind::Text(f) => f.set_input(raw),
            FieldKind::Number(f) => f.set_input(raw),
            FieldKind::Date(f) => f.set_input(raw),
            FieldKind::Select(f) => f.set_input(raw),
            FieldKind::Barcode(f) => f.set_input(raw),
            FieldKind::Toggle(f) => f.set_input(raw),
            _ => Err(FieldsError::InvalidInput(format!(
                "{} does not take user input",
                self.type_id
            ))),
        };
        if result.is_ok() {
            self.touched = true;
        }
        result
    }

    /// Resolves the field to its text value.
    ///
    /// Never fails: an error while resolving is logged and treated as no value.
    pub fn resolve(&mut self, rc: &ResolveContext<'_>) -> Option<String> {
        match self.try_resolve(rc) {
            Ok(value) => value.map(|v| self.decorate(v)),
            Err(err) => {
                warn!(type_id = %self.type_id, error = %err, "field failed to resolve");
                None
            }
        }
    }

    fn try_resolve(&mut self, rc: &ResolveContext<'_>) -> Result<Option<String>> {
        match &mut self.kind {
            FieldKind::Text(f) => Ok(f.resolve()),
            FieldKind::Number(f) => Ok(f.resolve()),
            FieldKind::Date(f) => f.resolve(rc),
            FieldKind::Select(f) => Ok(f.resolve()),
            FieldKind::Barcode(f) => Ok(f.resolve()),
            FieldKind::Toggle(f) => Ok(f.resolve()),
            FieldKind::Reference(f) => Ok(f.resolve()),
            FieldKind::Clipboard(f) => f.resolve(rc),
            FieldKind::DateTime(f) => f.resolve(rc),
            FieldKind::DeviceInfo(f) => f.resolve(rc),
            FieldKind::Random(f) => f.resolve(rc),
            FieldKind::Snippet(f) => f.resolve(rc),
            FieldKind::Legacy(f) => f.resolve(rc),
            FieldKind::Unknown => Ok(None),
        }
    }

    fn decorate(&self, value: String) -> String {
        if value.is_empty() {
            return value;
        }
        let prefix = self.meta.prefix.as_deref().unwrap_or_default();
        let suffix = self.meta.suffix.as_deref().unwrap_or_default();
        format!("{}{}{}", prefix, value, suffix)
    }
}

// --- Attribute parsing shared by the variants ---

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// A non-empty attribute value.
pub(crate) fn text_attr(spec: &FieldSpec, key: &str) -> Option<String> {
    spec.attr(key)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub(crate) fn parse_attr<T>(spec: &FieldSpec, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match spec.attr(key).map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: T::Err| FieldsError::invalid_attribute(spec.type_id(), key, e.to_string())),
    }
}

pub(crate) fn flag_attr(spec: &FieldSpec, key: &str) -> Result<bool> {
    match spec.attr(key) {
        None => Ok(false),
        Some(raw) => parse_bool(raw).ok_or_else(|| {
            FieldsError::invalid_attribute(spec.type_id(), key, format!("'{}' is not a boolean", raw))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_one;

    fn text_field(source: &str) -> Field {
        let spec = parse_one(source).unwrap();
        let kind = FieldKind::Text(TextField::default());
        let meta = FieldMeta::from_spec(&spec, "Text", TextField::KEYS);
        Field::new(spec.type_id(), meta, kind)
    }

    #[test]
    fn memo_computes_once() {
        let mut memo = Memo::default();
        let mut calls = 0;
        for _ in 0..3 {
            let value = memo
                .get_or_try_init(|| {
                    calls += 1;
                    Ok(Some("x".into()))
                })
                .unwrap();
            assert_eq!(value.as_deref(), Some("x"));
        }
        assert_eq!(calls, 1);
        memo.clear();
        assert!(!memo.is_computed());
    }

    #[test]
    fn memo_does_not_cache_errors() {
        let mut memo = Memo::default();
        assert!(memo
            .get_or_try_init(|| Err(FieldsError::Clipboard("busy".into())))
            .is_err());
        assert!(!memo.is_computed());
    }

    #[test]
    fn meta_reads_common_attributes() {
        let field = text_field("{{formtext|Name:id=n,prefix=<,suffix=>,required=true,color=red}}");
        let meta = field.meta();
        assert_eq!(meta.id.as_deref(), Some("n"));
        assert_eq!(meta.label.as_deref(), Some("Name"));
        assert_eq!(meta.prefix.as_deref(), Some("<"));
        assert_eq!(meta.suffix.as_deref(), Some(">"));
        assert!(meta.required);
        assert_eq!(meta.extra().get("color"), Some("red"));
        assert_eq!(field.identity_key(), Some("n"));
    }

    #[test]
    fn label_falls_back_to_default() {
        assert_eq!(text_field("{{formtext}}").label(), "Text");
        assert_eq!(text_field("{{formtext|Who}}").label(), "Who");
    }

    #[test]
    fn apply_from_ignores_other_variants() {
        let mut field = text_field("{{formtext}}");
        field.set_input("kept").unwrap();
        let number = Field::new(
            "formnumber",
            FieldMeta::default(),
            FieldKind::Number(NumberField::default()),
        );
        field.apply_from(&number);
        assert!(field.has_value());
    }

    #[test]
    fn emptying_input_still_counts_as_touched() {
        let mut field = text_field("{{formtext:value=default}}");
        assert!(!field.is_touched());
        field.set_input("").unwrap();
        assert!(field.is_touched());
        assert!(!field.has_value());

        let mut fresh = text_field("{{formtext}}");
        fresh.apply_from(&field);
        assert!(fresh.is_touched());
    }

    #[test]
    fn rejected_input_leaves_field_untouched() {
        let mut field = Field::new(
            "formnumber",
            FieldMeta::default(),
            FieldKind::Number(NumberField::default()),
        );
        assert!(field.set_input("abc").is_err());
        assert!(!field.is_touched());
    }

    #[test]
    fn unknown_fields_refuse_input() {
        let spec = parse_one("{{mystery:a=b}}").unwrap();
        let mut field = Field::unknown(&spec);
        assert!(field.set_input("x").is_err());
        assert!(!field.has_value());
        assert_eq!(field.source(), "{{mystery:a=b}}");
    }

    #[test]
    fn bool_parsing_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
