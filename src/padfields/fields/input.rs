//! User-input field variants.

use super::format::{
    self, decode_list, decode_pairs, encode_list, encode_pairs, join_values, TimePeriod,
    DEFAULT_DATE_FORMAT, DEFAULT_FORMATTER,
};
use super::{flag_attr, parse_attr, parse_bool, text_attr};
use crate::codec::{Attributes, FieldSpec};
use crate::context::ExpansionContext;
use crate::engine::ResolveContext;
use crate::error::{FieldsError, Result};
use chrono::NaiveDateTime;
use tracing::warn;

fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

// --- Text ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextField {
    pub value: Option<String>,
    pub max_length: Option<usize>,
    pub multi_line: bool,
    pub clipboard: bool,
}

impl TextField {
    pub(crate) const KEYS: &'static [&'static str] = &["value", "maxLength", "multiLine", "clipboard"];

    pub(crate) fn from_spec(spec: &FieldSpec, context: &ExpansionContext) -> Result<Self> {
        let mut field = Self {
            value: text_attr(spec, "value"),
            max_length: parse_attr(spec, "maxLength")?,
            multi_line: flag_attr(spec, "multiLine")?,
            clipboard: flag_attr(spec, "clipboard")?,
        };
        if field.clipboard && field.value.is_none() {
            field.value = match context.clipboard().current_text() {
                Ok(text) => text.filter(|t| !t.is_empty()),
                Err(err) => {
                    warn!(error = %err, "could not seed text field from clipboard");
                    None
                }
            };
        }
        Ok(field)
    }

    pub(crate) fn write(&self, attrs: &mut Attributes) {
        if let Some(value) = &self.value {
            attrs.set("value", value);
        }
        if let Some(max) = self.max_length {
            attrs.set("maxLength", max.to_string());
        }
        if self.multi_line {
            attrs.set("multiLine", "true");
        }
        if self.clipboard {
            attrs.set("clipboard", "true");
        }
    }

    /// Advisory length check for input UIs.
    pub fn check(&self) -> Option<String> {
        let (value, max) = (self.value.as_ref()?, self.max_length?);
        let len = value.chars().count();
        (len > max).then(|| format!("{} > {}", len, max))
    }

    pub(crate) fn resolve(&self) -> Option<String> {
        self.value.clone().filter(|v| !v.is_empty())
    }

    pub(crate) fn set_input(&mut self, raw: &str) -> Result<()> {
        self.value = non_empty(raw);
        Ok(())
    }

    pub(crate) fn has_value(&self) -> bool {
        self.value.as_deref().is_some_and(|v| !v.is_empty())
    }

    pub(crate) fn clear(&mut self) {
        self.value = None;
    }

    pub(crate) fn apply_from(&mut self, other: &TextField) {
        self.value = other.value.clone();
    }
}

// --- Number ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberField {
    pub value: Option<i64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl NumberField {
    pub(crate) const KEYS: &'static [&'static str] = &["value", "minValue", "maxValue"];

    pub(crate) fn from_spec(spec: &FieldSpec, _context: &ExpansionContext) -> Result<Self> {
        Ok(Self {
            value: parse_attr(spec, "value")?,
            min: parse_attr(spec, "minValue")?,
            max: parse_attr(spec, "maxValue")?,
        })
    }

    pub(crate) fn write(&self, attrs: &mut Attributes) {
        if let Some(value) = self.value {
            attrs.set("value", value.to_string());
        }
        if let Some(min) = self.min {
            attrs.set("minValue", min.to_string());
        }
        if let Some(max) = self.max {
            attrs.set("maxValue", max.to_string());
        }
    }

    /// Reports a bound the current value violates. Resolution ignores bounds.
    pub fn check(&self) -> Option<String> {
        let value = self.value?;
        match (self.min, self.max) {
            (Some(min), _) if value < min => Some(format!("{} < {}", value, min)),
            (_, Some(max)) if value > max => Some(format!("{} > {}", value, max)),
            _ => None,
        }
    }

    pub(crate) fn resolve(&self) -> Option<String> {
        self.value.map(|v| v.to_string())
    }

    pub(crate) fn set_input(&mut self, raw: &str) -> Result<()> {
        let raw = raw.trim();
        self.value = if raw.is_empty() {
            None
        } else {
            Some(
                raw.parse()
                    .map_err(|_| FieldsError::InvalidInput(format!("'{}' is not a whole number", raw)))?,
            )
        };
        Ok(())
    }

    pub(crate) fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.value = None;
    }

    pub(crate) fn apply_from(&mut self, other: &NumberField) {
        self.value = other.value;
    }
}

// --- Date ---

/// A date picked by the user, or derived from a relative period at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateField {
    /// Explicit `format` attribute
    pub format: Option<String>,
    /// Format used when the placeholder sets none
    pub default_format: String,
    pub period: Option<TimePeriod>,
    pub date: Option<NaiveDateTime>,
}

impl Default for DateField {
    fn default() -> Self {
        Self {
            format: None,
            default_format: DEFAULT_DATE_FORMAT.to_string(),
            period: None,
            date: None,
        }
    }
}

impl DateField {
    pub(crate) const KEYS: &'static [&'static str] = &["format", "value"];

    pub(crate) fn from_spec(spec: &FieldSpec, context: &ExpansionContext) -> Result<Self> {
        let mut field = Self {
            format: text_attr(spec, "format"),
            default_format: context.date_format().to_string(),
            ..Self::default()
        };
        if let Some(raw) = text_attr(spec, "value") {
            field.set_input(&raw).map_err(|_| {
                FieldsError::invalid_attribute(spec.type_id(), "value", format!("'{}' is not a date", raw))
            })?;
        }
        Ok(field)
    }

    pub(crate) fn write(&self, attrs: &mut Attributes) {
        if let Some(format) = &self.format {
            attrs.set("format", format);
        }
        if let Some(period) = self.period {
            attrs.set("value", period.code());
        } else if let Some(date) = &self.date {
            attrs.set("value", format::write_date(date));
        }
    }

    pub(crate) fn resolve(&self, rc: &ResolveContext<'_>) -> Result<Option<String>> {
        let date = match (self.date, self.period) {
            (Some(date), _) => date,
            (None, Some(period)) => period.start(rc.now()),
            (None, None) => return Ok(None),
        };
        let pattern = self.format.as_deref().unwrap_or(self.default_format.as_str());
        format::format_naive(&date, pattern).map(Some)
    }

    pub(crate) fn set_input(&mut self, raw: &str) -> Result<()> {
        let raw = raw.trim();
        if raw.is_empty() {
            self.clear();
        } else if let Some(period) = TimePeriod::by_code(raw) {
            self.period = Some(period);
            self.date = None;
        } else {
            let date = format::parse_date(raw)
                .ok_or_else(|| FieldsError::InvalidInput(format!("'{}' is not a date", raw)))?;
            self.date = Some(date);
            self.period = None;
        }
        Ok(())
    }

    pub(crate) fn has_value(&self) -> bool {
        self.date.is_some() || self.period.is_some()
    }

    pub(crate) fn clear(&mut self) {
        self.date = None;
        self.period = None;
    }

    pub(crate) fn apply_from(&mut self, other: &DateField) {
        self.date = other.date;
        self.period = other.period;
    }
}

// --- Select ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectOption {
    pub title: Option<String>,
    pub value: Option<String>,
}

impl SelectOption {
    pub fn new(title: Option<&str>, value: Option<&str>) -> Self {
        Self {
            title: title.map(str::to_string),
            value: value.map(str::to_string),
        }
    }

    /// What the option contributes to the rendered text: its value, else its title.
    pub fn resolved(&self) -> Option<&str> {
        self.value.as_deref().or(self.title.as_deref())
    }

    fn matches(&self, key: &str) -> bool {
        self.value.as_deref() == Some(key) || self.title.as_deref() == Some(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectField {
    pub options: Vec<SelectOption>,
    pub selected: Vec<SelectOption>,
    pub multiple: bool,
    pub user_input: bool,
    pub formatter: String,
}

impl Default for SelectField {
    fn default() -> Self {
        Self {
            options: Vec::new(),
            selected: Vec::new(),
            multiple: false,
            user_input: false,
            formatter: DEFAULT_FORMATTER.to_string(),
        }
    }
}

impl SelectField {
    pub(crate) const KEYS: &'static [&'static str] =
        &["options", "value", "multiple", "userInput", "formatter"];

    pub(crate) fn from_spec(spec: &FieldSpec, _context: &ExpansionContext) -> Result<Self> {
        let mut field = Self {
            options: decode_pairs(spec.attr("options").unwrap_or_default())
                .into_iter()
                .map(|(title, value)| SelectOption { title, value })
                .collect(),
            multiple: flag_attr(spec, "multiple")?,
            user_input: flag_attr(spec, "userInput")?,
            formatter: spec
                .attr("formatter")
                .filter(|f| !f.is_empty())
                .unwrap_or(DEFAULT_FORMATTER)
                .to_string(),
            ..Self::default()
        };
        let keys = decode_list(spec.attr("value").unwrap_or_default());
        field.choose(keys.iter().map(String::as_str));
        Ok(field)
    }

    pub(crate) fn write(&self, attrs: &mut Attributes) {
        if !self.options.is_empty() {
            attrs.set(
                "options",
                encode_pairs(
                    self.options
                        .iter()
                        .map(|o| (o.title.as_deref(), o.value.as_deref())),
                ),
            );
        }
        let chosen: Vec<&str> = self.selected.iter().filter_map(SelectOption::resolved).collect();
        if !chosen.is_empty() {
            attrs.set("value", encode_list(&chosen));
        }
        if self.multiple {
            attrs.set("multiple", "true");
        }
        if self.user_input {
            attrs.set("userInput", "true");
        }
        if self.formatter != DEFAULT_FORMATTER {
            attrs.set("formatter", &self.formatter);
        }
    }

    /// Replaces the selection. Keys match an option's value or title; unmatched keys are
    /// kept as free-form values.
    pub fn choose<'k>(&mut self, keys: impl IntoIterator<Item = &'k str>) {
        self.selected = keys
            .into_iter()
            .filter(|key| !key.is_empty())
            .map(|key| {
                self.options
                    .iter()
                    .find(|o| o.matches(key))
                    .cloned()
                    .unwrap_or_else(|| SelectOption::new(None, Some(key)))
            })
            .collect();
    }

    pub(crate) fn resolve(&self) -> Option<String> {
        let values: Vec<String> = self
            .selected
            .iter()
            .filter_map(SelectOption::resolved)
            .map(str::to_string)
            .collect();
        join_values(&values, &self.formatter)
    }

    pub(crate) fn set_input(&mut self, raw: &str) -> Result<()> {
        let keys = decode_list(raw);
        if !self.multiple && keys.len() > 1 {
            return Err(FieldsError::InvalidInput(
                "this select accepts a single choice".to_string(),
            ));
        }
        if !self.user_input {
            if let Some(key) = keys.iter().find(|k| !self.options.iter().any(|o| o.matches(k))) {
                return Err(FieldsError::InvalidInput(format!("'{}' is not an option", key)));
            }
        }
        self.choose(keys.iter().map(String::as_str));
        Ok(())
    }

    pub(crate) fn has_value(&self) -> bool {
        !self.selected.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.selected.clear();
    }

    pub(crate) fn apply_from(&mut self, other: &SelectField) {
        self.selected = other.selected.clone();
    }
}

// --- Barcode ---

/// Scanned values, joined like a multi-select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeField {
    pub values: Vec<String>,
    pub multiple: bool,
    pub formatter: String,
}

impl Default for BarcodeField {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            multiple: false,
            formatter: DEFAULT_FORMATTER.to_string(),
        }
    }
}

impl BarcodeField {
    pub(crate) const KEYS: &'static [&'static str] = &["value", "multiple", "formatter"];

    pub(crate) fn from_spec(spec: &FieldSpec, _context: &ExpansionContext) -> Result<Self> {
        Ok(Self {
            values: decode_list(spec.attr("value").unwrap_or_default())
                .into_iter()
                .filter(|v| !v.is_empty())
                .collect(),
            multiple: flag_attr(spec, "multiple")?,
            formatter: spec
                .attr("formatter")
                .filter(|f| !f.is_empty())
                .unwrap_or(DEFAULT_FORMATTER)
                .to_string(),
        })
    }

    pub(crate) fn write(&self, attrs: &mut Attributes) {
        if !self.values.is_empty() {
            attrs.set("value", encode_list(&self.values));
        }
        if self.multiple {
            attrs.set("multiple", "true");
        }
        if self.formatter != DEFAULT_FORMATTER {
            attrs.set("formatter", &self.formatter);
        }
    }

    pub(crate) fn resolve(&self) -> Option<String> {
        join_values(&self.values, &self.formatter)
    }

    /// A scan appends when the field takes several codes, otherwise it replaces.
    pub(crate) fn set_input(&mut self, raw: &str) -> Result<()> {
        let scanned: Vec<String> = decode_list(raw).into_iter().filter(|v| !v.is_empty()).collect();
        if self.multiple {
            self.values.extend(scanned);
        } else {
            self.values = scanned.into_iter().take(1).collect();
        }
        Ok(())
    }

    pub(crate) fn has_value(&self) -> bool {
        !self.values.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
    }

    pub(crate) fn apply_from(&mut self, other: &BarcodeField) {
        self.values = other.values.clone();
    }
}

// --- Toggle ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleField {
    pub checked: bool,
    pub text: Option<String>,
}

impl ToggleField {
    pub(crate) const KEYS: &'static [&'static str] = &["checked", "text"];

    pub(crate) fn from_spec(spec: &FieldSpec, _context: &ExpansionContext) -> Result<Self> {
        Ok(Self {
            checked: flag_attr(spec, "checked")?,
            text: spec.attr("text").map(str::to_string),
        })
    }

    pub(crate) fn write(&self, attrs: &mut Attributes) {
        if self.checked {
            attrs.set("checked", "true");
        }
        if let Some(text) = &self.text {
            attrs.set("text", text);
        }
    }

    pub(crate) fn resolve(&self) -> Option<String> {
        if self.checked {
            self.text.clone()
        } else {
            None
        }
    }

    pub(crate) fn set_input(&mut self, raw: &str) -> Result<()> {
        self.checked = parse_bool(raw)
            .ok_or_else(|| FieldsError::InvalidInput(format!("'{}' is not on or off", raw)))?;
        Ok(())
    }

    pub(crate) fn has_value(&self) -> bool {
        self.checked
    }

    pub(crate) fn clear(&mut self) {
        self.checked = false;
    }

    pub(crate) fn apply_from(&mut self, other: &ToggleField) {
        self.checked = other.checked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_one;
    use crate::context::StaticClipboard;

    fn spec(source: &str) -> FieldSpec {
        parse_one(source).unwrap()
    }

    fn ctx() -> ExpansionContext {
        ExpansionContext::default()
    }

    #[test]
    fn text_seeds_from_clipboard_only_when_empty() {
        let context = ExpansionContext::default().with_clipboard(StaticClipboard(Some("clip".into())));
        let seeded = TextField::from_spec(&spec("{{formtext:clipboard=true}}"), &context).unwrap();
        assert_eq!(seeded.resolve().as_deref(), Some("clip"));

        let explicit =
            TextField::from_spec(&spec("{{formtext:value=mine,clipboard=true}}"), &context).unwrap();
        assert_eq!(explicit.resolve().as_deref(), Some("mine"));
    }

    #[test]
    fn text_length_check_is_advisory() {
        let mut field = TextField::from_spec(&spec("{{formtext:maxLength=3}}"), &ctx()).unwrap();
        field.set_input("abcd").unwrap();
        assert_eq!(field.check().as_deref(), Some("4 > 3"));
        assert_eq!(field.resolve().as_deref(), Some("abcd"));
    }

    #[test]
    fn bad_numeric_attribute_is_an_error() {
        assert!(TextField::from_spec(&spec("{{formtext:maxLength=lots}}"), &ctx()).is_err());
        assert!(NumberField::from_spec(&spec("{{formnumber:value=4.5}}"), &ctx()).is_err());
    }

    #[test]
    fn number_resolves_to_decimal_text() {
        let field = NumberField::from_spec(&spec("{{formnumber:value=42,maxValue=10}}"), &ctx()).unwrap();
        assert_eq!(field.resolve().as_deref(), Some("42"));
        assert_eq!(field.check().as_deref(), Some("42 > 10"));
    }

    #[test]
    fn number_input_rejects_text() {
        let mut field = NumberField::default();
        assert!(field.set_input("forty").is_err());
        field.set_input(" -7 ").unwrap();
        assert_eq!(field.resolve().as_deref(), Some("-7"));
    }

    #[test]
    fn date_accepts_periods_and_dates() {
        let mut field = DateField::default();
        field.set_input("yesterday").unwrap();
        assert_eq!(field.period, Some(TimePeriod::Yesterday));
        field.set_input("2020-01-02").unwrap();
        assert!(field.period.is_none());
        assert!(field.has_value());
        assert!(field.set_input("soon").is_err());
    }

    #[test]
    fn date_attribute_must_be_a_date() {
        assert!(DateField::from_spec(&spec("{{formdate:value=nope}}"), &ctx()).is_err());
        let field = DateField::from_spec(&spec("{{formdate:value=today}}"), &ctx()).unwrap();
        let mut attrs = Attributes::new();
        field.write(&mut attrs);
        assert_eq!(attrs.get("value"), Some("today"));
        assert_eq!(attrs.get("format"), None);
    }

    #[test]
    fn date_format_defaults_to_the_context() {
        let context = ExpansionContext::default().with_date_format("%d.%m.%Y");
        let field = DateField::from_spec(&spec("{{formdate}}"), &context).unwrap();
        assert_eq!(field.default_format, "%d.%m.%Y");
        assert_eq!(field.format, None);
    }

    #[test]
    fn select_joins_chosen_values() {
        let field = SelectField::from_spec(
            &spec("{{formselect:options=A:a;B:b,value=a;b,multiple=true,formatter=%2C}}"),
            &ctx(),
        )
        .unwrap();
        assert_eq!(field.resolve().as_deref(), Some("a,b"));
    }

    #[test]
    fn select_falls_back_to_option_titles() {
        let mut field =
            SelectField::from_spec(&spec("{{formselect:options=Red;Green,multiple=true}}"), &ctx()).unwrap();
        assert!(field.resolve().is_none());
        field.set_input("Red;Green").unwrap();
        assert_eq!(field.resolve().as_deref(), Some("Red, Green"));
    }

    #[test]
    fn select_input_validates_choices() {
        let mut field = SelectField::from_spec(&spec("{{formselect:options=A:a;B:b}}"), &ctx()).unwrap();
        assert!(field.set_input("a;b").is_err());
        assert!(field.set_input("z").is_err());
        field.set_input("B").unwrap();
        assert_eq!(field.resolve().as_deref(), Some("b"));

        let mut open =
            SelectField::from_spec(&spec("{{formselect:options=A:a,userInput=true}}"), &ctx()).unwrap();
        open.set_input("custom").unwrap();
        assert_eq!(open.resolve().as_deref(), Some("custom"));
    }

    #[test]
    fn select_writes_its_selection() {
        let mut field = SelectField::from_spec(&spec("{{formselect:options=A:a;B:b}}"), &ctx()).unwrap();
        field.set_input("b").unwrap();
        let mut attrs = Attributes::new();
        field.write(&mut attrs);
        assert_eq!(attrs.get("options"), Some("A:a;B:b"));
        assert_eq!(attrs.get("value"), Some("b"));
        assert!(!attrs.contains("formatter"));
    }

    #[test]
    fn barcode_appends_scans_when_multiple() {
        let mut field =
            BarcodeField::from_spec(&spec("{{formbarcode:multiple=true,formatter=space}}"), &ctx()).unwrap();
        field.set_input("111").unwrap();
        field.set_input("222").unwrap();
        assert_eq!(field.resolve().as_deref(), Some("111 222"));

        let mut single = BarcodeField::default();
        single.set_input("1").unwrap();
        single.set_input("2").unwrap();
        assert_eq!(single.resolve().as_deref(), Some("2"));
    }

    #[test]
    fn toggle_returns_text_only_when_checked() {
        let mut field = ToggleField::from_spec(&spec("{{formtoggle:text=Yes please}}"), &ctx()).unwrap();
        assert_eq!(field.resolve(), None);
        field.set_input("on").unwrap();
        assert_eq!(field.resolve().as_deref(), Some("Yes please"));
        field.clear();
        assert!(!field.has_value());
    }
}
