//! # Field type registry
//!
//! Maps a placeholder type id to the code that builds a [`Field`] from a [`FieldSpec`]
//! and the code that writes one back out. It is a plain dispatch table: a provider is a
//! pair of function pointers, and [`BUILTIN_PROVIDERS`] is the single source of truth
//! for the types that ship with the crate.
//!
//! Lookups never fail. A spec whose type id is not registered is tried as a legacy
//! placeholder and otherwise becomes an Unknown field that keeps its verbatim text. A
//! provider that rejects its attributes also yields Unknown, after a warning. The only
//! error this module returns is a duplicate registration.

use crate::codec::{self, Attributes, FieldSpec};
use crate::context::ExpansionContext;
use crate::error::{FieldsError, Result};
use crate::fields::{
    type_ids, BarcodeField, ClipboardValue, DateField, DateTimeValue, DeviceInfoValue, Field,
    FieldKind, FieldMeta, LegacyValue, NumberField, RandomValue, ReferenceField, SelectField,
    SnippetValue, TextField, ToggleField,
};
use std::collections::HashMap;
use tracing::{debug, warn};

pub type CreateFn = fn(&FieldSpec, &ExpansionContext) -> Result<FieldKind>;
pub type WriteFn = fn(&FieldKind, &mut Attributes);

/// How to build and write one placeholder type.
#[derive(Debug, Clone, Copy)]
pub struct FieldProvider {
    /// The id used in placeholder text (e.g. "formtext")
    pub type_id: &'static str,

    /// Label shown for fields that carry no inline label
    pub title: &'static str,

    /// Whether the user fills the field in, as opposed to it being computed
    pub user_input: bool,

    pub create: CreateFn,

    /// Writes the type's own attributes. Common attributes are written by the registry.
    pub write: WriteFn,
}

impl FieldProvider {
    pub const fn new(type_id: &'static str, title: &'static str, create: CreateFn) -> Self {
        Self {
            type_id,
            title,
            user_input: false,
            create,
            write: FieldKind::write_attributes,
        }
    }

    pub const fn user_input(mut self) -> Self {
        self.user_input = true;
        self
    }

    pub const fn with_writer(mut self, write: WriteFn) -> Self {
        self.write = write;
        self
    }
}

/// Every placeholder type the default registry knows.
pub const BUILTIN_PROVIDERS: &[FieldProvider] = &[
    // User inputs
    FieldProvider::new(type_ids::TEXT, "Text", create_text).user_input(),
    FieldProvider::new(type_ids::NUMBER, "Number", create_number).user_input(),
    FieldProvider::new(type_ids::DATE, "Date", create_date).user_input(),
    FieldProvider::new(type_ids::SELECT, "Select", create_select).user_input(),
    FieldProvider::new(type_ids::BARCODE, "Barcode", create_barcode).user_input(),
    FieldProvider::new(type_ids::TOGGLE, "Toggle", create_toggle).user_input(),
    // References
    FieldProvider::new(type_ids::REFERENCE, "Reference", create_reference),
    // Computed values
    FieldProvider::new(type_ids::CLIPBOARD, "Clipboard", create_clipboard),
    FieldProvider::new(type_ids::DATETIME, "Date and time", create_datetime),
    FieldProvider::new(type_ids::DEVICE, "Device", create_device),
    FieldProvider::new(type_ids::RANDOM, "Random", create_random),
    FieldProvider::new(type_ids::SNIPPET, "Snippet", create_snippet),
];

fn create_text(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    TextField::from_spec(spec, ctx).map(FieldKind::Text)
}

fn create_number(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    NumberField::from_spec(spec, ctx).map(FieldKind::Number)
}

fn create_date(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    DateField::from_spec(spec, ctx).map(FieldKind::Date)
}

fn create_select(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    SelectField::from_spec(spec, ctx).map(FieldKind::Select)
}

fn create_barcode(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    BarcodeField::from_spec(spec, ctx).map(FieldKind::Barcode)
}

fn create_toggle(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    ToggleField::from_spec(spec, ctx).map(FieldKind::Toggle)
}

fn create_reference(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    ReferenceField::from_spec(spec, ctx).map(FieldKind::Reference)
}

fn create_clipboard(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    ClipboardValue::from_spec(spec, ctx).map(FieldKind::Clipboard)
}

fn create_datetime(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    DateTimeValue::from_spec(spec, ctx).map(FieldKind::DateTime)
}

fn create_device(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    DeviceInfoValue::from_spec(spec, ctx).map(FieldKind::DeviceInfo)
}

fn create_random(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    RandomValue::from_spec(spec, ctx).map(FieldKind::Random)
}

fn create_snippet(spec: &FieldSpec, ctx: &ExpansionContext) -> Result<FieldKind> {
    SnippetValue::from_spec(spec, ctx).map(FieldKind::Snippet)
}

#[derive(Debug, Clone)]
pub struct FieldRegistry {
    providers: HashMap<&'static str, FieldProvider>,
    order: Vec<&'static str>,
}

impl Default for FieldRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for provider in BUILTIN_PROVIDERS {
            registry.providers.insert(provider.type_id, *provider);
            registry.order.push(provider.type_id);
        }
        registry
    }
}

impl FieldRegistry {
    /// A registry with no providers. Every placeholder becomes Legacy or Unknown.
    pub fn empty() -> Self {
        Self {
            providers: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn register(&mut self, provider: FieldProvider) -> Result<()> {
        if self.providers.contains_key(provider.type_id) {
            return Err(FieldsError::DuplicateFieldType(provider.type_id.to_string()));
        }
        self.providers.insert(provider.type_id, provider);
        self.order.push(provider.type_id);
        Ok(())
    }

    pub fn get(&self, type_id: &str) -> Option<&FieldProvider> {
        self.providers.get(type_id)
    }

    /// Providers in registration order.
    pub fn providers(&self) -> impl Iterator<Item = &FieldProvider> {
        self.order.iter().filter_map(|id| self.providers.get(id))
    }

    pub fn user_input_providers(&self) -> impl Iterator<Item = &FieldProvider> {
        self.providers().filter(|p| p.user_input)
    }

    /// Builds the field for `spec`. Never fails.
    pub fn create(&self, spec: &FieldSpec, context: &ExpansionContext) -> Field {
        if !spec.is_malformed() {
            if let Some(provider) = self.providers.get(spec.type_id()) {
                return match (provider.create)(spec, context) {
                    Ok(kind) => {
                        let meta = FieldMeta::from_spec(spec, provider.title, kind.attribute_keys());
                        Field::new(provider.type_id, meta, kind)
                    }
                    Err(err) => {
                        warn!(
                            placeholder = spec.source(),
                            error = %err,
                            "invalid placeholder kept as is"
                        );
                        Field::unknown(spec)
                    }
                };
            }
        }

        if let Some(legacy) = LegacyValue::lookup(spec.body()) {
            debug!(placeholder = spec.source(), kind = legacy.kind().id(), "legacy placeholder");
            return Field::legacy(spec, legacy);
        }

        debug!(placeholder = spec.source(), "unrecognized placeholder");
        Field::unknown(spec)
    }

    /// Writes the canonical placeholder text for `field`.
    ///
    /// Unknown and legacy fields are written back exactly as they were read.
    pub fn create_placeholder(&self, field: &Field) -> String {
        if matches!(field.kind(), FieldKind::Unknown | FieldKind::Legacy(_)) {
            return field.source().to_string();
        }

        let meta = field.meta();
        let mut spec = FieldSpec::new(field.type_id());
        spec.set_label(meta.label.clone());

        let attrs = spec.attributes_mut();
        if let Some(id) = &meta.id {
            attrs.set("id", id);
        }
        match self.get(field.type_id()) {
            Some(provider) => (provider.write)(field.kind(), attrs),
            None => field.kind().write_attributes(attrs),
        }
        if let Some(prefix) = &meta.prefix {
            attrs.set("prefix", prefix);
        }
        if let Some(suffix) = &meta.suffix {
            attrs.set("suffix", suffix);
        }
        if meta.required {
            attrs.set("required", "true");
        }
        for (key, value) in meta.extra().iter() {
            if !attrs.contains(key) {
                attrs.set(key, value);
            }
        }

        codec::serialize(&spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::parse_one;

    fn create(source: &str) -> Field {
        let spec = parse_one(source).unwrap();
        FieldRegistry::default().create(&spec, &ExpansionContext::default())
    }

    fn round_trip(source: &str) -> String {
        FieldRegistry::default().create_placeholder(&create(source))
    }

    #[test]
    fn builtins_are_registered_once() {
        let registry = FieldRegistry::default();
        assert_eq!(registry.providers().count(), BUILTIN_PROVIDERS.len());
        assert_eq!(registry.user_input_providers().count(), 6);
        assert_eq!(registry.providers().next().unwrap().type_id, type_ids::TEXT);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = FieldRegistry::default();
        let err = registry
            .register(FieldProvider::new(type_ids::TEXT, "Again", create_text))
            .unwrap_err();
        assert!(matches!(err, FieldsError::DuplicateFieldType(id) if id == "formtext"));
    }

    #[test]
    fn custom_types_reuse_existing_variants() {
        let mut registry = FieldRegistry::empty();
        registry
            .register(FieldProvider::new("note", "Note", create_text).user_input())
            .unwrap();
        let spec = parse_one("{{note:value=hi}}").unwrap();
        let field = registry.create(&spec, &ExpansionContext::default());
        assert!(matches!(field.kind(), FieldKind::Text(_)));
        assert_eq!(field.label(), "Note");
        assert_eq!(registry.create_placeholder(&field), "{{note:value=hi}}");
    }

    #[test]
    fn unknown_types_survive_byte_for_byte() {
        let field = create("{{weirdtype:foo=bar}}");
        assert!(field.is_unknown());
        assert_eq!(round_trip("{{weirdtype:foo=bar}}"), "{{weirdtype:foo=bar}}");
        assert_eq!(round_trip("{{ not a field }}"), "{{ not a field }}");
    }

    #[test]
    fn bad_attributes_degrade_to_unknown() {
        let field = create("{{formnumber:value=many}}");
        assert!(field.is_unknown());
        assert_eq!(field.source(), "{{formnumber:value=many}}");
    }

    #[test]
    fn legacy_placeholders_keep_their_text() {
        let field = create("{{ date }}");
        assert!(matches!(field.kind(), FieldKind::Legacy(_)));
        assert_eq!(round_trip("{{ date }}"), "{{ date }}");
        assert!(create("{{snippet: abc}}").is_snippet());
    }

    #[test]
    fn canonical_placeholders_round_trip() {
        for source in [
            "{{formtext|Name:id=1,value=Ada,maxLength=10,prefix=<,required=true}}",
            "{{formnumber:value=42,minValue=0,maxValue=100}}",
            "{{formdate:format=%25d.%25m.%25Y,value=2024-05-06}}",
            "{{formselect|Fruit:options=Apple:a;Pear:p,value=a;p,multiple=true,formatter=%2C}}",
            "{{formbarcode:value=123;456,multiple=true}}",
            "{{formtoggle:checked=true,text=Yes}}",
            "{{formref:ref=Name,intrinsic=true}}",
            "{{clipboard}}",
            "{{datetime:format=%25H:%25M}}",
            "{{device:kind=hostname}}",
            "{{random:kind=custom,options=a;b}}",
            "{{snippet:ref=abc}}",
        ] {
            assert_eq!(round_trip(source), source);
        }
    }

    #[test]
    fn unrecognized_attributes_are_kept() {
        assert_eq!(
            round_trip("{{formtext:value=x,color=red}}"),
            "{{formtext:value=x,color=red}}"
        );
    }
}
