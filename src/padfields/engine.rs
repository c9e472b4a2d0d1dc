//! # Expansion Engine
//!
//! Turns note text with placeholders into final text:
//!
//! 1. **Parse** the text into literals and placeholder specs ([`crate::codec`]).
//! 2. **Build** a [`Field`] per placeholder through the [`FieldRegistry`], then merge in
//!    user input from the session fields carried by the [`DynamicValueConfig`].
//! 3. **Resolve** every field. References resolve last, from the values of the fields
//!    they point at.
//! 4. **Substitute** values (or labels, or the verbatim placeholder) back in order.
//!
//! Snippet fields call back into the engine with a config one level deeper. The level is
//! the only thing that grows during recursion, and a snippet at the configured maximum
//! inserts its raw text instead of expanding, so every expansion terminates.
//!
//! Nothing in here returns an error: a field that cannot resolve is logged and rendered
//! as having no value.

use crate::codec::{self, Segment, PLACEHOLDER_OPEN};
use crate::context::{DynamicValueConfig, ExpansionContext, ProcessingMode};
use crate::fields::{Field, FieldKind, ReferenceBinding};
use crate::registry::FieldRegistry;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use tracing::debug;

/// A field together with the byte span of its placeholder in the source text.
#[derive(Debug, Clone)]
pub struct FormField {
    pub field: Field,
    pub start: usize,
    pub end: usize,
    /// Position among the placeholders of the text.
    pub index: usize,
}

impl FormField {
    /// The placeholder in `text`, or the field's own source when the span does not fit.
    pub fn placeholder<'t>(&'t self, text: &'t str) -> &'t str {
        text.get(self.start..self.end)
            .filter(|slice| *slice == self.field.source())
            .unwrap_or_else(|| self.field.source())
    }
}

/// What a field sees while resolving.
pub struct ResolveContext<'a> {
    engine: &'a Engine,
    config: &'a DynamicValueConfig,
}

impl<'a> ResolveContext<'a> {
    pub fn new(engine: &'a Engine, config: &'a DynamicValueConfig) -> Self {
        Self { engine, config }
    }

    pub fn context(&self) -> &'a ExpansionContext {
        &self.engine.context
    }

    pub fn config(&self) -> &'a DynamicValueConfig {
        self.config
    }

    pub fn now(&self) -> DateTime<Local> {
        self.context().clock().now()
    }

    /// Whether a snippet found at this level may still be expanded.
    pub fn can_descend(&self) -> bool {
        self.config.level() < self.context().limits().max_recursion_depth()
    }

    /// Expands `text` one level deeper than the current call.
    pub fn expand_nested(&self, text: &str) -> String {
        self.engine.process(text, &self.config.nested())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Engine {
    registry: FieldRegistry,
    context: ExpansionContext,
}

impl Engine {
    pub fn new(registry: FieldRegistry, context: ExpansionContext) -> Self {
        Self { registry, context }
    }

    /// An engine with the built-in field types.
    pub fn with_context(context: ExpansionContext) -> Self {
        Self::new(FieldRegistry::default(), context)
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn context(&self) -> &ExpansionContext {
        &self.context
    }

    /// Number of placeholders in `text`.
    pub fn field_count(&self, text: &str) -> usize {
        codec::placeholder_count(text)
    }

    /// Expands every placeholder in `text`.
    pub fn process(&self, text: &str, config: &DynamicValueConfig) -> String {
        if config.is_passthrough() || !text.contains(PLACEHOLDER_OPEN) {
            return text.to_string();
        }
        let mut fields = self.form_fields(text, config);
        debug!(level = config.level(), fields = fields.len(), "expanding text");
        self.render(text, &mut fields, config)
    }

    /// Builds the fields of `text`, with session input merged in and references bound.
    pub fn form_fields(&self, text: &str, config: &DynamicValueConfig) -> Vec<FormField> {
        let mut fields = Vec::new();
        let mut offset = 0;
        for segment in codec::parse(text) {
            let len = segment.source().len();
            if let Segment::Placeholder(spec) = &segment {
                fields.push(FormField {
                    field: self.registry.create(spec, &self.context),
                    start: offset,
                    end: offset + len,
                    index: fields.len(),
                });
            }
            offset += len;
        }
        merge_session(&mut fields, config.initial_fields());
        bind_references(&mut fields);
        fields
    }

    /// Substitutes the resolved `fields` into `text`.
    ///
    /// `fields` must come from [`Engine::form_fields`] for the same text; otherwise the
    /// text is returned unchanged. Computed values are cached in the fields, so rendering
    /// twice yields the same text.
    pub fn render(&self, text: &str, fields: &mut [FormField], config: &DynamicValueConfig) -> String {
        if fields.is_empty() {
            return text.to_string();
        }
        if !fields.iter().all(|f| text.get(f.start..f.end) == Some(f.field.source())) {
            debug!(fields = fields.len(), "field spans do not match the text");
            return text.to_string();
        }
        let rc = ResolveContext::new(self, config);
        let values = resolve_all(fields, &rc);

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for (form_field, value) in fields.iter().zip(values) {
            out.push_str(text.get(last..form_field.start).unwrap_or_default());
            out.push_str(&substitution(form_field, value, config));
            last = form_field.end;
        }
        out.push_str(text.get(last..).unwrap_or_default());
        out
    }
}

fn skips_resolution(field: &Field, config: &DynamicValueConfig) -> bool {
    match config.mode() {
        ProcessingMode::Edit => field.is_snippet(),
        ProcessingMode::Preview => field.is_user_input() && !config.force_values(),
        _ => false,
    }
}

fn resolve_all(fields: &mut [FormField], rc: &ResolveContext<'_>) -> Vec<Option<String>> {
    let mut values = vec![None; fields.len()];
    for (value, form_field) in values.iter_mut().zip(fields.iter_mut()) {
        if form_field.field.is_reference() || skips_resolution(&form_field.field, rc.config()) {
            continue;
        }
        *value = form_field.field.resolve(rc);
    }

    for i in 0..fields.len() {
        let FieldKind::Reference(reference) = fields[i].field.kind_mut() else {
            continue;
        };
        let Some(target) = reference.binding().map(|b| b.index) else {
            continue;
        };
        reference.set_bound_value(values[target].clone());
        values[i] = fields[i].field.resolve(rc);
    }
    values
}

fn substitution(form_field: &FormField, value: Option<String>, config: &DynamicValueConfig) -> String {
    let field = &form_field.field;
    if field.is_unknown() {
        return field.source().to_string();
    }
    if skips_resolution(field, config) {
        return field.label();
    }
    match value {
        Some(value) => value,
        // A snippet whose note is gone keeps its placeholder so nothing is lost.
        None if field.is_snippet() => field.source().to_string(),
        None if config.force_values() => String::new(),
        None if config.mode().renders_labels() => field.label(),
        None => String::new(),
    }
}

/// Binds each reference to the first non-reference field labelled with its `ref` name.
fn bind_references(fields: &mut [FormField]) {
    for i in 0..fields.len() {
        let FieldKind::Reference(reference) = fields[i].field.kind() else {
            continue;
        };
        let binding = reference.ref_name.as_deref().and_then(|name| {
            fields
                .iter()
                .find(|f| !f.field.is_reference() && f.field.meta().label.as_deref() == Some(name))
                .map(|target| ReferenceBinding {
                    index: target.index,
                    label: target.field.label(),
                    value: None,
                })
        });
        if binding.is_none() {
            debug!(reference = ?reference.ref_name, "reference has no target");
        }
        if let FieldKind::Reference(reference) = fields[i].field.kind_mut() {
            reference.bind(binding);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum IdentityKey {
    Named(String),
    Ordinal(usize),
}

/// Type id plus a key: `id`, else the label, else the field's position among unkeyed
/// fields of the same type.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Identity {
    type_id: String,
    key: IdentityKey,
}

fn identities<'f>(fields: impl Iterator<Item = &'f Field>) -> Vec<Option<Identity>> {
    let mut ordinals: HashMap<String, usize> = HashMap::new();
    fields
        .map(|field| {
            if !field.is_user_input() {
                return None;
            }
            let key = match field.identity_key() {
                Some(key) => IdentityKey::Named(key.to_string()),
                None => {
                    let next = ordinals.entry(field.type_id().to_string()).or_insert(0);
                    let key = IdentityKey::Ordinal(*next);
                    *next += 1;
                    key
                }
            };
            Some(Identity {
                type_id: field.type_id().to_string(),
                key,
            })
        })
        .collect()
}

fn merge_session(fields: &mut [FormField], session: &[Field]) {
    if session.is_empty() {
        return;
    }
    let live = identities(session.iter());
    let fresh = identities(fields.iter().map(|f| &f.field));
    for (form_field, identity) in fields.iter_mut().zip(fresh) {
        let Some(identity) = identity else {
            continue;
        };
        let donor = live
            .iter()
            .position(|candidate| candidate.as_ref() == Some(&identity))
            .map(|j| &session[j]);
        if let Some(donor) = donor.filter(|d| d.is_touched()) {
            form_field.field.apply_from(donor);
        }
    }
}
