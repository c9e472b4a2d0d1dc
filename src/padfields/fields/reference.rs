use super::{flag_attr, text_attr, UNKNOWN_LABEL};
use crate::codec::{Attributes, FieldSpec};
use crate::context::ExpansionContext;
use crate::error::Result;

/// Where a reference points: a field in the same text, by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceBinding {
    pub index: usize,
    pub label: String,
    pub value: Option<String>,
}

/// Mirrors the value of another field, found by label.
///
/// The engine binds references after building every field of a text. A reference never
/// binds to another reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceField {
    pub ref_name: Option<String>,
    pub intrinsic: bool,
    binding: Option<ReferenceBinding>,
}

impl ReferenceField {
    pub(crate) const KEYS: &'static [&'static str] = &["ref", "intrinsic"];

    pub(crate) fn from_spec(spec: &FieldSpec, _context: &ExpansionContext) -> Result<Self> {
        Ok(Self {
            ref_name: text_attr(spec, "ref"),
            intrinsic: flag_attr(spec, "intrinsic")?,
            binding: None,
        })
    }

    pub(crate) fn write(&self, attrs: &mut Attributes) {
        if let Some(name) = &self.ref_name {
            attrs.set("ref", name);
        }
        if self.intrinsic {
            attrs.set("intrinsic", "true");
        }
    }

    pub fn binding(&self) -> Option<&ReferenceBinding> {
        self.binding.as_ref()
    }

    pub(crate) fn bind(&mut self, binding: Option<ReferenceBinding>) {
        self.binding = binding;
    }

    pub(crate) fn set_bound_value(&mut self, value: Option<String>) {
        if let Some(binding) = &mut self.binding {
            binding.value = value;
        }
    }

    pub(crate) fn label(&self, own_label: Option<&str>) -> String {
        match (&self.binding, &self.ref_name) {
            (Some(binding), _) if self.intrinsic => {
                own_label.unwrap_or(binding.label.as_str()).to_string()
            }
            (Some(_), Some(name)) => format!("= {}", name),
            _ => UNKNOWN_LABEL.to_string(),
        }
    }

    pub(crate) fn resolve(&self) -> Option<String> {
        self.binding.as_ref().and_then(|b| b.value.clone())
    }

    pub(crate) fn has_value(&self) -> bool {
        self.binding.as_ref().is_some_and(|b| b.value.is_some())
    }

    pub(crate) fn clear(&mut self) {
        self.set_bound_value(None);
    }
}
