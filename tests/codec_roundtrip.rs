//! Property tests for the placeholder codec.
//!
//! Properties:
//! - Canonical placeholder text parses back to the same type, label and attributes,
//!   and serializes to the same bytes.
//! - Any placeholder-shaped text, canonical or not, serializes back to the same bytes.
//! - Parsing any text yields segments whose sources concatenate back to that text, and
//!   serializing those segments rebuilds the text unchanged.

use padfields::codec::{self, FieldSpec, Segment};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn arb_ident() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_.-]{0,10}"
}

fn arb_spec() -> impl Strategy<Value = FieldSpec> {
    (
        arb_ident(),
        proptest::option::of(any::<String>()),
        proptest::collection::btree_map(arb_ident(), any::<String>(), 0..5),
    )
        .prop_map(|(type_id, label, attrs): (String, Option<String>, BTreeMap<String, String>)| {
            let mut spec = FieldSpec::new(type_id);
            spec.set_label(label);
            for (key, value) in attrs {
                spec = spec.with_attr(key, value);
            }
            spec
        })
}

/// Bodies that look like the grammar but may carry raw reserved characters, lowercase
/// or needless escapes.
fn arb_loose_body() -> impl Strategy<Value = String> {
    let value = "([a-zA-Z0-9 ;|=:]|%[0-9a-fA-F]{2}){0,6}";
    (
        arb_ident(),
        proptest::option::of(value),
        proptest::collection::vec((arb_ident(), value), 0..4),
    )
        .prop_map(|(type_id, label, attrs)| {
            let mut body = type_id;
            if let Some(label) = label {
                body.push('|');
                body.push_str(&label);
            }
            for (i, (key, value)) in attrs.iter().enumerate() {
                body.push(if i == 0 { ':' } else { ',' });
                body.push_str(&format!("{}={}", key, value));
            }
            body
        })
}

proptest! {
    #[test]
    fn canonical_placeholders_round_trip(spec in arb_spec()) {
        let text = codec::serialize(&spec);
        let parsed = codec::parse_one(&text);
        prop_assert!(parsed.is_some(), "not a single placeholder: {}", text);
        let parsed = parsed.unwrap();

        prop_assert!(!parsed.is_malformed());
        prop_assert_eq!(parsed.type_id(), spec.type_id());
        prop_assert_eq!(parsed.label(), spec.label());
        prop_assert_eq!(parsed.attributes(), spec.attributes());
        prop_assert_eq!(parsed.source(), text.as_str());
        prop_assert_eq!(codec::serialize(&parsed), text);
    }

    #[test]
    fn grammar_like_placeholders_serialize_verbatim(body in arb_loose_body()) {
        let text = format!("{{{{{}}}}}", body);
        let parsed = codec::parse_one(&text);
        prop_assert!(parsed.is_some(), "not a single placeholder: {}", text);
        prop_assert_eq!(codec::serialize(&parsed.unwrap()), text);
    }

    #[test]
    fn any_placeholder_body_serializes_verbatim(body in "[^{}\n]{0,30}") {
        let text = format!("{{{{{}}}}}", body);
        let parsed = codec::parse_one(&text);
        prop_assert!(parsed.is_some(), "not a single placeholder: {}", text);
        prop_assert_eq!(codec::serialize(&parsed.unwrap()), text);
    }

    #[test]
    fn segments_cover_any_text(text in any::<String>()) {
        let segments = codec::parse(&text);
        let rebuilt: String = segments.iter().map(Segment::source).collect();
        prop_assert_eq!(&rebuilt, &text);
        prop_assert_eq!(codec::serialize_segments(&segments), text);
    }

    #[test]
    fn placeholders_survive_surrounding_text(
        before in "[^{}]{0,20}",
        after in "[^{}]{0,20}",
        spec in arb_spec(),
    ) {
        let placeholder = codec::serialize(&spec);
        let text = format!("{}{}{}", before, placeholder, after);
        prop_assert_eq!(codec::placeholder_count(&text), 1);
        prop_assert_eq!(codec::serialize_segments(&codec::parse(&text)), text);
    }

    #[test]
    fn escape_is_reversible(value in any::<String>()) {
        let escaped = codec::escape(&value);
        let reserved = ['{', '}', ',', '=', '\n'];
        prop_assert!(!escaped.contains(reserved));
        prop_assert_eq!(codec::unescape(&escaped), Some(value));
    }
}
