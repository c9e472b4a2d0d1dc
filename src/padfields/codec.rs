//! # Placeholder Codec
//!
//! Finds placeholders in note text and converts them to and from [`FieldSpec`]s.
//!
//! ## Grammar
//!
//! ```text
//! placeholder = "{{" type-id [ "|" label ] [ ":" attr *( "," attr ) ] "}}"
//! type-id     = 1*( ALPHA / DIGIT / "_" / "-" / "." )
//! attr        = key "=" value
//! ```
//!
//! Labels and values percent-escape the characters that carry meaning in the grammar
//! (`%`, `,`, `=`, `|`, `{`, `}`, CR, LF, and `:` in labels), always as uppercase `%XX`.
//! Text written by [`serialize`] is the canonical form. The parser only accepts canonical
//! labels and values: a raw reserved character, a lowercase escape like `%2c` or a
//! needless one like `%41` makes the body non-canonical. As a result every placeholder
//! round-trips byte for byte: `serialize(parse_one(x)) == x`.
//!
//! ## Failing closed
//!
//! The codec never rejects input. A `{{ ... }}` whose body is not canonical grammar
//! becomes a *malformed* spec that serializes back to its verbatim source, so documents
//! are never rewritten because of a placeholder the codec does not understand. A `{{`
//! that is never closed, or a pair of delimiters with a newline between them, is plain
//! literal text.

pub const PLACEHOLDER_OPEN: &str = "{{";
pub const PLACEHOLDER_CLOSE: &str = "}}";

const VALUE_RESERVED: &[char] = &['%', ',', '=', '|', '{', '}', '\r', '\n'];
const LABEL_RESERVED: &[char] = &['%', ',', '=', '|', ':', '{', '}', '\r', '\n'];

/// Ordered attribute list of a placeholder.
///
/// Insertion order is kept because it is part of the canonical text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, String)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets `key`, replacing an existing entry in place or appending a new one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A parsed placeholder: type id, optional inline label, ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    type_id: String,
    label: Option<String>,
    attributes: Attributes,
    source: String,
    malformed: bool,
}

impl FieldSpec {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            label: None,
            attributes: Attributes::new(),
            source: String::new(),
            malformed: false,
        }
    }

    /// A spec the codec could not read. It keeps `source` and nothing else.
    pub fn malformed(source: impl Into<String>) -> Self {
        Self {
            type_id: String::new(),
            label: None,
            attributes: Attributes::new(),
            source: source.into(),
            malformed: true,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.set(key, value);
        self
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label(&mut self, label: Option<String>) {
        self.label = label;
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        &mut self.attributes
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }

    /// The exact text this spec was parsed from. Empty for specs built in code.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_malformed(&self) -> bool {
        self.malformed
    }

    /// The text between the delimiters, or the type id for specs built in code.
    pub fn body(&self) -> &str {
        self.source
            .strip_prefix(PLACEHOLDER_OPEN)
            .and_then(|s| s.strip_suffix(PLACEHOLDER_CLOSE))
            .unwrap_or(&self.type_id)
    }
}

/// A piece of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(FieldSpec),
}

impl Segment {
    /// The original text this segment covers.
    pub fn source(&self) -> &str {
        match self {
            Segment::Literal(text) => text,
            Segment::Placeholder(spec) => spec.source(),
        }
    }
}

/// Splits `text` into literal runs and placeholders, in order.
///
/// Concatenating the [`Segment::source`] of every segment yields `text` again.
pub fn parse(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find(PLACEHOLDER_CLOSE) {
        let close = cursor + rel;
        let end = close + PLACEHOLDER_CLOSE.len();
        cursor = end;

        // The nearest opening delimiter wins: "{{ {{a}}" holds one placeholder, "{{a}}".
        let Some(open_rel) = text[literal_start..close].rfind(PLACEHOLDER_OPEN) else {
            continue;
        };
        let open = literal_start + open_rel;
        let source = &text[open..end];
        if source.contains('\n') {
            continue;
        }

        if open > literal_start {
            segments.push(Segment::Literal(text[literal_start..open].to_string()));
        }
        segments.push(Segment::Placeholder(parse_placeholder(source)));
        literal_start = end;
    }

    if literal_start < text.len() {
        segments.push(Segment::Literal(text[literal_start..].to_string()));
    }
    segments
}

/// Parses `text` when it consists of exactly one placeholder and nothing else.
pub fn parse_one(text: &str) -> Option<FieldSpec> {
    let mut segments = parse(text);
    match (segments.pop(), segments.is_empty()) {
        (Some(Segment::Placeholder(spec)), true) => Some(spec),
        _ => None,
    }
}

/// Writes the canonical placeholder text for `spec`.
///
/// Malformed specs are written back verbatim.
pub fn serialize(spec: &FieldSpec) -> String {
    if spec.malformed {
        return spec.source.clone();
    }

    let mut out = String::with_capacity(spec.type_id.len() + 16);
    out.push_str(PLACEHOLDER_OPEN);
    out.push_str(&spec.type_id);
    if let Some(label) = &spec.label {
        out.push('|');
        out.push_str(&escape_with(label, LABEL_RESERVED));
    }
    for (i, (key, value)) in spec.attributes.iter().enumerate() {
        out.push(if i == 0 { ':' } else { ',' });
        out.push_str(key);
        out.push('=');
        out.push_str(&escape(value));
    }
    out.push_str(PLACEHOLDER_CLOSE);
    out
}

/// Rebuilds a document from parsed segments.
pub fn serialize_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => text.clone(),
            Segment::Placeholder(spec) => serialize(spec),
        })
        .collect()
}

/// Returns true if `text` contains at least one placeholder.
pub fn is_dynamic(text: &str) -> bool {
    placeholder_count(text) > 0
}

pub fn placeholder_count(text: &str) -> usize {
    if !text.contains(PLACEHOLDER_OPEN) {
        return 0;
    }
    parse(text)
        .iter()
        .filter(|s| matches!(s, Segment::Placeholder(_)))
        .count()
}

/// Percent-escapes the characters reserved in attribute values.
pub fn escape(value: &str) -> String {
    escape_with(value, VALUE_RESERVED)
}

/// Reverses [`escape`]. Returns `None` for a `%` not followed by two hex digits or for
/// escapes that do not decode to UTF-8.
pub fn unescape(value: &str) -> Option<String> {
    if !value.contains('%') {
        return Some(value.to_string());
    }
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = value.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn escape_with(value: &str, reserved: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if reserved.contains(&c) {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// Unescapes `raw` only if escaping the result gives `raw` back.
fn unescape_canonical(raw: &str, reserved: &[char]) -> Option<String> {
    let value = unescape(raw)?;
    (escape_with(&value, reserved) == raw).then_some(value)
}

fn is_ident(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn parse_placeholder(source: &str) -> FieldSpec {
    let body = &source[PLACEHOLDER_OPEN.len()..source.len() - PLACEHOLDER_CLOSE.len()];
    match parse_body(body) {
        Some((type_id, label, attributes)) => FieldSpec {
            type_id,
            label,
            attributes,
            source: source.to_string(),
            malformed: false,
        },
        None => FieldSpec::malformed(source),
    }
}

fn parse_body(body: &str) -> Option<(String, Option<String>, Attributes)> {
    let head_end = body.find(['|', ':']).unwrap_or(body.len());
    let type_id = &body[..head_end];
    if !is_ident(type_id) {
        return None;
    }

    let mut rest = &body[head_end..];
    let mut label = None;
    if let Some(after_bar) = rest.strip_prefix('|') {
        let label_end = after_bar.find(':').unwrap_or(after_bar.len());
        label = Some(unescape_canonical(&after_bar[..label_end], LABEL_RESERVED)?);
        rest = &after_bar[label_end..];
    }

    let mut attributes = Attributes::new();
    if let Some(list) = rest.strip_prefix(':') {
        for attr in list.split(',') {
            let (key, value) = attr.split_once('=')?;
            if !is_ident(key) || attributes.contains(key) {
                return None;
            }
            attributes.set(key, unescape_canonical(value, VALUE_RESERVED)?);
        }
    } else if !rest.is_empty() {
        return None;
    }

    Some((type_id.to_string(), label, attributes))
}
