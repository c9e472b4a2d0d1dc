//! # Padfields Architecture
//!
//! Padfields expands **dynamic fields** embedded in plain text notes: placeholders such as
//! `{{formtext|Name:id=1}}`, `{{datetime}}` or `{{snippet:ref=<note id>}}` that are
//! replaced by user input, computed values, or the (recursively expanded) text of
//! another note.
//!
//! It is a library that happens to have a CLI client, not the other way around.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs, print.rs)                           │
//! │  - Reads input, applies --set values, prints, exits         │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Engine (engine.rs)                                         │
//! │  - parse → build fields → merge session → resolve → render  │
//! │  - Recurses into snippets, one level per hop, up to a cap   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Registry (registry.rs) + Fields (fields/)                  │
//! │  - type id → constructor / attribute writer                 │
//! │  - Closed set of field variants, each owning its state      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Codec (codec.rs)                                           │
//! │  - Text ⇄ literal segments and placeholder specs            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything a field needs from the outside world (notes, clipboard, device facts,
//! randomness, the clock, limits) arrives through the traits in [`context`], so the
//! core never touches global state and tests can pin every input.
//!
//! ## Failure model
//!
//! Expanding text never fails. Placeholders the registry does not understand stay in
//! the output verbatim, a field that cannot compute its value renders as having none,
//! and snippet chains stop expanding at the configured depth. Problems are reported
//! through `tracing` at `debug`/`warn`. The only error the core returns on its own is a
//! duplicate type registration.
//!
//! ## Module Overview
//!
//! - [`codec`]: Placeholder grammar, parsing and canonical serialization
//! - [`fields`]: Field variants and their resolution rules
//! - [`registry`]: Type id → field constructor dispatch
//! - [`engine`]: Text expansion
//! - [`context`]: Per-call config, collaborator traits and their default implementations
//! - [`config`]: Persisted settings
//! - [`model`]: Notes
//! - [`store`]: Note storage (file and in-memory)
//! - [`clipboard`]: Cross-platform clipboard support
//! - [`error`]: Error types

pub mod clipboard;
pub mod codec;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod fields;
pub mod model;
pub mod registry;
pub mod store;

pub use codec::{FieldSpec, Segment};
pub use context::{DynamicValueConfig, ExpansionContext, ProcessingMode};
pub use engine::{Engine, FormField};
pub use error::{FieldsError, Result};
pub use fields::Field;
pub use registry::FieldRegistry;
