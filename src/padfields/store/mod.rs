//! # Note storage
//!
//! Snippet placeholders point at stored notes by id. The engine only needs to look notes
//! up ([`SnippetLookup`]); the CLI also needs to add and list them. [`NoteStore`] covers
//! both, and every `NoteStore` is a `SnippetLookup` for free.
//!
//! ## Implementations
//!
//! - [`fs::FileNoteStore`]: metadata in `data.json`, content in `note-{id}.txt`
//! - [`memory::InMemoryNoteStore`]: no persistence, for tests
//!
//! ```text
//! <notes dir>/
//! ├── data.json        # Metadata for all notes, keyed by id
//! ├── note-{id}.txt    # Note content
//! └── config.json      # FieldsConfig
//! ```

use crate::context::SnippetLookup;
use crate::error::{FieldsError, Result};
use crate::model::{Note, StoredNote};

pub mod fs;
pub mod memory;

pub trait NoteStore: Send + Sync {
    /// Save a note (create or update)
    fn save_note(&mut self, note: &Note) -> Result<()>;

    /// Get a note by id, if it exists
    fn find_note(&self, id: &str) -> Result<Option<Note>>;

    fn get_note(&self, id: &str) -> Result<Note> {
        self.find_note(id)?
            .ok_or_else(|| FieldsError::NoteNotFound(id.to_string()))
    }

    /// All notes, oldest first
    fn list_notes(&self) -> Result<Vec<Note>>;

    fn delete_note(&mut self, id: &str) -> Result<()>;
}

impl<S: NoteStore> SnippetLookup for S {
    fn find_by_id(&self, id: &str) -> Result<Option<StoredNote>> {
        Ok(self.find_note(id)?.map(StoredNote::from))
    }
}

/// Note ids end up in file names, so only plain identifiers are accepted.
pub(crate) fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
}

pub(crate) fn sort_oldest_first(notes: &mut [Note]) {
    notes.sort_by(|a, b| {
        a.metadata
            .created_at
            .cmp(&b.metadata.created_at)
            .then_with(|| a.metadata.id.cmp(&b.metadata.id))
    });
}
