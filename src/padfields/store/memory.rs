use super::{sort_oldest_first, NoteStore};
use crate::error::{FieldsError, Result};
use crate::model::Note;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct InMemoryNoteStore {
    notes: HashMap<String, Note>,
}

impl InMemoryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used by tests: adds a note with a fixed id.
    pub fn with_note(mut self, id: &str, title: &str, content: &str) -> Self {
        self.notes
            .insert(id.to_string(), Note::with_id(id, title, content));
        self
    }

    /// Adds a note whose fields are inserted verbatim when used as a snippet.
    pub fn with_raw_note(mut self, id: &str, title: &str, content: &str) -> Self {
        let mut note = Note::with_id(id, title, content);
        note.metadata.expand_allowed = false;
        self.notes.insert(id.to_string(), note);
        self
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl NoteStore for InMemoryNoteStore {
    fn save_note(&mut self, note: &Note) -> Result<()> {
        self.notes.insert(note.metadata.id.clone(), note.clone());
        Ok(())
    }

    fn find_note(&self, id: &str) -> Result<Option<Note>> {
        Ok(self.notes.get(id).cloned())
    }

    fn list_notes(&self) -> Result<Vec<Note>> {
        let mut notes: Vec<Note> = self.notes.values().cloned().collect();
        sort_oldest_first(&mut notes);
        Ok(notes)
    }

    fn delete_note(&mut self, id: &str) -> Result<()> {
        self.notes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| FieldsError::NoteNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_notes_are_findable() {
        let store = InMemoryNoteStore::new()
            .with_note("a", "A", "first")
            .with_raw_note("b", "B", "second");
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_note("a").unwrap().content, "first");
        assert!(!store.get_note("b").unwrap().metadata.expand_allowed);
    }

    #[test]
    fn delete_missing_note_fails() {
        let mut store = InMemoryNoteStore::new();
        assert!(matches!(
            store.delete_note("nope"),
            Err(FieldsError::NoteNotFound(id)) if id == "nope"
        ));
    }
}
