use super::{is_valid_id, sort_oldest_first, NoteStore};
use crate::error::{FieldsError, Result};
use crate::model::{Note, NoteMetadata};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const DATA_FILENAME: &str = "data.json";

pub struct FileNoteStore {
    root: PathBuf,
}

impl FileNoteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn note_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("note-{}.txt", id))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(FieldsError::Io)?;
        }
        Ok(())
    }

    fn load_metadata(&self) -> Result<HashMap<String, NoteMetadata>> {
        let data_file = self.root.join(DATA_FILENAME);
        if !data_file.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(data_file).map_err(FieldsError::Io)?;
        let meta: HashMap<String, NoteMetadata> =
            serde_json::from_str(&content).map_err(FieldsError::Serialization)?;
        Ok(meta)
    }

    fn save_metadata(&self, meta: &HashMap<String, NoteMetadata>) -> Result<()> {
        let content = serde_json::to_string_pretty(meta).map_err(FieldsError::Serialization)?;
        fs::write(self.root.join(DATA_FILENAME), content).map_err(FieldsError::Io)?;
        Ok(())
    }

    fn read_content(&self, id: &str) -> Result<String> {
        let path = self.note_path(id);
        if path.exists() {
            fs::read_to_string(path).map_err(FieldsError::Io)
        } else {
            Ok(String::new())
        }
    }
}

impl NoteStore for FileNoteStore {
    fn save_note(&mut self, note: &Note) -> Result<()> {
        if !is_valid_id(note.id()) {
            return Err(FieldsError::Store(format!("Invalid note id: {}", note.id())));
        }
        self.ensure_dir()?;

        // 1. Update metadata index
        let mut meta_map = self.load_metadata()?;
        meta_map.insert(note.metadata.id.clone(), note.metadata.clone());
        self.save_metadata(&meta_map)?;

        // 2. Write content
        fs::write(self.note_path(note.id()), &note.content).map_err(FieldsError::Io)?;
        Ok(())
    }

    fn find_note(&self, id: &str) -> Result<Option<Note>> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let mut meta_map = self.load_metadata()?;
        let Some(metadata) = meta_map.remove(id) else {
            return Ok(None);
        };
        let content = self.read_content(id)?;
        Ok(Some(Note { metadata, content }))
    }

    fn list_notes(&self) -> Result<Vec<Note>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut notes = Vec::new();
        for (id, metadata) in self.load_metadata()? {
            let content = self.read_content(&id)?;
            notes.push(Note { metadata, content });
        }
        sort_oldest_first(&mut notes);
        Ok(notes)
    }

    fn delete_note(&mut self, id: &str) -> Result<()> {
        let mut meta_map = self.load_metadata()?;
        if meta_map.remove(id).is_none() {
            return Err(FieldsError::NoteNotFound(id.to_string()));
        }
        self.save_metadata(&meta_map)?;

        let path = self.note_path(id);
        if path.exists() {
            fs::remove_file(path).map_err(FieldsError::Io)?;
        }
        Ok(())
    }
}
