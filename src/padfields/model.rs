use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    // Kept in metadata so notes list without reading content files
    pub title: String,
    /// Whether snippet placeholders pointing at this note may expand its own fields.
    #[serde(default = "default_expand_allowed")]
    pub expand_allowed: bool,
}

fn default_expand_allowed() -> bool {
    true
}

impl NoteMetadata {
    pub fn new(title: String) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title)
    }

    pub fn with_id(id: String, title: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            title,
            expand_allowed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub metadata: NoteMetadata,
    pub content: String,
}

impl Note {
    pub fn new(title: String, content: String) -> Self {
        Self {
            metadata: NoteMetadata::new(title),
            content,
        }
    }

    pub fn with_id(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            metadata: NoteMetadata::with_id(id.into(), title.into()),
            content: content.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }
}

/// A note as seen by snippet placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub id: String,
    pub text: String,
    pub expand_allowed: bool,
}

impl From<Note> for StoredNote {
    fn from(note: Note) -> Self {
        Self {
            id: note.metadata.id,
            text: note.content,
            expand_allowed: note.metadata.expand_allowed,
        }
    }
}
