//! Conversation history.
//!
//! Every conversation is stored in a single JSON array at
//! `$XDG_DATA_HOME/percent/history.json` (or `~/.local/share/percent/`),
//! newest first. Updates are an unlocked read-modify-write; two processes
//! saving at once may lose one of the writes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::base_dir;
use crate::error::{Error, Result};
use crate::types::{ChatMessage, Conversation};

const HISTORY_FILE: &str = "history.json";

/// Returns the directory holding percent's history file.
pub fn data_dir() -> Option<PathBuf> {
    base_dir(std::env::var_os("XDG_DATA_HOME"), ".local/share")
}

/// Reads and writes the history file at a fixed path.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Creates a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at the default location.
    pub fn from_env() -> Result<Self> {
        let dir = data_dir()
            .ok_or_else(|| Error::io("cannot locate home directory", io::ErrorKind::NotFound.into()))?;
        Ok(Self::new(dir.join(HISTORY_FILE)))
    }

    /// The file this store reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all conversations; a missing or unparsable file is empty history.
    pub fn load(&self) -> Vec<Conversation> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %err, "cannot read history");
                }
                return Vec::new();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|err| {
            tracing::warn!(path = %self.path.display(), error = %err, "ignoring malformed history");
            Vec::new()
        })
    }

    /// Replaces the history file with `conversations`.
    pub fn save(&self, conversations: &[Conversation]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(conversations)?)?;
        Ok(())
    }

    /// Replaces the conversation with the same id, or inserts it first.
    pub fn upsert(&self, conversation: &Conversation) -> Result<()> {
        let mut all = self.load();
        match all.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation.clone(),
            None => all.insert(0, conversation.clone()),
        }
        self.save(&all)?;
        tracing::debug!(id = %conversation.id, total = all.len(), "history updated");
        Ok(())
    }

    /// Removes every stored conversation.
    pub fn clear(&self) -> Result<()> {
        self.save(&[])
    }
}

/// Begins a new, empty conversation for `model`.
pub fn start_conversation(model: impl Into<String>) -> Conversation {
    Conversation::new(model)
}

/// Appends `message` to `conversation`.
pub fn append_message(conversation: &mut Conversation, message: ChatMessage) {
    conversation.push(message);
}

/// Stores `conversation` in the default history file.
pub fn upsert_conversation(conversation: &Conversation) -> Result<()> {
    HistoryStore::from_env()?.upsert(conversation)
}

/// Empties the default history file.
pub fn clear_history() -> Result<()> {
    HistoryStore::from_env()?.clear()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join("percent").join(HISTORY_FILE))
    }

    #[test]
    fn empty_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store(&dir).load().is_empty());
    }

    #[test]
    fn upsert_inserts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let first = start_conversation("a/one");
        let second = start_conversation("b/two");
        store.upsert(&first).unwrap();
        store.upsert(&second).unwrap();

        let all = store.load();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[test]
    fn upsert_replaces_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let other = start_conversation("m");
        let mut convo = start_conversation("m");
        store.upsert(&convo).unwrap();
        store.upsert(&other).unwrap();

        append_message(&mut convo, ChatMessage::user("hello"));
        append_message(&mut convo, ChatMessage::assistant("hi"));
        store.upsert(&convo).unwrap();

        let all = store.load();
        assert_eq!(all.len(), 2);
        // Replacement keeps the original position.
        assert_eq!(all[0].id, other.id);
        assert_eq!(all[1].messages.len(), 2);
    }

    #[test]
    fn clear_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.upsert(&start_conversation("m")).unwrap();
        store.clear().unwrap();
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[]");
        assert!(store.load().is_empty());
    }

    #[test]
    fn malformed_history_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{\"oops\":").unwrap();
        assert!(store.load().is_empty());
    }
}
