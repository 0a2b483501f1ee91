// Pattern library - saved-pattern persistence, export and validated import

use super::LedPattern;
use crate::storage::KvStore;
use log::warn;
use serde_json::Value;

/// Storage key the saved-pattern collection lives under
pub const PATTERN_STORAGE_KEY: &str = "saved-patterns";

#[derive(Debug, thiserror::Error)]
pub enum PatternImportError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("import payload is not an array of patterns")]
    NotAnArray,
}

/// What an import produced: the accepted patterns plus how many entries
/// failed validation
#[derive(Debug)]
pub struct ImportOutcome {
    pub patterns: Vec<LedPattern>,
    pub rejected: usize,
}

/// Saved-pattern collection persisted as one JSON document in a [`KvStore`]
pub struct PatternLibrary<S: KvStore> {
    store: S,
}

impl<S: KvStore> PatternLibrary<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// All saved patterns. Missing or malformed storage yields an empty
    /// collection so a corrupt document never takes the library down.
    pub fn load(&self) -> Vec<LedPattern> {
        let Some(raw) = self.store.get(PATTERN_STORAGE_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(patterns) => patterns,
            Err(e) => {
                warn!("discarding malformed pattern collection: {}", e);
                Vec::new()
            }
        }
    }

    fn persist(&mut self, patterns: &[LedPattern]) {
        match serde_json::to_string(patterns) {
            Ok(json) => self.store.set(PATTERN_STORAGE_KEY, json),
            Err(e) => warn!("failed to serialize pattern collection: {}", e),
        }
    }

    /// Insert or replace a pattern, matched by id
    pub fn save_pattern(&mut self, pattern: LedPattern) {
        let mut patterns = self.load();
        match patterns.iter_mut().find(|p| p.id == pattern.id) {
            Some(existing) => *existing = pattern,
            None => patterns.push(pattern),
        }
        self.persist(&patterns);
    }

    /// Remove a pattern by id; returns whether one was removed
    pub fn delete_pattern(&mut self, id: &str) -> bool {
        let mut patterns = self.load();
        let before = patterns.len();
        patterns.retain(|p| p.id != id);
        let removed = patterns.len() != before;
        if removed {
            self.persist(&patterns);
        }
        removed
    }

    pub fn get_pattern(&self, id: &str) -> Option<LedPattern> {
        self.load().into_iter().find(|p| p.id == id)
    }

    pub fn clear_all(&mut self) {
        self.store.remove(PATTERN_STORAGE_KEY);
    }

    /// The whole collection as pretty-printed JSON, for file export
    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(&self.load()).unwrap_or_else(|_| "[]".to_string())
    }

    /// Parse an exported JSON document, keeping only entries that carry a
    /// non-empty string id and name plus a frames array. Invalid entries are
    /// counted, not fatal.
    pub fn parse_import(payload: &str) -> Result<ImportOutcome, PatternImportError> {
        let value: Value = serde_json::from_str(payload)?;
        let Value::Array(entries) = value else {
            return Err(PatternImportError::NotAnArray);
        };

        let mut patterns = Vec::new();
        let mut rejected = 0;
        for entry in entries {
            if !looks_like_pattern(&entry) {
                rejected += 1;
                continue;
            }
            match serde_json::from_value::<LedPattern>(entry) {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => {
                    warn!("rejecting pattern entry: {}", e);
                    rejected += 1;
                }
            }
        }

        Ok(ImportOutcome { patterns, rejected })
    }

    /// Import patterns from an exported document, merging by id (imported
    /// entries replace same-id saved ones)
    pub fn import_json(&mut self, payload: &str) -> Result<ImportOutcome, PatternImportError> {
        let outcome = Self::parse_import(payload)?;
        for pattern in &outcome.patterns {
            self.save_pattern(pattern.clone());
        }
        Ok(outcome)
    }
}

fn looks_like_pattern(entry: &Value) -> bool {
    let has_id = entry
        .get("id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());
    let has_name = entry
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.is_empty());
    let has_frames = entry.get("frames").is_some_and(Value::is_array);
    has_id && has_name && has_frames
}
