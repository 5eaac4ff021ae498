use crate::deobfuscate::classifier::CategoryScore;
use crate::token::{Category, TokenForms};
use rustc_hash::FxHashMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingEntry {
    pub raw: String,
    pub forms: TokenForms,
    pub category: Category,
    pub name: String,
    pub confidence: f64,
    pub occurrences: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded_hint: Option<String>,
    pub scores: Vec<CategoryScore>,
}

/// Token -> (category, generated name). Each raw token is written once.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    entries: Vec<MappingEntry>,
    index: FxHashMap<String, usize>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and leaves the table untouched if `raw` is already mapped.
    pub fn insert(&mut self, entry: MappingEntry) -> bool {
        if self.index.contains_key(&entry.raw) {
            return false;
        }
        self.index.insert(entry.raw.clone(), self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn get(&self, raw: &str) -> Option<&MappingEntry> {
        self.index.get(raw).map(|&i| &self.entries[i])
    }

    pub fn name_of(&self, raw: &str) -> Option<&str> {
        self.get(raw).map(|e| e.name.as_str())
    }

    /// Insertion (first-seen) order.
    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sorted_by_raw(&self) -> Vec<&MappingEntry> {
        let mut sorted: Vec<&MappingEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.raw.cmp(&b.raw));
        sorted
    }

    pub fn count_in(&self, category: Category) -> usize {
        self.entries.iter().filter(|e| e.category == category).count()
    }
}
