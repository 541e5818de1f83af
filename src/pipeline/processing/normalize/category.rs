use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::DEFAULT_CATEGORY_ALIASES;
use crate::error::Result;
use crate::pipeline::utils::StringUtils;

/// How a raw category string was resolved
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryMatch {
    /// The folded text is a known alias
    Exact(String),
    /// A known alias appears as a phrase inside the text
    Contained(String),
    /// Closest alias above the similarity floor
    Fuzzy { canonical: String, alias: String, score: f64 },
    Unknown,
}

impl CategoryMatch {
    pub fn canonical(&self) -> Option<&str> {
        match self {
            CategoryMatch::Exact(c) | CategoryMatch::Contained(c) => Some(c),
            CategoryMatch::Fuzzy { canonical, .. } => Some(canonical),
            CategoryMatch::Unknown => None,
        }
    }
}

/// Category synonyms, folded alias -> canonical name.
///
/// Passed explicitly to the normalizer. Learning happens through
/// [`CategoryKnowledgeBase::learn`] and persistence through `load`/`save`,
/// so a run never mutates shared state behind the caller's back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryKnowledgeBase {
    aliases: BTreeMap<String, String>,
}

impl Default for CategoryKnowledgeBase {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn digits(folded: &str) -> String {
    folded.chars().filter(|c| c.is_ascii_digit()).collect()
}

impl CategoryKnowledgeBase {
    pub fn empty() -> Self {
        Self { aliases: BTreeMap::new() }
    }

    /// Built-in motorsport categories
    pub fn with_defaults() -> Self {
        let mut kb = Self::empty();
        for (canonical, aliases) in DEFAULT_CATEGORY_ALIASES {
            kb.learn(canonical, canonical);
            for alias in *aliases {
                kb.learn(alias, canonical);
            }
        }
        kb
    }

    /// Built-in categories plus whatever was saved at `path`. A missing file
    /// is not an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut kb = Self::with_defaults();
        if !path.exists() {
            debug!(path = %path.display(), "No learned categories file, using defaults");
            return Ok(kb);
        }
        let content = fs::read_to_string(path)?;
        let stored: CategoryKnowledgeBase = serde_json::from_str(&content)?;
        let count = stored.aliases.len();
        kb.aliases.extend(stored.aliases);
        info!(path = %path.display(), aliases = count, "Loaded category aliases");
        Ok(kb)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Record `alias` as a spelling of `canonical`. Returns whether the alias
    /// was new.
    pub fn learn(&mut self, alias: &str, canonical: &str) -> bool {
        let folded = StringUtils::fold(alias);
        if folded.is_empty() || self.aliases.contains_key(&folded) {
            return false;
        }
        self.aliases.insert(folded, canonical.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn canonicals(&self) -> BTreeSet<&str> {
        self.aliases.values().map(String::as_str).collect()
    }

    /// Resolve raw category text.
    ///
    /// Exact alias first, then the longest alias contained as a phrase, then
    /// the most similar alias scoring at least `min_similarity`. A fuzzy
    /// candidate whose digits differ is skipped, so "Formula 4" never lands
    /// on "Formula 1".
    pub fn resolve(&self, raw: &str, min_similarity: f64) -> CategoryMatch {
        let folded = StringUtils::fold(raw);
        if folded.is_empty() {
            return CategoryMatch::Unknown;
        }
        if let Some(canonical) = self.aliases.get(&folded) {
            return CategoryMatch::Exact(canonical.clone());
        }

        let padded = format!(" {} ", folded);
        let contained = self
            .aliases
            .iter()
            .filter(|(alias, _)| padded.contains(&format!(" {} ", alias)))
            .max_by_key(|(alias, _)| alias.len());
        if let Some((_, canonical)) = contained {
            return CategoryMatch::Contained(canonical.clone());
        }

        let wanted_digits = digits(&folded);
        let mut best: Option<(&String, &String, f64)> = None;
        for (alias, canonical) in &self.aliases {
            if digits(alias) != wanted_digits {
                continue;
            }
            let score = StringUtils::folded_similarity(&folded, alias);
            if best.map_or(true, |(_, _, top)| score > top) {
                best = Some((alias, canonical, score));
            }
        }
        match best {
            Some((alias, canonical, score)) if score >= min_similarity => CategoryMatch::Fuzzy {
                canonical: canonical.clone(),
                alias: alias.clone(),
                score,
            },
            _ => CategoryMatch::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_aliases() {
        let kb = CategoryKnowledgeBase::with_defaults();
        assert_eq!(kb.resolve("Fórmula 1", 0.8), CategoryMatch::Exact("Formula 1".into()));
        assert_eq!(kb.resolve("F1", 0.8), CategoryMatch::Exact("Formula 1".into()));
        assert_eq!(kb.resolve("MotoGP", 0.8).canonical(), Some("MotoGP"));
    }

    #[test]
    fn test_contained_alias_prefers_longest() {
        let kb = CategoryKnowledgeBase::with_defaults();
        assert_eq!(kb.resolve("F1 Academy - Race 2", 0.8).canonical(), Some("F1 Academy"));
        assert_eq!(kb.resolve("Stock Car Pro Series 2025", 0.8).canonical(), Some("Stock Car"));
    }

    #[test]
    fn test_fuzzy_respects_digits() {
        let kb = CategoryKnowledgeBase::with_defaults();
        match kb.resolve("Formulaa 1", 0.8) {
            CategoryMatch::Fuzzy { canonical, .. } => assert_eq!(canonical, "Formula 1"),
            other => panic!("expected fuzzy match, got {:?}", other),
        }
        assert_eq!(kb.resolve("Formula 4", 0.8), CategoryMatch::Unknown);
        assert_eq!(kb.resolve("Curling", 0.8), CategoryMatch::Unknown);
        assert_eq!(kb.resolve("", 0.8), CategoryMatch::Unknown);
    }

    #[test]
    fn test_learn_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("categories.json");

        let mut kb = CategoryKnowledgeBase::with_defaults();
        assert!(kb.learn("Fórmula Um", "Formula 1"));
        assert!(!kb.learn("formula um", "Formula 1"));
        kb.save(&path).unwrap();

        let loaded = CategoryKnowledgeBase::load(&path).unwrap();
        assert_eq!(loaded.resolve("Formula Um", 0.8), CategoryMatch::Exact("Formula 1".into()));
        assert_eq!(loaded, kb);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let kb = CategoryKnowledgeBase::load(dir.path().join("none.json")).unwrap();
        assert_eq!(kb, CategoryKnowledgeBase::with_defaults());
    }
}
