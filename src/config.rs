use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::info;

use crate::domain::CasingCategory;
use crate::error::{NormalizerError, Result};
use crate::pipeline::canonicalize::{fold_key, fold_token, fold_word};

/// Minor function words kept lower-case under action-phrase casing.
/// Stored pre-folded (lower-case, diacritics flattened).
static BUILT_IN_MINOR_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "de", "des", "du", "la", "le", "les", "a", "aux", "et", "ou", "d'", "l'", "un", "une",
        "pour", "avec", "sans", "sur", "dans", "en", "par",
    ]
    .into_iter()
    .collect()
});

/// Idiomatically plural terms that must not lose their trailing marker.
/// Stored pre-folded.
static BUILT_IN_PLURAL_EXCEPTIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "donnees",
        "ressources",
        "humaines",
        "affaires",
        "ventes",
        "achats",
        "relations",
        "publiques",
        "reseaux",
        "sociaux",
        "temps",
        "processus",
        "pandas",
        "kubernetes",
        "devops",
    ]
    .into_iter()
    .collect()
});

/// One alias table entry as written in the TOML file: a canonical display
/// form plus the raw variants that should resolve to it.
#[derive(Debug, Clone, Deserialize)]
pub struct AliasEntryConfig {
    pub canonical: String,
    #[serde(default)]
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MorphologyConfig {
    /// Additional idiomatically plural terms, merged with the built-in list
    #[serde(default)]
    pub plural_exceptions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CasingConfig {
    /// Overrides the built-in minor word list when non-empty
    #[serde(default)]
    pub minor_words: Vec<String>,
}

/// On-disk shape of the alias table. Parsed once, then compiled into a
/// frozen [`AliasTable`] before any normalization run starts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AliasTableConfig {
    #[serde(default)]
    pub acronyms: Vec<AliasEntryConfig>,
    #[serde(default)]
    pub phrases: Vec<AliasEntryConfig>,
    #[serde(default)]
    pub morphology: MorphologyConfig,
    #[serde(default)]
    pub casing: CasingConfig,
}

impl AliasTableConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            NormalizerError::Config(format!(
                "failed to read alias table '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: AliasTableConfig = toml::from_str(&content)?;
        info!(
            acronyms = config.acronyms.len(),
            phrases = config.phrases.len(),
            "Alias table configuration loaded"
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Compile into the frozen lookup used at run time. Fails when a variant
    /// key would map to two different canonical forms.
    pub fn compile(self) -> Result<AliasTable> {
        let mut entries: Vec<AliasEntry> = Vec::new();
        let mut lookup: HashMap<String, usize> = HashMap::new();

        let categorized = self
            .acronyms
            .into_iter()
            .map(|e| (e, CasingCategory::ProperNoun))
            .chain(
                self.phrases
                    .into_iter()
                    .map(|e| (e, CasingCategory::ActionPhrase)),
            );

        for (entry, category) in categorized {
            let display = entry.canonical.trim().to_string();
            if display.is_empty() {
                return Err(NormalizerError::Config(
                    "alias entry has an empty canonical form".to_string(),
                ));
            }
            let key = fold_key(&display);
            if key.is_empty() {
                return Err(NormalizerError::Config(format!(
                    "canonical form '{}' folds to an empty comparison key",
                    display
                )));
            }

            let index = entries.len();
            entries.push(AliasEntry {
                display: display.clone(),
                category,
                key: key.clone(),
            });
            insert_key(&mut lookup, &entries, key, index)?;

            for variant in &entry.variants {
                let variant_key = fold_key(variant);
                if variant_key.is_empty() {
                    return Err(NormalizerError::Config(format!(
                        "variant '{}' of '{}' folds to an empty comparison key",
                        variant, display
                    )));
                }
                insert_key(&mut lookup, &entries, variant_key, index)?;
            }
        }

        let mut plural_exceptions: HashSet<String> = BUILT_IN_PLURAL_EXCEPTIONS
            .iter()
            .map(|s| s.to_string())
            .collect();
        // Exceptions are checked token by token, so multi-word entries
        // contribute each of their words
        plural_exceptions.extend(
            self.morphology
                .plural_exceptions
                .iter()
                .flat_map(|w| w.split_whitespace())
                .map(fold_token),
        );

        let minor_words: HashSet<String> = if self.casing.minor_words.is_empty() {
            BUILT_IN_MINOR_WORDS.iter().map(|s| s.to_string()).collect()
        } else {
            self.casing.minor_words.iter().map(|w| fold_word(w)).collect()
        };

        Ok(AliasTable {
            entries,
            lookup,
            plural_exceptions,
            minor_words,
        })
    }
}

fn insert_key(
    lookup: &mut HashMap<String, usize>,
    entries: &[AliasEntry],
    key: String,
    index: usize,
) -> Result<()> {
    if let Some(&existing) = lookup.get(&key) {
        if existing != index {
            return Err(NormalizerError::Config(format!(
                "variant key '{}' maps to both '{}' and '{}'",
                key, entries[existing].display, entries[index].display
            )));
        }
        return Ok(());
    }
    lookup.insert(key, index);
    Ok(())
}

/// A compiled alias entry: the canonical display form, its casing category,
/// and the comparison key shared by every variant.
#[derive(Debug, Clone)]
pub struct AliasEntry {
    pub display: String,
    pub category: CasingCategory,
    pub key: String,
}

/// The frozen alias table shared read-only across normalization runs.
/// Built once via [`AliasTableConfig::compile`]; no mutation afterwards, so
/// concurrent use needs no locking.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: Vec<AliasEntry>,
    lookup: HashMap<String, usize>,
    plural_exceptions: HashSet<String>,
    minor_words: HashSet<String>,
}

impl AliasTable {
    /// Resolve a folded comparison key to its alias entry, if known.
    pub fn resolve(&self, key: &str) -> Option<&AliasEntry> {
        self.lookup.get(key).map(|&index| &self.entries[index])
    }

    pub fn is_plural_exception(&self, folded_token: &str) -> bool {
        self.plural_exceptions.contains(folded_token)
    }

    /// Check a display word against the minor word list, including elided
    /// prefixes such as "d'" and "l'".
    pub fn is_minor_word(&self, word: &str) -> bool {
        let folded = fold_word(word);
        if self.minor_words.contains(folded.as_str()) {
            return true;
        }
        self.minor_words
            .iter()
            .any(|m| m.ends_with('\'') && folded.starts_with(m.as_str()))
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn variant_key_count(&self) -> usize {
        self.lookup.len()
    }

    /// (proper noun entries, action phrase entries)
    pub fn category_counts(&self) -> (usize, usize) {
        let proper = self
            .entries
            .iter()
            .filter(|e| e.category == CasingCategory::ProperNoun)
            .count();
        (proper, self.entries.len() - proper)
    }

    /// An empty table; every term falls back to best-effort canonicalization.
    pub fn empty() -> Self {
        AliasTableConfig::default()
            .compile()
            .expect("empty alias table always compiles")
    }
}
