use crate::config::{AliasEntry, AliasTable};
use crate::domain::CasingCategory;

/// The result of canonicalizing one raw skill string: the comparison key
/// that determines group membership, and the human-facing display form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonicalization {
    /// Lower-cased, alias-resolved, morphologically-stripped comparison key
    pub key: String,
    /// Display form under the casing policy for the resolved category
    pub display: String,
    pub category: CasingCategory,
    /// True when the alias table resolved this term
    pub aliased: bool,
}

impl Canonicalization {
    fn from_entry(entry: &AliasEntry) -> Self {
        Self {
            key: entry.key.clone(),
            display: entry.display.clone(),
            category: entry.category,
            aliased: true,
        }
    }
}

/// Maps raw skill strings to comparison keys and display forms.
///
/// Deterministic by construction: the alias table is frozen before any run
/// starts and nothing here depends on iteration order or randomness.
pub struct Canonicalizer<'a> {
    table: &'a AliasTable,
}

impl<'a> Canonicalizer<'a> {
    pub fn new(table: &'a AliasTable) -> Self {
        Self { table }
    }

    /// Canonicalize one raw string. Returns `None` when the text is empty
    /// after trimming (the caller counts it in diagnostics).
    ///
    /// Resolution order: exact alias lookup on the folded key, then plural
    /// folding followed by a second alias lookup, then best-effort fallback
    /// with action-phrase casing.
    pub fn canonicalize(&self, raw: &str) -> Option<Canonicalization> {
        let collapsed = collapse_whitespace(raw);
        if collapsed.is_empty() {
            return None;
        }

        let tokens: Vec<String> = collapsed
            .split(' ')
            .map(fold_token)
            .filter(|t| !t.is_empty())
            .collect();
        // Punctuation-only input folds to nothing; treat like empty input
        if tokens.is_empty() {
            return None;
        }

        let key: String = tokens.concat();
        if let Some(entry) = self.table.resolve(&key) {
            return Some(Canonicalization::from_entry(entry));
        }

        let stripped: Vec<String> = tokens.iter().map(|t| self.strip_plural(t)).collect();
        let stripped_key: String = stripped.concat();
        if stripped_key != key {
            if let Some(entry) = self.table.resolve(&stripped_key) {
                return Some(Canonicalization::from_entry(entry));
            }
        }

        Some(Canonicalization {
            key: stripped_key,
            display: self.phrase_case(&collapsed),
            category: CasingCategory::ActionPhrase,
            aliased: false,
        })
    }

    /// Strip a trailing plural marker from a folded token, guarded by the
    /// configured exception list so idiomatically plural terms survive.
    fn strip_plural(&self, token: &str) -> String {
        if token.chars().count() < 4 || self.table.is_plural_exception(token) {
            return token.to_string();
        }
        let singular_marker =
            (token.ends_with('s') && !token.ends_with("ss")) || token.ends_with('x');
        if singular_marker {
            let mut stripped = token.to_string();
            stripped.pop();
            stripped
        } else {
            token.to_string()
        }
    }

    /// Action-phrase casing: capitalize each significant word, keep minor
    /// function words lower-case (never the first word).
    pub fn phrase_case(&self, text: &str) -> String {
        text.split(' ')
            .enumerate()
            .map(|(index, word)| {
                if index > 0 && self.table.is_minor_word(word) {
                    word.to_lowercase()
                } else {
                    capitalize(word)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Trim and collapse internal whitespace runs to single spaces.
pub(crate) fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_char(c: char, out: &mut String) {
    for lc in c.to_lowercase() {
        match lc {
            'à' | 'â' | 'ä' | 'á' | 'ã' => out.push('a'),
            'é' | 'è' | 'ê' | 'ë' => out.push('e'),
            'î' | 'ï' | 'í' => out.push('i'),
            'ô' | 'ö' | 'ó' | 'õ' => out.push('o'),
            'ù' | 'û' | 'ü' | 'ú' => out.push('u'),
            'ç' => out.push('c'),
            'ÿ' => out.push('y'),
            'ñ' => out.push('n'),
            'œ' => out.push_str("oe"),
            'æ' => out.push_str("ae"),
            other => out.push(other),
        }
    }
}

/// Fold one token for comparison: lower-case, diacritics flattened,
/// punctuation dropped. "S.Q.L." and "sql" fold identically. '+' and '#'
/// survive so "C++", "C#", and "C" stay distinct skills.
pub(crate) fn fold_token(token: &str) -> String {
    let mut folded = String::with_capacity(token.len());
    for c in token.chars() {
        fold_char(c, &mut folded);
    }
    folded.retain(|c| c.is_alphanumeric() || c == '+' || c == '#');
    folded
}

/// Fold a whole phrase into a comparison key (whitespace removed).
pub(crate) fn fold_key(text: &str) -> String {
    text.split_whitespace().map(fold_token).collect()
}

/// Like `fold_token` but keeps apostrophes, for minor-word checks on
/// elided forms such as "d'équipe".
pub(crate) fn fold_word(word: &str) -> String {
    let mut folded = String::with_capacity(word.len());
    for c in word.chars() {
        if c == '\u{2019}' {
            folded.push('\'');
        } else {
            fold_char(c, &mut folded);
        }
    }
    folded.retain(|c| c.is_alphanumeric() || c == '\'');
    folded
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AliasTableConfig;

    fn test_table() -> AliasTable {
        AliasTableConfig::from_toml_str(
            r#"
[[acronyms]]
canonical = "SQL"
variants = ["s.q.l", "structured query language"]

[[acronyms]]
canonical = "Power BI"
variants = ["powerbi", "power-bi"]

[[phrases]]
canonical = "Gestion de projet"
variants = ["gestion projet", "gestion de projets"]
"#,
        )
        .unwrap()
        .compile()
        .unwrap()
    }

    #[test]
    fn test_fold_token_flattens_case_and_diacritics() {
        assert_eq!(fold_token("Réparation"), "reparation");
        assert_eq!(fold_token("S.Q.L."), "sql");
        assert_eq!(fold_token("Power-BI"), "powerbi");
    }

    #[test]
    fn test_fold_token_keeps_language_sigils() {
        assert_eq!(fold_token("C++"), "c++");
        assert_eq!(fold_token("C#"), "c#");
        assert_ne!(fold_token("C++"), fold_token("C"));
    }

    #[test]
    fn test_acronym_period_variants_resolve() {
        let table = test_table();
        let canonicalizer = Canonicalizer::new(&table);

        for raw in ["sql", "SQL", "S.Q.L."] {
            let result = canonicalizer.canonicalize(raw).unwrap();
            assert_eq!(result.display, "SQL");
            assert_eq!(result.key, "sql");
            assert!(result.aliased);
            assert_eq!(result.category, CasingCategory::ProperNoun);
        }
    }

    #[test]
    fn test_spacing_variants_share_key() {
        let table = test_table();
        let canonicalizer = Canonicalizer::new(&table);

        let spaced = canonicalizer.canonicalize("power bi").unwrap();
        let squashed = canonicalizer.canonicalize("powerbI").unwrap();
        assert_eq!(spaced.key, squashed.key);
        assert_eq!(spaced.display, "Power BI");
        assert_eq!(squashed.display, "Power BI");
    }

    #[test]
    fn test_plural_fold_retries_alias_lookup() {
        let table = test_table();
        let canonicalizer = Canonicalizer::new(&table);

        // "gestion projets" is not listed as a variant; stripping the plural
        // marker lands on the listed "gestion projet"
        let result = canonicalizer.canonicalize("Gestion Projets").unwrap();
        assert_eq!(result.display, "Gestion de projet");
        assert!(result.aliased);
    }

    #[test]
    fn test_unaliased_term_gets_phrase_casing() {
        let table = test_table();
        let canonicalizer = Canonicalizer::new(&table);

        let result = canonicalizer.canonicalize("  gestion   des conflits ").unwrap();
        assert!(!result.aliased);
        assert_eq!(result.display, "Gestion des Conflits");
        assert_eq!(result.category, CasingCategory::ActionPhrase);
    }

    #[test]
    fn test_elided_minor_word_stays_lowercase() {
        let table = test_table();
        let canonicalizer = Canonicalizer::new(&table);

        let result = canonicalizer.canonicalize("esprit d'équipe").unwrap();
        assert_eq!(result.display, "Esprit d'équipe");
    }

    #[test]
    fn test_empty_and_punctuation_only_are_excluded() {
        let table = test_table();
        let canonicalizer = Canonicalizer::new(&table);

        assert!(canonicalizer.canonicalize("   ").is_none());
        assert!(canonicalizer.canonicalize("...").is_none());
    }

    #[test]
    fn test_canonicalization_is_idempotent_on_display_forms() {
        let table = test_table();
        let canonicalizer = Canonicalizer::new(&table);

        let first = canonicalizer.canonicalize("diagnostic automobile").unwrap();
        let second = canonicalizer.canonicalize(&first.display).unwrap();
        assert_eq!(first.key, second.key);
        assert_eq!(first.display, second.display);
    }
}
