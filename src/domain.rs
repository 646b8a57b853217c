use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A raw skill observation as produced by the upstream extraction stage.
/// Ephemeral input; never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSkillEntry {
    /// The skill text exactly as extracted from the source postings
    pub skill: String,
    /// How many postings mentioned this exact surface form (must be >= 1)
    pub frequency: i64,
}

impl RawSkillEntry {
    pub fn new(skill: impl Into<String>, frequency: i64) -> Self {
        Self {
            skill: skill.into(),
            frequency,
        }
    }
}

/// Casing policy attached to an alias table entry.
///
/// Proper nouns and acronyms keep the canonical casing stored in the table
/// verbatim ("SQL", "Power BI"). Action phrases get significant words
/// capitalized with minor function words kept lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasingCategory {
    /// Known technology, tool, or acronym; table casing is authoritative
    ProperNoun,
    /// Action-plus-domain phrase ("Gestion de projet")
    ActionPhrase,
}

/// One canonical group produced by a normalization run: the elected display
/// form, the raw variants that mapped into it, and the exact frequency sum.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalGroup {
    /// The standardized display string representing every member variant
    pub canonical_form: String,
    /// Raw variants (whitespace-collapsed) that mapped into this group
    pub members: BTreeSet<String>,
    /// Exact sum of member frequencies, never estimated
    pub total_frequency: i64,
    /// True when no alias matched and the display form is best-effort
    pub uncertain: bool,
}

/// Classification of per-entry problems surfaced alongside the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Entry had frequency <= 0 and was rejected
    InvalidFrequency,
    /// Entry was structurally malformed (non-string skill, missing field)
    MalformedEntry,
    /// Skill text was empty after trimming; excluded, not an error
    EmptySkill,
    /// No alias or morphological pattern matched; emitted with best-effort casing
    UncertainCanonicalization,
}

/// A single diagnostic surfaced by validation or canonicalization.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub kind: DiagnosticKind,
    /// The skill text involved, when one was available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    pub detail: String,
}

/// Diagnostics side-channel for one normalization run. No issue recorded
/// here ever aborts the batch; the contract is best-effort completion.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    /// Entries rejected by validation (frequency <= 0, malformed shape)
    pub rejected_entries: u64,
    /// Entries whose skill text was empty after trimming
    pub empty_inputs: u64,
    /// Groups emitted without an alias match, flagged for table curation
    pub uncertain_groups: u64,
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    /// Fold another diagnostics block into this one, preserving issue order.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.rejected_entries += other.rejected_entries;
        self.empty_inputs += other.empty_inputs;
        self.uncertain_groups += other.uncertain_groups;
        self.issues.extend(other.issues);
    }
}
