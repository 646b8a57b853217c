use std::collections::{BTreeMap, BTreeSet, HashMap};

use rayon::prelude::*;
use tracing::debug;

use crate::config::AliasTable;
use crate::domain::{
    CanonicalGroup, DiagnosticIssue, DiagnosticKind, Diagnostics, RawSkillEntry,
};

use super::canonicalize::{collapse_whitespace, Canonicalizer};

/// Result of one aggregation run: the canonical-form-to-frequency map, the
/// groups behind it, and the diagnostics side-channel.
#[derive(Debug, Clone)]
pub struct AggregationOutcome {
    pub normalized_skills: BTreeMap<String, i64>,
    pub groups: Vec<CanonicalGroup>,
    pub diagnostics: Diagnostics,
}

/// Partitions raw entries by comparison key and sums frequencies exactly.
///
/// Holds no state across calls; the alias table is the only shared input and
/// it is read-only, so the same aggregator may serve concurrent runs.
pub struct Aggregator<'a> {
    table: &'a AliasTable,
}

/// Per-key accumulation state while a run is in flight.
#[derive(Debug, Clone, Default)]
struct GroupAccum {
    /// Set when the alias table resolved this group's display form
    aliased_display: Option<String>,
    /// Candidate display forms for unaliased groups, weighted by frequency
    display_votes: HashMap<String, i64>,
    members: BTreeSet<String>,
    total: i64,
}

impl GroupAccum {
    fn absorb(&mut self, other: GroupAccum) {
        if self.aliased_display.is_none() {
            self.aliased_display = other.aliased_display;
        }
        for (display, votes) in other.display_votes {
            *self.display_votes.entry(display).or_insert(0) += votes;
        }
        self.members.extend(other.members);
        self.total += other.total;
    }
}

/// Partial aggregation over one chunk of the input. Merging partials by
/// key-wise summation is associative and commutative, so chunked parallel
/// runs produce the same outcome as a sequential pass.
#[derive(Debug, Default)]
struct ChunkAccum {
    groups: HashMap<String, GroupAccum>,
    empty_count: u64,
    empty_issues: Vec<DiagnosticIssue>,
}

impl ChunkAccum {
    fn absorb(&mut self, other: ChunkAccum) {
        for (key, accum) in other.groups {
            self.groups.entry(key).or_default().absorb(accum);
        }
        self.empty_count += other.empty_count;
        self.empty_issues.extend(other.empty_issues);
    }
}

impl<'a> Aggregator<'a> {
    pub fn new(table: &'a AliasTable) -> Self {
        Self { table }
    }

    /// Aggregate a pre-validated batch sequentially.
    pub fn aggregate(&self, entries: &[RawSkillEntry]) -> AggregationOutcome {
        let accum = self.accumulate(entries);
        self.finish(accum)
    }

    /// Aggregate a pre-validated batch in parallel, chunk by chunk.
    /// Observationally identical to [`Aggregator::aggregate`].
    pub fn aggregate_parallel(
        &self,
        entries: &[RawSkillEntry],
        chunk_size: usize,
    ) -> AggregationOutcome {
        let chunk_size = chunk_size.max(1);
        let partials: Vec<ChunkAccum> = entries
            .par_chunks(chunk_size)
            .map(|chunk| self.accumulate(chunk))
            .collect();

        // Fold in chunk order so diagnostic issues keep input order
        let mut merged = ChunkAccum::default();
        for partial in partials {
            merged.absorb(partial);
        }
        self.finish(merged)
    }

    fn accumulate(&self, entries: &[RawSkillEntry]) -> ChunkAccum {
        let canonicalizer = Canonicalizer::new(self.table);
        let mut accum = ChunkAccum::default();

        for entry in entries {
            match canonicalizer.canonicalize(&entry.skill) {
                Some(canonicalization) => {
                    let group = accum
                        .groups
                        .entry(canonicalization.key)
                        .or_default();
                    group.total += entry.frequency;
                    group.members.insert(collapse_whitespace(&entry.skill));
                    if canonicalization.aliased {
                        group.aliased_display = Some(canonicalization.display);
                    } else {
                        *group
                            .display_votes
                            .entry(canonicalization.display)
                            .or_insert(0) += entry.frequency;
                    }
                }
                None => {
                    accum.empty_count += 1;
                    accum.empty_issues.push(DiagnosticIssue {
                        kind: DiagnosticKind::EmptySkill,
                        skill: None,
                        detail: format!(
                            "entry with frequency {} had empty skill text after trimming",
                            entry.frequency
                        ),
                    });
                }
            }
        }

        accum
    }

    fn finish(&self, accum: ChunkAccum) -> AggregationOutcome {
        // Keyed by display form so the rare cross-key display collision
        // still yields unique canonical forms in the output map
        let mut by_display: BTreeMap<String, CanonicalGroup> = BTreeMap::new();

        for group in accum.groups.into_values() {
            let (display, uncertain) = match group.aliased_display {
                Some(display) => (display, false),
                None => (elect_display(&group.display_votes), true),
            };

            match by_display.get_mut(&display) {
                Some(existing) => {
                    existing.members.extend(group.members);
                    existing.total_frequency += group.total;
                    existing.uncertain |= uncertain;
                }
                None => {
                    by_display.insert(
                        display.clone(),
                        CanonicalGroup {
                            canonical_form: display,
                            members: group.members,
                            total_frequency: group.total,
                            uncertain,
                        },
                    );
                }
            }
        }

        let mut diagnostics = Diagnostics {
            empty_inputs: accum.empty_count,
            issues: accum.empty_issues,
            ..Diagnostics::default()
        };

        let mut normalized_skills = BTreeMap::new();
        for group in by_display.values() {
            normalized_skills.insert(group.canonical_form.clone(), group.total_frequency);
            if group.uncertain {
                diagnostics.uncertain_groups += 1;
                diagnostics.issues.push(DiagnosticIssue {
                    kind: DiagnosticKind::UncertainCanonicalization,
                    skill: Some(group.canonical_form.clone()),
                    detail: format!(
                        "no alias matched; emitted with best-effort casing ({} variant(s))",
                        group.members.len()
                    ),
                });
            }
        }

        let mut groups: Vec<CanonicalGroup> = by_display.into_values().collect();
        groups.sort_by(|a, b| {
            b.total_frequency
                .cmp(&a.total_frequency)
                .then_with(|| a.canonical_form.cmp(&b.canonical_form))
        });

        debug!(
            groups = groups.len(),
            total_frequency = normalized_skills.values().sum::<i64>(),
            "Aggregation finished"
        );

        AggregationOutcome {
            normalized_skills,
            groups,
            diagnostics,
        }
    }
}

/// Pick the representative display form for an unaliased group: highest
/// combined frequency wins, exact ties go to the lexicographically first.
fn elect_display(votes: &HashMap<String, i64>) -> String {
    let mut candidates: Vec<(&String, i64)> = votes.iter().map(|(d, &v)| (d, v)).collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    candidates
        .first()
        .map(|(display, _)| (*display).clone())
        .unwrap_or_default()
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
variants = ["s.q.l"]

[[acronyms]]
canonical = "Power BI"
variants = ["powerbi"]

[[phrases]]
canonical = "Gestion de projet"
variants = ["gestion projet", "gestion de projets"]
"#,
        )
        .unwrap()
        .compile()
        .unwrap()
    }

    fn entries(pairs: &[(&str, i64)]) -> Vec<RawSkillEntry> {
        pairs
            .iter()
            .map(|(skill, frequency)| RawSkillEntry::new(*skill, *frequency))
            .collect()
    }

    #[test]
    fn test_case_and_synonym_variants_merge() {
        let table = test_table();
        let aggregator = Aggregator::new(&table);

        let outcome =
            aggregator.aggregate(&entries(&[("power bi", 3), ("Power BI", 2), ("powerbI", 1)]));
        assert_eq!(outcome.normalized_skills.len(), 1);
        assert_eq!(outcome.normalized_skills["Power BI"], 6);
    }

    #[test]
    fn test_acronym_casing_and_period_stripping() {
        let table = test_table();
        let aggregator = Aggregator::new(&table);

        let outcome = aggregator.aggregate(&entries(&[("sql", 10), ("SQL", 5), ("S.Q.L.", 1)]));
        assert_eq!(outcome.normalized_skills["SQL"], 16);
    }

    #[test]
    fn test_action_phrase_variants_resolve_to_canonical_form() {
        let table = test_table();
        let aggregator = Aggregator::new(&table);

        let outcome =
            aggregator.aggregate(&entries(&[("gestion projet", 2), ("Gestion Projets", 5)]));
        assert_eq!(outcome.normalized_skills["Gestion de projet"], 7);
    }

    #[test]
    fn test_distinct_concepts_stay_separate() {
        let table = test_table();
        let aggregator = Aggregator::new(&table);

        let outcome = aggregator.aggregate(&entries(&[
            ("Diagnostic automobile", 4),
            ("Réparation automobile", 6),
        ]));
        assert_eq!(outcome.normalized_skills.len(), 2);
        assert_eq!(outcome.normalized_skills["Diagnostic Automobile"], 4);
        assert_eq!(outcome.normalized_skills["Réparation Automobile"], 6);
    }

    #[test]
    fn test_conservation_and_partition_totality() {
        let table = test_table();
        let aggregator = Aggregator::new(&table);

        let input = entries(&[
            ("sql", 10),
            ("S.Q.L.", 1),
            ("power bi", 3),
            ("gestion projets", 4),
            ("communication", 7),
        ]);
        let outcome = aggregator.aggregate(&input);

        let input_total: i64 = input.iter().map(|e| e.frequency).sum();
        let output_total: i64 = outcome.normalized_skills.values().sum();
        assert_eq!(input_total, output_total);

        // Every raw text appears in exactly one group
        for entry in &input {
            let holding_groups = outcome
                .groups
                .iter()
                .filter(|g| g.members.contains(entry.skill.as_str()))
                .count();
            assert_eq!(holding_groups, 1, "'{}' not uniquely grouped", entry.skill);
        }
    }

    #[test]
    fn test_display_election_prefers_highest_frequency() {
        let table = AliasTable::empty();
        let aggregator = Aggregator::new(&table);

        let outcome =
            aggregator.aggregate(&entries(&[("data-analyse", 3), ("data analyse", 1)]));
        assert_eq!(outcome.normalized_skills.len(), 1);
        assert_eq!(outcome.normalized_skills["Data-analyse"], 4);
    }

    #[test]
    fn test_display_election_tie_breaks_lexicographically() {
        let table = AliasTable::empty();
        let aggregator = Aggregator::new(&table);

        let outcome =
            aggregator.aggregate(&entries(&[("data-analyse", 2), ("data analyse", 2)]));
        assert_eq!(outcome.normalized_skills.len(), 1);
        assert_eq!(outcome.normalized_skills["Data Analyse"], 4);
    }

    #[test]
    fn test_unaliased_groups_are_flagged_uncertain() {
        let table = test_table();
        let aggregator = Aggregator::new(&table);

        let outcome = aggregator.aggregate(&entries(&[("sql", 2), ("soudure TIG", 3)]));
        assert_eq!(outcome.diagnostics.uncertain_groups, 1);
        let flagged = outcome
            .diagnostics
            .issues
            .iter()
            .any(|i| i.kind == DiagnosticKind::UncertainCanonicalization
                && i.skill.as_deref() == Some("Soudure Tig"));
        assert!(flagged);
    }

    #[test]
    fn test_empty_skill_text_is_counted_not_failed() {
        let table = test_table();
        let aggregator = Aggregator::new(&table);

        let outcome = aggregator.aggregate(&entries(&[("   ", 5), ("sql", 2)]));
        assert_eq!(outcome.diagnostics.empty_inputs, 1);
        assert_eq!(outcome.normalized_skills.len(), 1);
        assert_eq!(outcome.normalized_skills["SQL"], 2);
    }

    #[test]
    fn test_parallel_aggregation_matches_sequential() {
        let table = test_table();
        let aggregator = Aggregator::new(&table);

        let mut input = Vec::new();
        for i in 0..50 {
            input.push(RawSkillEntry::new("sql", 1 + i % 3));
            input.push(RawSkillEntry::new("power bi", 2));
            input.push(RawSkillEntry::new("gestion projets", 1));
            input.push(RawSkillEntry::new(format!("compétence {}", i % 7), 1));
        }

        let sequential = aggregator.aggregate(&input);
        for chunk_size in [1, 7, 64, 1000] {
            let parallel = aggregator.aggregate_parallel(&input, chunk_size);
            assert_eq!(parallel.normalized_skills, sequential.normalized_skills);
            assert_eq!(
                parallel.diagnostics.uncertain_groups,
                sequential.diagnostics.uncertain_groups
            );
        }
    }
}
