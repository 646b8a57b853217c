use tracing::info;

use crate::config::AliasTable;
use crate::domain::{Diagnostics, RawSkillEntry};

pub mod aggregate;
pub mod canonicalize;
pub mod validate;

pub use aggregate::{AggregationOutcome, Aggregator};
pub use canonicalize::{Canonicalization, Canonicalizer};

/// Full result of one normalization run, including what validation rejected.
#[derive(Debug, Clone)]
pub struct NormalizationOutcome {
    pub normalized_skills: std::collections::BTreeMap<String, i64>,
    pub groups: Vec<crate::domain::CanonicalGroup>,
    pub diagnostics: Diagnostics,
    /// Entries received, before validation
    pub input_entries: usize,
    /// Entries that survived validation and entered aggregation
    pub valid_entries: usize,
}

/// The end-to-end engine: validation gate, canonicalization, aggregation.
///
/// Stateless across calls; the alias table is frozen at construction, so a
/// single instance may serve concurrent batches.
pub struct SkillNormalizer {
    table: AliasTable,
}

impl SkillNormalizer {
    pub fn new(table: AliasTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &AliasTable {
        &self.table
    }

    /// Run the whole pipeline over one batch, sequentially.
    pub fn normalize_batch(&self, entries: &[RawSkillEntry]) -> NormalizationOutcome {
        self.run(entries, None)
    }

    /// Run the whole pipeline with chunked parallel aggregation. Yields the
    /// same outcome as the sequential path for any chunk size.
    pub fn normalize_batch_parallel(
        &self,
        entries: &[RawSkillEntry],
        chunk_size: usize,
    ) -> NormalizationOutcome {
        self.run(entries, Some(chunk_size))
    }

    fn run(&self, entries: &[RawSkillEntry], chunk_size: Option<usize>) -> NormalizationOutcome {
        let (valid, rejected) = validate::screen(entries);

        let aggregator = Aggregator::new(&self.table);
        let outcome = match chunk_size {
            Some(chunk_size) => aggregator.aggregate_parallel(&valid, chunk_size),
            None => aggregator.aggregate(&valid),
        };

        let mut diagnostics = Diagnostics {
            rejected_entries: rejected.len() as u64,
            issues: rejected,
            ..Diagnostics::default()
        };
        diagnostics.absorb(outcome.diagnostics);

        info!(
            input_entries = entries.len(),
            valid_entries = valid.len(),
            groups = outcome.groups.len(),
            rejected = diagnostics.rejected_entries,
            uncertain = diagnostics.uncertain_groups,
            "Normalization run finished"
        );

        NormalizationOutcome {
            normalized_skills: outcome.normalized_skills,
            groups: outcome.groups,
            diagnostics,
            input_entries: entries.len(),
            valid_entries: valid.len(),
        }
    }
}
