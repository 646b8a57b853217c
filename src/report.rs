use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::Diagnostics;
use crate::pipeline::NormalizationOutcome;

/// The output artifact: matches the `{"normalized_skills": {...}}` shape
/// mandated by the upstream contract so the engine is a drop-in replacement
/// for the model-based normalization step. Diagnostics are attached only
/// when requested.
#[derive(Debug, Serialize)]
pub struct SkillReport {
    pub normalized_skills: BTreeMap<String, i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticsSection>,
}

/// Run metadata plus the diagnostics side-channel.
#[derive(Debug, Serialize)]
pub struct DiagnosticsSection {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub input_entries: usize,
    pub valid_entries: usize,
    pub group_count: usize,
    #[serde(flatten)]
    pub diagnostics: Diagnostics,
}

impl SkillReport {
    /// Build a report from a normalization outcome. `top` truncates the map
    /// to the N highest-frequency skills, mirroring the upstream pipeline's
    /// top-skill cut; `None` keeps everything.
    pub fn from_outcome(
        outcome: NormalizationOutcome,
        top: Option<usize>,
        with_diagnostics: bool,
    ) -> Self {
        let group_count = outcome.groups.len();
        let normalized_skills = match top {
            Some(n) => truncate_top(outcome.normalized_skills, n),
            None => outcome.normalized_skills,
        };

        let diagnostics = with_diagnostics.then(|| DiagnosticsSection {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            input_entries: outcome.input_entries,
            valid_entries: outcome.valid_entries,
            group_count,
            diagnostics: outcome.diagnostics,
        });

        Self {
            normalized_skills,
            diagnostics,
        }
    }
}

/// Keep the `n` highest-frequency skills; ties resolve alphabetically so
/// truncation is deterministic.
fn truncate_top(map: BTreeMap<String, i64>, n: usize) -> BTreeMap<String, i64> {
    if map.len() <= n {
        return map;
    }
    let mut ranked: Vec<(String, i64)> = map.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked.into_iter().collect()
}
