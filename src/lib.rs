pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod report;

pub use config::{AliasTable, AliasTableConfig};
pub use domain::{CanonicalGroup, Diagnostics, RawSkillEntry};
pub use error::{NormalizerError, Result};
pub use pipeline::{NormalizationOutcome, SkillNormalizer};
pub use report::SkillReport;
