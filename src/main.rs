use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use skillmerge::domain::Diagnostics;
use skillmerge::pipeline::validate;
use skillmerge::{AliasTable, AliasTableConfig, SkillNormalizer, SkillReport};

#[derive(Parser)]
#[command(name = "skillmerge")]
#[command(about = "Deterministic skill normalization and aggregation for job-market data")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize and aggregate a batch of raw skill entries
    Normalize {
        /// Input JSON file, or "-" to read from stdin
        #[arg(long, default_value = "-")]
        input: String,
        /// Alias table TOML file; omit to run with built-in rules only
        #[arg(long)]
        aliases: Option<PathBuf>,
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Keep only the N highest-frequency skills in the report
        #[arg(long)]
        top: Option<usize>,
        /// Pretty-print the JSON report
        #[arg(long)]
        pretty: bool,
        /// Aggregate in parallel chunks of this size
        #[arg(long)]
        parallel: Option<usize>,
        /// Attach the diagnostics section to the report
        #[arg(long)]
        diagnostics: bool,
    },
    /// Load an alias table and report on its contents
    CheckAliases {
        /// Alias table TOML file to validate
        #[arg(long)]
        aliases: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    skillmerge::logging::init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Normalize {
            input,
            aliases,
            output,
            top,
            pretty,
            parallel,
            diagnostics,
        } => run_normalize(
            &input,
            aliases.as_deref(),
            output.as_deref(),
            top,
            pretty,
            parallel,
            diagnostics,
        ),
        Commands::CheckAliases { aliases } => run_check_aliases(&aliases),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_normalize(
    input: &str,
    aliases: Option<&Path>,
    output: Option<&Path>,
    top: Option<usize>,
    pretty: bool,
    parallel: Option<usize>,
    diagnostics: bool,
) -> anyhow::Result<()> {
    let table = load_table(aliases)?;
    let document = read_input(input)?;
    let (entries, parse_issues) = validate::parse_document(&document)?;

    if !parse_issues.is_empty() {
        warn!(
            malformed = parse_issues.len(),
            "Input document contained malformed entries"
        );
    }

    let normalizer = SkillNormalizer::new(table);
    let mut outcome = match parallel {
        Some(chunk_size) => normalizer.normalize_batch_parallel(&entries, chunk_size),
        None => normalizer.normalize_batch(&entries),
    };

    // Malformed entries rejected during parsing belong in the same
    // diagnostics report as validation rejections
    let mut merged = Diagnostics {
        rejected_entries: parse_issues.len() as u64,
        issues: parse_issues,
        ..Diagnostics::default()
    };
    merged.absorb(std::mem::take(&mut outcome.diagnostics));
    outcome.diagnostics = merged;

    let rejected = outcome.diagnostics.rejected_entries;
    let uncertain = outcome.diagnostics.uncertain_groups;
    let group_count = outcome.groups.len();

    let report = SkillReport::from_outcome(outcome, top, diagnostics);
    let rendered = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    match output {
        Some(path) => {
            fs::write(path, rendered)?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{rendered}"),
    }

    eprintln!("📊 Normalization results:");
    eprintln!("   Skill groups: {}", group_count);
    eprintln!("   Reported skills: {}", report.normalized_skills.len());
    eprintln!("   Rejected entries: {}", rejected);
    if uncertain > 0 {
        eprintln!("   ⚠️  Uncertain canonicalizations: {} (curate the alias table)", uncertain);
    }

    Ok(())
}

fn run_check_aliases(aliases: &Path) -> anyhow::Result<()> {
    let table = AliasTableConfig::load(aliases)?.compile()?;
    let (proper_nouns, phrases) = table.category_counts();

    println!("✅ Alias table OK: {}", aliases.display());
    println!("   Acronyms / proper nouns: {}", proper_nouns);
    println!("   Action phrases: {}", phrases);
    println!("   Resolvable variant keys: {}", table.variant_key_count());
    Ok(())
}

fn load_table(aliases: Option<&Path>) -> anyhow::Result<AliasTable> {
    match aliases {
        Some(path) => {
            let table = AliasTableConfig::load(path)?.compile()?;
            info!(entries = table.entry_count(), "Alias table compiled");
            Ok(table)
        }
        None => {
            warn!("No alias table supplied; every term will use best-effort canonicalization");
            Ok(AliasTable::empty())
        }
    }
}

fn read_input(input: &str) -> anyhow::Result<serde_json::Value> {
    let content = if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };
    Ok(serde_json::from_str(&content)?)
}
