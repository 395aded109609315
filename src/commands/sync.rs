//! # Sync Command Implementation
//!
//! Brings projects back in line with their feature templates. For each
//! project a sync plan is built from a snapshot of its files (migrations,
//! template writes, JSON merges and links) and then applied.
//!
//! Template files the user edited are three-way merged with `git merge-file`
//! against the last version of the template the file was generated from.
//! What happens on a merge conflict is chosen with `--strategy`.
//!
//! A project whose plan has errors is skipped without touching any of its
//! files; the remaining projects are still synced. The same holds for a
//! project that cannot be planned or applied at all (undefined feature,
//! missing root, I/O failure), except that the run then ends with an error
//! naming it. With `--dry-run` plans are printed and nothing is written.

use anyhow::Result;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::Args;
use log::{error, warn};
use serde::Serialize;

use feature_sync::apply::{self, ApplyReport};
use feature_sync::features::FeatureCatalog;
use feature_sync::merge::GitMergeFile;
use feature_sync::output::{render_plan, OutputConfig};
use feature_sync::plan::{self, ConflictStrategy, SyncPlan};

use super::{load_workspace, select_projects, Outcome, RootArg};

/// Reconcile projects with their feature templates
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub root: RootArg,

    /// Only sync these projects (repeatable).
    #[arg(short, long = "project", value_name = "NAME")]
    pub projects: Vec<String>,

    /// What to do when a three-way merge conflicts.
    ///
    /// none: block the project; markers: write the file with conflict
    /// markers; keep-local: leave the file as it is; overwrite: replace it
    /// with the rendered template.
    #[arg(
        long,
        value_name = "STRATEGY",
        env = "FEATURE_SYNC_STRATEGY",
        default_value = "none",
        value_parser = PossibleValuesParser::new(ConflictStrategy::VARIANTS)
            .map(|s| s.parse::<ConflictStrategy>().unwrap_or_default())
    )]
    pub strategy: ConflictStrategy,

    /// Show what would change without writing anything.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the plans as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SyncResult {
    #[serde(flatten)]
    plan: SyncPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    applied: Option<ApplyReport>,
}

/// Execute the `sync` command.
///
/// Returns [`Outcome::Findings`] if any project was blocked or any conflict
/// was reported, even when the conflict was resolved by the strategy. A
/// project that fails outright makes the whole run fail after the others are
/// synced.
pub fn execute(args: SyncArgs, color_flag: &str) -> Result<Outcome> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let workspace = load_workspace(&args.root.root)?;
    let projects = select_projects(&workspace, &args.projects)?;
    let catalog = FeatureCatalog::new(workspace.features);
    let merger = GitMergeFile::default();

    let mut results = Vec::new();
    let mut failures = Vec::new();
    let mut findings = false;
    for project in &projects {
        let plan = match plan::plan_from_disk(project, &catalog, args.strategy, &merger) {
            Ok(plan) => plan,
            Err(e) => {
                error!("{}: {}", project.name, e);
                failures.push(format!("{}: {}", project.name, e));
                continue;
            }
        };
        findings |= plan.is_blocked() || !plan.conflicts.is_empty();

        let applied = if plan.is_blocked() {
            warn!(
                "{}: skipped, {} error(s) in plan",
                project.name,
                plan.errors.len()
            );
            None
        } else if args.dry_run || plan.is_empty() {
            None
        } else {
            match apply::apply(&plan, &project.path) {
                Ok(report) => Some(report),
                Err(e) => {
                    error!("{}: {}", project.name, e);
                    failures.push(format!("{}: {}", project.name, e));
                    None
                }
            }
        };

        if !args.json {
            print!("{}", render_plan(&plan, applied.as_ref(), &out));
        }
        results.push(SyncResult { plan, applied });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    if !failures.is_empty() {
        anyhow::bail!(
            "{} project(s) could not be synced:\n  {}",
            failures.len(),
            failures.join("\n  ")
        );
    }
    Ok(Outcome::from_findings(findings))
}
