//! # Explain Command Implementation
//!
//! Displays, per project, which feature owns which path and which
//! migrations each feature carries, as a tree:
//!
//! ```text
//! web
//! ├─ lint@2.0.0
//! │  ├─ .eslintrc.json (template)
//! │  ├─ package.json (json-merge)
//! │  └─ rename .eslintrc -> .eslintrc.json
//! └─ conflicts
//!    └─ shared.txt: lint@2.0.0, ci@1.0.0
//! ```
//!
//! This command is a safe, read-only operation that does not look at the
//! project's files.

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};

use feature_sync::explain::{explain, ProjectExplain};
use feature_sync::features::FeatureCatalog;

use super::{load_workspace, select_projects, Outcome, RootArg};

/// Show what each feature owns in a project
#[derive(Args, Debug)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub root: RootArg,

    /// Only explain these projects (repeatable).
    #[arg(short, long = "project", value_name = "NAME")]
    pub projects: Vec<String>,
}

/// Execute the `explain` command.
pub fn execute(args: ExplainArgs) -> Result<Outcome> {
    let workspace = load_workspace(&args.root.root)?;
    let projects = select_projects(&workspace, &args.projects)?;
    let catalog = FeatureCatalog::new(workspace.features);

    let mut conflicts = false;
    for project in &projects {
        let report = explain(project, &catalog)?;
        conflicts |= !report.conflicts.is_empty();
        print_tree(&build_tree(&report))
            .map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    }
    Ok(Outcome::from_findings(conflicts))
}

fn leaf(label: String) -> TreeNode {
    TreeNode {
        label,
        children: vec![],
    }
}

fn build_tree(report: &ProjectExplain) -> TreeNode {
    let mut children: Vec<TreeNode> = report
        .features
        .iter()
        .map(|feature| {
            let label = match &feature.description {
                Some(description) => format!("{} - {}", feature.feature, description),
                None => feature.feature.clone(),
            };
            let paths = feature
                .paths
                .iter()
                .map(|p| leaf(format!("{} ({})", p.path, p.ownership.label())));
            let renames = feature
                .migrations
                .renames
                .iter()
                .map(|(from, to)| leaf(format!("rename {} -> {}", from, to)));
            let deletes = feature
                .migrations
                .deletes
                .iter()
                .map(|path| leaf(format!("delete {}", path)));
            TreeNode {
                label,
                children: paths.chain(renames).chain(deletes).collect(),
            }
        })
        .collect();

    if !report.conflicts.is_empty() {
        children.push(TreeNode {
            label: "conflicts".to_string(),
            children: report
                .conflicts
                .iter()
                .map(|c| leaf(format!("{}: {}", c.path, c.owners.join(", "))))
                .collect(),
        });
    }

    TreeNode {
        label: report.project.clone(),
        children,
    }
}

/// Tree node structure for ptree visualization
#[derive(Clone, Debug)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> std::borrow::Cow<'_, [Self::Child]> {
        std::borrow::Cow::Borrowed(&self.children)
    }
}
