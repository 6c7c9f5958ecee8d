//! CLI command for listing changed recipes
//!
//! Implements the `fanout changed` command.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::RevisionArgs;
use crate::cli::output::{self, OutputConfig};
use crate::core::changes::{ChangeDetector, RevisionRange};
use crate::infra::git::GitChangeSource;
use crate::infra::recipe::FsRecipeLocator;

#[derive(Serialize)]
struct ChangedOutput<'a> {
    range: String,
    changed: &'a [String],
}

/// Revision range selected by the flags, `HEAD` by default
pub(crate) fn revision_range(args: &RevisionArgs) -> RevisionRange {
    match &args.rev {
        Some(rev) => RevisionRange::new(rev.clone(), args.stop_rev.clone()),
        None => RevisionRange::default(),
    }
}

/// Changed recipe directories under `root`
pub(crate) fn detect_changes(root: &Path, range: &RevisionRange) -> Result<BTreeSet<String>> {
    let source = GitChangeSource::new(root);
    let locator = FsRecipeLocator::default();
    ChangeDetector::new(&source, &locator, root)
        .changed_recipes(range)
        .with_context(|| format!("Failed to detect changes in {range}"))
}

/// Execute the changed command
pub async fn execute(root: &Path, revisions: &RevisionArgs) -> Result<()> {
    let range = revision_range(revisions);
    let changed: Vec<String> = detect_changes(root, &range)?.into_iter().collect();
    tracing::info!("{} recipe(s) changed in {range}", changed.len());

    if OutputConfig::global().json {
        output::print_json(&ChangedOutput {
            range: range.to_string(),
            changed: &changed,
        })
    } else {
        output::print_text(&output::format_changed(&changed));
        Ok(())
    }
}
