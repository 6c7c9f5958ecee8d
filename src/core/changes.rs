//! Change detection
//!
//! Maps a revision range to the recipe directories it touched.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::recipe::RecipeLocator;
use crate::error::ChangeError;

/// Revisions to inspect for changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionRange {
    /// Changes introduced by exactly this revision
    Single(String),
    /// Changes after `start` (exclusive) up to `end` (inclusive)
    Range { start: String, end: String },
}

impl RevisionRange {
    /// Build a range from a start revision and an optional stop revision
    pub fn new(rev: impl Into<String>, stop_rev: Option<String>) -> Self {
        match stop_rev {
            Some(end) => Self::Range {
                start: rev.into(),
                end,
            },
            None => Self::Single(rev.into()),
        }
    }
}

impl Default for RevisionRange {
    fn default() -> Self {
        Self::Single("HEAD".to_string())
    }
}

impl fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(rev) => write!(f, "{rev}"),
            Self::Range { start, end } => write!(f, "{start}..{end}"),
        }
    }
}

/// Lists top-level directories touched by a revision range
pub trait ChangeSource {
    /// Top-level directory names containing changed files
    fn changed_top_level_dirs(&self, range: &RevisionRange)
        -> Result<BTreeSet<String>, ChangeError>;
}

/// Filters changed directories down to recipe roots
pub struct ChangeDetector<'a, S, L> {
    source: &'a S,
    locator: &'a L,
    recipe_root: PathBuf,
}

impl<'a, S: ChangeSource, L: RecipeLocator> ChangeDetector<'a, S, L> {
    /// Create a detector for recipes under `recipe_root`
    pub fn new(source: &'a S, locator: &'a L, recipe_root: &Path) -> Self {
        Self {
            source,
            locator,
            recipe_root: recipe_root.to_path_buf(),
        }
    }

    /// Changed directories that hold a recipe
    pub fn changed_recipes(&self, range: &RevisionRange) -> Result<BTreeSet<String>, ChangeError> {
        let changed = self.source.changed_top_level_dirs(range)?;
        tracing::debug!("{} top-level directories changed in {range}", changed.len());

        Ok(changed
            .into_iter()
            .filter(|dir| {
                let is_recipe = self.locator.locate(&self.recipe_root.join(dir)).is_ok();
                if !is_recipe {
                    tracing::debug!("Ignoring changed directory '{dir}': not a recipe");
                }
                is_recipe
            })
            .collect())
    }
}
