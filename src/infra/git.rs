//! Git change source
//!
//! Compares the root trees of two commits using the gix crate. A top-level
//! directory changed when its tree entry appeared, disappeared or points to a
//! different object.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::core::changes::{ChangeSource, RevisionRange};
use crate::error::ChangeError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TopLevelEntry {
    oid: gix::ObjectId,
    is_dir: bool,
}

type TopLevel = BTreeMap<String, TopLevelEntry>;

/// Reads changes from a git repository
#[derive(Debug, Clone)]
pub struct GitChangeSource {
    repo_path: PathBuf,
}

impl GitChangeSource {
    /// Change source for the repository at `repo_path`
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Repository path
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn open(&self) -> Result<gix::Repository, ChangeError> {
        gix::open(&self.repo_path).map_err(|e| ChangeError::InvalidRepository {
            path: self.repo_path.clone(),
            error: e.to_string(),
        })
    }
}

impl ChangeSource for GitChangeSource {
    fn changed_top_level_dirs(
        &self,
        range: &RevisionRange,
    ) -> Result<BTreeSet<String>, ChangeError> {
        let repo = self.open()?;

        let (old, new) = match range {
            RevisionRange::Single(rev) => {
                let commit = resolve_commit(&repo, rev)?;
                let new = top_level_entries(&commit, rev)?;
                let old = match commit.parent_ids().next() {
                    Some(parent) => {
                        let parent = parent
                            .object()
                            .map_err(|e| resolve_failed(rev, e))?
                            .peel_to_commit()
                            .map_err(|e| resolve_failed(rev, e))?;
                        top_level_entries(&parent, rev)?
                    }
                    None => {
                        tracing::debug!("'{rev}' is a root commit, comparing to the empty tree");
                        TopLevel::new()
                    }
                };
                (old, new)
            }
            RevisionRange::Range { start, end } => {
                let old = top_level_entries(&resolve_commit(&repo, start)?, start)?;
                let new = top_level_entries(&resolve_commit(&repo, end)?, end)?;
                (old, new)
            }
        };

        let changed = changed_dirs(&old, &new);
        tracing::info!("{} top-level directories changed in {range}", changed.len());
        Ok(changed)
    }
}

fn resolve_commit<'r>(
    repo: &'r gix::Repository,
    revision: &str,
) -> Result<gix::Commit<'r>, ChangeError> {
    repo.rev_parse_single(revision)
        .map_err(|e| resolve_failed(revision, e))?
        .object()
        .map_err(|e| resolve_failed(revision, e))?
        .peel_to_commit()
        .map_err(|e| resolve_failed(revision, e))
}

fn top_level_entries(commit: &gix::Commit<'_>, revision: &str) -> Result<TopLevel, ChangeError> {
    let tree = commit.tree().map_err(|e| tree_failed(revision, e))?;
    let decoded = tree.decode().map_err(|e| tree_failed(revision, e))?;

    Ok(decoded
        .entries
        .iter()
        .map(|entry| {
            (
                entry.filename.to_string(),
                TopLevelEntry {
                    oid: entry.oid.to_owned(),
                    is_dir: entry.mode.is_tree(),
                },
            )
        })
        .collect())
}

/// Directory entries that differ between two root trees
fn changed_dirs(old: &TopLevel, new: &TopLevel) -> BTreeSet<String> {
    old.keys()
        .chain(new.keys())
        .filter(|name| {
            let before = old.get(*name);
            let after = new.get(*name);
            let is_dir = before.is_some_and(|e| e.is_dir) || after.is_some_and(|e| e.is_dir);
            is_dir && before != after
        })
        .cloned()
        .collect()
}

fn resolve_failed(revision: &str, error: impl Display) -> ChangeError {
    ChangeError::ResolveFailed {
        revision: revision.to_string(),
        error: error.to_string(),
    }
}

fn tree_failed(revision: &str, error: impl Display) -> ChangeError {
    ChangeError::TreeFailed {
        revision: revision.to_string(),
        error: error.to_string(),
    }
}
