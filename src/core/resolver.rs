//! Package availability oracle
//!
//! The propagator asks a [`Resolver`] whether a dependency can simply be
//! installed, and if not, whether a local recipe can produce it.

use std::path::Path;

use crate::core::version::VersionConstraint;
use crate::error::ResolverError;

/// Answers installability and local buildability questions
pub trait Resolver {
    /// Whether a package satisfying `constraint` can be installed from the
    /// configured channels
    fn is_installable(&self, name: &str, constraint: &VersionConstraint)
        -> Result<bool, ResolverError>;

    /// Whether the recipe in `recipe_dir` produces a package satisfying
    /// `constraint`
    fn is_buildable_locally(
        &self,
        recipe_dir: &Path,
        constraint: &VersionConstraint,
    ) -> Result<bool, ResolverError>;
}

impl<T: Resolver + ?Sized> Resolver for &T {
    fn is_installable(
        &self,
        name: &str,
        constraint: &VersionConstraint,
    ) -> Result<bool, ResolverError> {
        (**self).is_installable(name, constraint)
    }

    fn is_buildable_locally(
        &self,
        recipe_dir: &Path,
        constraint: &VersionConstraint,
    ) -> Result<bool, ResolverError> {
        (**self).is_buildable_locally(recipe_dir, constraint)
    }
}
