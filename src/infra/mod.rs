//! Infrastructure layer
//!
//! Handles all I/O operations: the filesystem, git repositories and channel
//! index files. This module is the only place where side effects occur.

pub mod dirs;
pub mod filesystem;
pub mod git;
pub mod index;
pub mod recipe;
