//! Default configuration values

/// Recipe file looked up in every recipe directory
pub const RECIPE_FILE_NAME: &str = "recipe.toml";

/// How deep below a recipe directory the recipe file may live
pub const RECIPE_SEARCH_DEPTH: usize = 2;

/// Project configuration file at the recipe root
pub const PROJECT_CONFIG_FILE: &str = "fanout.toml";

/// Global configuration file in the user config directory
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

/// Build matrix file at the recipe root
pub const DEFAULT_VERSIONS_FILE: &str = "versions.toml";

/// Default number of downstream fan-out layers
pub const DEFAULT_STEPS: usize = 0;

/// Default cap on packages newly marked by downstream fan-out
pub const DEFAULT_MAX_DOWNSTREAM: usize = 5;

/// Default platform when none is given
pub const DEFAULT_PLATFORM: &str = "linux";

/// Default bitness when none is given
pub const DEFAULT_BITS: u8 = 64;
