//! Output formatting
//!
//! Global output settings (quiet, JSON, verbosity) and the text renderings
//! of command results.

use std::fmt::Write as _;
use std::sync::OnceLock;

use serde::Serialize;

use crate::core::pipeline::PlatformPlan;

static OUTPUT_CONFIG: OnceLock<OutputConfig> = OnceLock::new();

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

/// Output settings taken from the global flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Suppress everything but errors and JSON
    pub quiet: bool,
    /// Emit JSON instead of text
    pub json: bool,
    /// Verbosity level (-v count)
    pub verbose: u8,
}

impl OutputConfig {
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Make this the process-wide configuration; only the first call wins
    pub fn apply_global(self) {
        let _ = OUTPUT_CONFIG.set(self);
    }

    /// Process-wide configuration, or the default when none was applied
    pub fn global() -> Self {
        OUTPUT_CONFIG.get().copied().unwrap_or_default()
    }

    /// Log level implied by the flags
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}

/// Print human-readable output unless quiet
pub fn print_text(text: &str) {
    if !OutputConfig::global().quiet {
        println!("{}", text.trim_end());
    }
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    if OutputConfig::global().json {
        let causes: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
        let value = serde_json::json!({
            "error": error.to_string(),
            "causes": causes,
        });
        eprintln!("{value}");
        return;
    }

    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}

/// Text rendering of changed recipe directories
pub fn format_changed(changed: &[String]) -> String {
    if changed.is_empty() {
        return format!("{} No recipes changed", status::INFO);
    }
    let mut output = format!("{} {} changed recipe(s):\n", status::INFO, changed.len());
    for dir in changed {
        let _ = writeln!(output, "  {dir}");
    }
    output
}

/// Text rendering of per-platform plans
pub fn format_plans(plans: &[PlatformPlan]) -> String {
    let mut output = String::new();
    for plan in plans {
        let _ = writeln!(
            output,
            "{} ({}-{}): {} package(s), {} from changes, {} downstream",
            plan.platform.label,
            plan.platform.platform,
            plan.platform.bits,
            plan.plan.len(),
            plan.baseline_dirty,
            plan.downstream_marked
        );

        if plan.plan.is_empty() {
            let _ = writeln!(output, "  {} Nothing to do", status::SUCCESS);
        }
        for (i, package) in plan.plan.packages.iter().enumerate() {
            let _ = write!(
                output,
                "  {:>3}. {:<14} {} {} (build {})",
                i + 1,
                package.action.to_string(),
                package.name,
                package.version,
                package.build_number
            );
            if let Some(jobs) = plan.jobs.get(&package.name) {
                let _ = write!(output, " [{} job(s)]", jobs.len());
            }
            output.push('\n');
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::matrix::Platform;
    use crate::core::planner::{BuildPlan, PlanAction, PlannedPackage};
    use std::collections::BTreeMap;

    #[test]
    fn test_log_level() {
        assert_eq!(OutputConfig::new(false, false, 0).log_level(), tracing::Level::WARN);
        assert_eq!(OutputConfig::new(false, false, 1).log_level(), tracing::Level::INFO);
        assert_eq!(OutputConfig::new(false, false, 3).log_level(), tracing::Level::DEBUG);
        assert_eq!(OutputConfig::new(true, false, 2).log_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_format_changed() {
        assert!(format_changed(&[]).contains("No recipes changed"));
        let output = format_changed(&["numpy".to_string(), "scipy".to_string()]);
        assert!(output.contains("2 changed recipe(s)"));
        assert!(output.contains("  scipy\n"));
    }

    #[test]
    fn test_format_plans() {
        let plan = PlatformPlan {
            platform: Platform {
                label: "linux-64".to_string(),
                platform: "linux".to_string(),
                bits: 64,
            },
            baseline_dirty: 1,
            downstream_marked: 0,
            plan: BuildPlan {
                packages: vec![PlannedPackage {
                    name: "numpy".to_string(),
                    version: "1.14.0".to_string(),
                    build_number: 1,
                    recipe_dir: None,
                    action: PlanAction::Build,
                }],
            },
            jobs: BTreeMap::new(),
        };

        let output = format_plans(&[plan]);
        assert!(output.starts_with("linux-64 (linux-64): 1 package(s)"));
        assert!(output.contains("1. build"));
        assert!(output.contains("numpy 1.14.0 (build 1)"));
    }
}
