//! Command handler functions for the covcheck CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout. `main` only parses arguments, calls a
//! handler, and prints.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use crate::artifact::StoredReport;
use crate::config::{parse_percent, Config, FileConfig, IgnoreMatcher, Overrides, Target};
use crate::detect::{Format, ParserRegistry};
use crate::model::CoverageResult;
use crate::parsers::CoverageParser;
use crate::{aggregate, compare, diff, patch, report, status};

/// Everything the `check` command needs.
#[derive(Debug, Default)]
pub struct CheckOptions {
    pub files: Vec<PathBuf>,
    pub format: Option<String>,
    pub diff_file: Option<PathBuf>,
    pub path_prefix: Option<String>,
    pub base_file: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub name: Option<String>,
    pub flags: Vec<String>,
    pub ignore: Vec<String>,
    pub skip_errors: bool,
    pub target: Option<String>,
    pub threshold: Option<String>,
    pub patch_target: Option<String>,
    pub patch_threshold: Option<String>,
    pub informational: bool,
}

/// Parse, aggregate, compare, analyze the patch, and evaluate thresholds.
/// Returns the rendered report and whether a blocking check failed.
pub fn cmd_check(registry: &ParserRegistry, options: &CheckOptions) -> Result<(String, bool)> {
    let file_config = match &options.config_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            Some(
                FileConfig::from_json(&content)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?,
            )
        }
        None => None,
    };
    let config = Config::resolve(file_config, &build_overrides(options));
    let matcher = IgnoreMatcher::new(&config.ignore);

    let mut parsed = Vec::with_capacity(options.files.len());
    for path in &options.files {
        match load_report(registry, path, options.format.as_deref()) {
            Ok(mut result) => {
                matcher.filter_result(&mut result);
                parsed.push(result);
            }
            Err(e) if options.skip_errors => {
                eprintln!("Warning: skipping {}: {e:#}", path.display());
            }
            Err(e) => return Err(e),
        }
    }

    let mut results = aggregate::aggregate(parsed);
    results.name = options.name.clone();
    if !options.flags.is_empty() {
        results.flags = Some(options.flags.clone());
    }

    if let Some(base_path) = &options.base_file {
        let content = std::fs::read_to_string(base_path)
            .with_context(|| format!("Failed to read base report {}", base_path.display()))?;
        let base = StoredReport::from_json(&content)
            .with_context(|| format!("Failed to parse base report {}", base_path.display()))?;
        results.comparison = Some(compare::compare(&base.results, &results));
    }

    let patch_results = match &options.diff_file {
        Some(diff_path) => {
            let diff_text = std::fs::read_to_string(diff_path)
                .with_context(|| format!("Failed to read diff {}", diff_path.display()))?;
            let mut diff_files = diff::parse(&diff_text);
            if let Some(prefix) = &options.path_prefix {
                diff_files = diff::apply_prefix(diff_files, prefix);
            }
            let patch_results = patch::analyze(&diff_files, &results);
            patch::annotate(&mut results, &patch_results);
            Some(patch_results)
        }
        None => None,
    };

    let project_check = status::project_status(&results, &config.status.project);
    let patch_check = status::patch_status(patch_results.as_ref(), &config.status.patch);

    if let Some(output_path) = &options.output_file {
        let stored = StoredReport::new(results.clone());
        let json = stored.to_json().context("Failed to serialize results")?;
        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
    }

    let mut out = report::summary_text(&results);
    if let Some(comparison) = &results.comparison {
        out.push_str(&report::comparison_text(comparison));
    }
    if let Some(patch_results) = &patch_results {
        out.push_str(&report::patch_text(patch_results));
    }
    out.push('\n');
    out.push_str(&report::status_text("project", &project_check));
    out.push_str(&report::status_text("patch", &patch_check));

    let failed = project_check.is_blocking_failure() || patch_check.is_blocking_failure();
    Ok((out, failed))
}

/// Parse and aggregate, then render the totals.
pub fn cmd_summary(
    registry: &ParserRegistry,
    files: &[PathBuf],
    format: Option<&str>,
) -> Result<String> {
    let mut parsed = Vec::with_capacity(files.len());
    for path in files {
        parsed.push(load_report(registry, path, format)?);
    }
    Ok(report::summary_text(&aggregate::aggregate(parsed)))
}

/// Report which format a file would be parsed as.
pub fn cmd_detect(registry: &ParserRegistry, path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(match registry.detect(&content, Some(path)) {
        Some(parser) => format!("{}: {}\n", path.display(), parser.format()),
        None => format!("{}: unknown\n", path.display()),
    })
}

/// Read one coverage file and parse it, auto-detecting the format unless an
/// override was given.
fn load_report(
    registry: &ParserRegistry,
    path: &Path,
    format_override: Option<&str>,
) -> Result<CoverageResult> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let parser = match format_override {
        Some(format) => {
            let format: Format = format.parse()?;
            registry.get(format)
        }
        None => registry
            .detect(&content, Some(path))
            .ok_or_else(|| anyhow!("Cannot detect coverage format of {}", path.display()))?,
    };

    parser
        .parse(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Convert raw CLI strings into the override layer, warning (not failing)
/// on values that don't parse.
fn build_overrides(options: &CheckOptions) -> Overrides {
    let parse_target = |value: &Option<String>, which: &str| -> Option<Target> {
        let value = value.as_deref()?;
        match value.parse::<Target>() {
            Ok(target) => Some(target),
            Err(e) => {
                eprintln!("Warning: ignoring --{which}: {e}");
                None
            }
        }
    };
    let parse_threshold = |value: &Option<String>, which: &str| -> Option<f64> {
        let value = value.as_deref()?;
        match parse_percent(value) {
            Some(threshold) => Some(threshold),
            None => {
                eprintln!("Warning: ignoring --{which}: '{value}' is not a percentage");
                None
            }
        }
    };

    Overrides {
        project_target: parse_target(&options.target, "target"),
        project_threshold: parse_threshold(&options.threshold, "threshold"),
        project_informational: options.informational.then_some(true),
        patch_target: parse_target(&options.patch_target, "patch-target"),
        patch_threshold: parse_threshold(&options.patch_threshold, "patch-threshold"),
        patch_informational: options.informational.then_some(true),
        ignore: options.ignore.clone(),
    }
}
