//! Threshold evaluation: turn coverage numbers and configured targets into
//! pass/fail verdicts.
//!
//! All comparisons are inclusive (`>=`): hitting the target exactly is a
//! pass, and under an auto target a drop of exactly the allowed threshold is
//! a pass. The `informational` flag rides through unchanged; it never
//! affects the computed status, only whether a failure should block the
//! build.

use serde::{Deserialize, Serialize};

use crate::config::{CheckConfig, Target};
use crate::model::{AggregatedCoverage, PatchCoverage};

/// Fixed fallback when a patch target is "auto": patch coverage has no
/// meaningful baseline of its own to be relative to.
pub const DEFAULT_PATCH_TARGET: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Success,
    Failure,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CheckStatus::Success => "success",
            CheckStatus::Failure => "failure",
        })
    }
}

/// The outcome of one threshold check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCheckResult {
    pub status: CheckStatus,
    pub description: String,
    pub informational: bool,
}

impl StatusCheckResult {
    fn new(passed: bool, description: String, informational: bool) -> Self {
        Self {
            status: if passed {
                CheckStatus::Success
            } else {
                CheckStatus::Failure
            },
            description,
            informational,
        }
    }

    /// A failure that should break the build (i.e. not advisory).
    #[must_use]
    pub fn is_blocking_failure(&self) -> bool {
        self.status == CheckStatus::Failure && !self.informational
    }
}

/// Evaluate project-level coverage against its configured target.
#[must_use]
pub fn project_status(current: &AggregatedCoverage, config: &CheckConfig) -> StatusCheckResult {
    match config.target {
        Target::Value(target) => {
            let rate = current.metrics.line_rate;
            StatusCheckResult::new(
                rate >= target,
                format!("{rate:.2}% coverage (target {target:.2}%)"),
                config.informational,
            )
        }
        Target::Auto => match &current.comparison {
            // A relative target can't be enforced without a baseline.
            None => StatusCheckResult::new(
                true,
                "no base report to compare against".to_string(),
                config.informational,
            ),
            Some(comparison) => {
                let allowed_drop = config.threshold.unwrap_or(0.0);
                let delta = comparison.delta_line_rate;
                StatusCheckResult::new(
                    delta >= -allowed_drop,
                    format!("{delta:+.2}% vs base (allowed drop {allowed_drop:.2}%)"),
                    config.informational,
                )
            }
        },
    }
}

/// Evaluate patch-level coverage against its configured target.
#[must_use]
pub fn patch_status(patch: Option<&PatchCoverage>, config: &CheckConfig) -> StatusCheckResult {
    match patch {
        None => StatusCheckResult::new(
            true,
            "N/A (no diff to analyze)".to_string(),
            config.informational,
        ),
        Some(patch) => {
            let target = match config.target {
                Target::Value(target) => target,
                Target::Auto => DEFAULT_PATCH_TARGET,
            };
            StatusCheckResult::new(
                patch.percentage >= target,
                format!(
                    "{:.2}% of changed lines covered (target {target:.2}%)",
                    patch.percentage
                ),
                config.informational,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoverageComparison, CoverageMetrics};

    fn current_with_rate(line_rate: f64) -> AggregatedCoverage {
        AggregatedCoverage {
            metrics: CoverageMetrics {
                line_rate,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn with_delta(mut current: AggregatedCoverage, delta: f64) -> AggregatedCoverage {
        current.comparison = Some(CoverageComparison {
            delta_line_rate: delta,
            improvement: delta >= 0.0,
            ..Default::default()
        });
        current
    }

    fn check(target: Target, threshold: Option<f64>, informational: bool) -> CheckConfig {
        CheckConfig {
            target,
            threshold,
            informational,
        }
    }

    #[test]
    fn test_project_numeric_target() {
        let config = check(Target::Value(80.0), None, false);
        assert_eq!(
            project_status(&current_with_rate(85.0), &config).status,
            CheckStatus::Success
        );
        assert_eq!(
            project_status(&current_with_rate(75.0), &config).status,
            CheckStatus::Failure
        );
    }

    #[test]
    fn test_project_target_boundary_is_success() {
        let config = check(Target::Value(80.0), None, false);
        let result = project_status(&current_with_rate(80.0), &config);
        assert_eq!(result.status, CheckStatus::Success);
    }

    #[test]
    fn test_project_auto_without_base_succeeds() {
        let config = check(Target::Auto, Some(5.0), false);
        let result = project_status(&current_with_rate(10.0), &config);
        assert_eq!(result.status, CheckStatus::Success);
        assert!(result.description.contains("no base report"));
    }

    #[test]
    fn test_project_auto_drop_beyond_threshold_fails() {
        let config = check(Target::Auto, Some(5.0), false);
        let current = with_delta(current_with_rate(60.0), -10.0);
        assert_eq!(project_status(&current, &config).status, CheckStatus::Failure);
    }

    #[test]
    fn test_project_auto_small_drop_within_threshold_succeeds() {
        let config = check(Target::Auto, Some(5.0), false);
        let current = with_delta(current_with_rate(69.0), -1.0);
        assert_eq!(project_status(&current, &config).status, CheckStatus::Success);
    }

    #[test]
    fn test_project_auto_drop_exactly_threshold_succeeds() {
        let config = check(Target::Auto, Some(5.0), false);
        let current = with_delta(current_with_rate(65.0), -5.0);
        assert_eq!(project_status(&current, &config).status, CheckStatus::Success);
    }

    #[test]
    fn test_project_auto_no_threshold_means_no_drop_allowed() {
        let config = check(Target::Auto, None, false);
        let current = with_delta(current_with_rate(70.0), -0.01);
        assert_eq!(project_status(&current, &config).status, CheckStatus::Failure);

        let current = with_delta(current_with_rate(70.0), 0.0);
        assert_eq!(project_status(&current, &config).status, CheckStatus::Success);
    }

    #[test]
    fn test_patch_without_results_is_na_success() {
        let config = check(Target::Value(80.0), None, false);
        let result = patch_status(None, &config);
        assert_eq!(result.status, CheckStatus::Success);
        assert!(result.description.contains("N/A"));
    }

    #[test]
    fn test_patch_numeric_target_boundary() {
        let config = check(Target::Value(50.0), None, false);
        let patch = PatchCoverage {
            covered_lines: 1,
            missed_lines: 1,
            total_lines: 2,
            percentage: 50.0,
            ..Default::default()
        };
        assert_eq!(patch_status(Some(&patch), &config).status, CheckStatus::Success);
    }

    #[test]
    fn test_patch_auto_degrades_to_default_target() {
        let config = check(Target::Auto, None, false);
        let patch = PatchCoverage {
            percentage: 79.99,
            ..Default::default()
        };
        assert_eq!(patch_status(Some(&patch), &config).status, CheckStatus::Failure);

        let patch = PatchCoverage {
            percentage: 80.0,
            ..Default::default()
        };
        assert_eq!(patch_status(Some(&patch), &config).status, CheckStatus::Success);
    }

    #[test]
    fn test_informational_rides_through_unchanged() {
        let config = check(Target::Value(99.0), None, true);
        let result = project_status(&current_with_rate(10.0), &config);
        // Still a failure; informational never flips the status.
        assert_eq!(result.status, CheckStatus::Failure);
        assert!(result.informational);
        assert!(!result.is_blocking_failure());

        let config = check(Target::Value(99.0), None, false);
        let result = project_status(&current_with_rate(10.0), &config);
        assert!(result.is_blocking_failure());
    }
}
