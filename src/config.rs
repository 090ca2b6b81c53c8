//! Layered configuration resolution.
//!
//! Precedence: inline flags > config file > defaults. The file shape is
//! all-optional JSON; anything absent falls through to the next layer.
//! Malformed values degrade to safe defaults (no threshold, "all" comment
//! files) rather than failing the run; warning about them is the caller's
//! job.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::model::CoverageResult;

/// A coverage target: an absolute percentage, or "auto" meaning relative to
/// the base snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Target {
    #[default]
    Auto,
    Value(f64),
}

impl Target {
    /// Lenient parse used for config-file values: unparseable input falls
    /// back to `Auto` (the caller may warn, the run proceeds).
    #[must_use]
    pub fn from_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("auto") {
            Target::Auto
        } else {
            parse_percent(s).map(Target::Value).unwrap_or_default()
        }
    }
}

impl std::str::FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(Target::Auto);
        }
        parse_percent(s)
            .map(Target::Value)
            .ok_or_else(|| format!("expected a percentage or \"auto\", got '{s}'"))
    }
}

impl Serialize for Target {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Target::Auto => serializer.serialize_str("auto"),
            Target::Value(v) => serializer.serialize_f64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TargetVisitor;

        impl de::Visitor<'_> for TargetVisitor {
            type Value = Target;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a number, a percentage string, or \"auto\"")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Target, E> {
                Ok(Target::Value(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Target, E> {
                Ok(Target::Value(v as f64))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Target, E> {
                Ok(Target::Value(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Target, E> {
                Ok(Target::from_lenient(v))
            }
        }

        deserializer.deserialize_any(TargetVisitor)
    }
}

/// Parse a percentage value with an optional `%` suffix ("80", "80%", "80.5").
/// Returns `None` for anything unparseable.
#[must_use]
pub fn parse_percent(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s.strip_suffix('%').unwrap_or(s).trim();
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Which files a PR comment should list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentFilesMode {
    #[default]
    All,
    Changed,
    None,
}

impl CommentFilesMode {
    /// Lenient parse: unknown values fall back to `All`.
    #[must_use]
    pub fn from_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "changed" => CommentFilesMode::Changed,
            "none" => CommentFilesMode::None,
            _ => CommentFilesMode::All,
        }
    }
}

/// One status check's settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckConfig {
    pub target: Target,
    pub threshold: Option<f64>,
    pub informational: bool,
}

/// Project- and patch-level status check settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusConfig {
    pub project: CheckConfig,
    pub patch: CheckConfig,
}

/// PR comment settings. Only the contract matters to this core; rendering
/// and posting live elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentConfig {
    pub enabled: bool,
    pub files: CommentFilesMode,
}

impl Default for CommentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            files: CommentFilesMode::All,
        }
    }
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    pub status: StatusConfig,
    pub ignore: Vec<String>,
    pub comment: CommentConfig,
}

impl Config {
    /// Resolve the three layers: defaults, then the config file, then
    /// inline overrides.
    #[must_use]
    pub fn resolve(file: Option<FileConfig>, overrides: &Overrides) -> Self {
        let mut config = Config::default();
        if let Some(file) = file {
            config.apply_file(file);
        }
        config.apply_overrides(overrides);
        config
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(status) = file.status {
            if let Some(project) = status.project {
                apply_check_section(&mut self.status.project, project);
            }
            if let Some(patch) = status.patch {
                apply_check_section(&mut self.status.patch, patch);
            }
        }
        if let Some(ignore) = file.ignore {
            self.ignore = ignore;
        }
        if let Some(comment) = file.comment {
            if let Some(enabled) = comment.enabled {
                self.comment.enabled = enabled;
            }
            if let Some(files) = comment.files {
                self.comment.files = CommentFilesMode::from_lenient(&files);
            }
        }
    }

    fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(target) = overrides.project_target {
            self.status.project.target = target;
        }
        if let Some(threshold) = overrides.project_threshold {
            self.status.project.threshold = Some(threshold);
        }
        if let Some(informational) = overrides.project_informational {
            self.status.project.informational = informational;
        }
        if let Some(target) = overrides.patch_target {
            self.status.patch.target = target;
        }
        if let Some(threshold) = overrides.patch_threshold {
            self.status.patch.threshold = Some(threshold);
        }
        if let Some(informational) = overrides.patch_informational {
            self.status.patch.informational = informational;
        }
        if !overrides.ignore.is_empty() {
            self.ignore = overrides.ignore.clone();
        }
    }
}

fn apply_check_section(config: &mut CheckConfig, section: FileCheckSection) {
    if let Some(target) = section.target {
        config.target = target;
    }
    if let Some(threshold) = section.threshold {
        config.threshold = Some(threshold);
    }
    if let Some(informational) = section.informational {
        config.informational = informational;
    }
}

/// The all-optional shape a JSON config file deserializes into.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub status: Option<FileStatusSection>,
    #[serde(default)]
    pub ignore: Option<Vec<String>>,
    #[serde(default)]
    pub comment: Option<FileCommentSection>,
}

impl FileConfig {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileStatusSection {
    #[serde(default)]
    pub project: Option<FileCheckSection>,
    #[serde(default)]
    pub patch: Option<FileCheckSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileCheckSection {
    #[serde(default)]
    pub target: Option<Target>,
    #[serde(default, deserialize_with = "de_threshold")]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub informational: Option<bool>,
}

/// Threshold values accept a bare number or a percentage string; anything
/// else resolves to no threshold.
fn de_threshold<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_percent(&s),
        _ => None,
    }))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileCommentSection {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub files: Option<String>,
}

/// Inline (CLI) overrides, the highest-precedence layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub project_target: Option<Target>,
    pub project_threshold: Option<f64>,
    pub project_informational: Option<bool>,
    pub patch_target: Option<Target>,
    pub patch_threshold: Option<f64>,
    pub patch_informational: Option<bool>,
    pub ignore: Vec<String>,
}

/// Compiled ignore patterns. Glob syntax: `*` matches within a path
/// segment, `**` across segments, `?` a single character. Invalid patterns
/// are dropped.
pub struct IgnoreMatcher {
    patterns: Vec<regex::Regex>,
}

impl IgnoreMatcher {
    #[must_use]
    pub fn new(globs: &[String]) -> Self {
        Self {
            patterns: globs.iter().filter_map(|g| glob_to_regex(g)).collect(),
        }
    }

    #[must_use]
    pub fn is_ignored(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(path))
    }

    /// Drop ignored files from a parsed report. Metrics are recomputed from
    /// the surviving files whenever anything was removed; format-authoritative
    /// totals can't stand once the ignored files' share is gone.
    pub fn filter_result(&self, result: &mut CoverageResult) {
        if self.patterns.is_empty() {
            return;
        }
        let before = result.files.len();
        result.files.retain(|f| !self.is_ignored(&f.path));
        if result.files.len() != before {
            result.metrics = crate::model::CoverageMetrics::from_files(&result.files);
        }
    }
}

fn glob_to_regex(pattern: &str) -> Option<regex::Regex> {
    let mut re = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    re.push_str(".*");
                } else {
                    re.push_str("[^/]*");
                }
            }
            '?' => re.push_str("[^/]"),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    regex::Regex::new(&re).ok()
}
