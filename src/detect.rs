//! Format detection and the parser registry.
//!
//! Strategy:
//!   1. Ask every parser's `can_parse` in a fixed priority order
//!      (most-specific content signature first)
//!   2. Fall back to an extension/filename lookup on the path hint
//!   3. Return `None` when nothing matches; the caller decides whether
//!      that is fatal

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CovcheckError;
use crate::parsers::clover::CloverParser;
use crate::parsers::cobertura::CoberturaParser;
use crate::parsers::codecov::CodecovParser;
use crate::parsers::gocover::GocoverParser;
use crate::parsers::istanbul::IstanbulParser;
use crate::parsers::jacoco::JacocoParser;
use crate::parsers::lcov::LcovParser;
use crate::parsers::CoverageParser;

/// Supported coverage formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Clover,
    Cobertura,
    Jacoco,
    Lcov,
    Istanbul,
    Gocover,
    Codecov,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Clover => "clover",
            Format::Cobertura => "cobertura",
            Format::Jacoco => "jacoco",
            Format::Lcov => "lcov",
            Format::Istanbul => "istanbul",
            Format::Gocover => "gocover",
            Format::Codecov => "codecov",
        }
    }
}

impl std::str::FromStr for Format {
    type Err = CovcheckError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "clover" => Ok(Format::Clover),
            "cobertura" => Ok(Format::Cobertura),
            "jacoco" => Ok(Format::Jacoco),
            "lcov" => Ok(Format::Lcov),
            "istanbul" => Ok(Format::Istanbul),
            "gocover" | "go" => Ok(Format::Gocover),
            "codecov" => Ok(Format::Codecov),
            _ => Err(CovcheckError::UnknownFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The ordered set of format parsers.
///
/// Constructed explicitly at start-of-run and passed to whoever needs
/// detection, so the priority order is a plain, testable value rather than
/// hidden global state.
pub struct ParserRegistry {
    parsers: Vec<Box<dyn CoverageParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserRegistry {
    /// Build the registry in detection priority order.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(CloverParser),
                Box::new(CoberturaParser),
                Box::new(JacocoParser),
                Box::new(LcovParser),
                Box::new(IstanbulParser),
                Box::new(GocoverParser),
                Box::new(CodecovParser),
            ],
        }
    }

    /// Select a parser for the given content, trying content signatures
    /// first and the path-hint lookup table second. `None` means "cannot
    /// classify", a valid outcome rather than an error.
    pub fn detect(&self, content: &str, path_hint: Option<&Path>) -> Option<&dyn CoverageParser> {
        for parser in &self.parsers {
            if parser.can_parse(content, path_hint) {
                return Some(parser.as_ref());
            }
        }
        path_hint
            .and_then(format_from_path)
            .map(|format| self.get(format))
    }

    /// Direct lookup by format. Total over the enum: the registry is
    /// constructed with every format, so a miss is a construction bug.
    pub fn get(&self, format: Format) -> &dyn CoverageParser {
        self.parsers
            .iter()
            .find(|p| p.format() == format)
            .map(|p| p.as_ref())
            .expect("registry is constructed with every format")
    }
}

/// Extension/filename lookup table used when content sniffing fails.
pub fn format_from_path(path: &Path) -> Option<Format> {
    let file_name = path.file_name()?.to_str()?.to_lowercase();

    if file_name == "codecov.json" {
        return Some(Format::Codecov);
    }
    if file_name == "coverage-final.json" {
        return Some(Format::Istanbul);
    }
    if file_name.ends_with("lcov.info") {
        return Some(Format::Lcov);
    }
    if file_name.ends_with("jacoco.xml") {
        return Some(Format::Jacoco);
    }
    if file_name.ends_with("clover.xml") {
        return Some(Format::Clover);
    }
    if file_name.contains("cobertura") && file_name.ends_with(".xml") {
        return Some(Format::Cobertura);
    }

    match path.extension()?.to_str()?.to_lowercase().as_str() {
        "info" | "lcov" => Some(Format::Lcov),
        "out" | "coverprofile" | "gocov" => Some(Format::Gocover),
        _ => None,
    }
}
