/// Parser for Istanbul / NYC `coverage-final.json` reports.
///
/// Reference: https://github.com/istanbuljs/istanbuljs
///
/// The format is a JSON object keyed by file path. Each value contains:
///   - `statementMap`: `{ "0": { "start": { "line": 1, ... }, "end": ... }, ... }`
///   - `s`:            `{ "0": 5, "1": 0, ... }` — hit counts per statement
///   - `branchMap`:    `{ "0": { "loc": ..., "type": "if", "locations": [...] }, ... }`
///   - `b`:            `{ "0": [5, 0], ... }` — hit counts per branch arm
///   - `fnMap`:        `{ "0": { "name": "foo", "decl": ..., "loc": ... }, ... }`
///   - `f`:            `{ "0": 3, ... }` — hit counts per function
///
/// Istanbul tracks statements, not lines, so the per-line view is
/// synthesized: each statement's hit count attaches to its starting line,
/// taking the max across statements that start on the same line. The file
/// counters keep Istanbul's own statement-based accounting (statementMap
/// entries, not synthesized lines).
use std::collections::HashMap;

use serde_json::Value;

use super::{parse_err, sniff_head, CoverageParser, Format};
use crate::error::{CovcheckError, Result};
use crate::model::{CoverageMetrics, CoverageResult, FileCoverage, LineCoverage, LineKind};

/// Istanbul / NYC JSON parser.
pub struct IstanbulParser;

impl CoverageParser for IstanbulParser {
    fn format(&self) -> Format {
        Format::Istanbul
    }

    fn can_parse(&self, content: &str, path_hint: Option<&std::path::Path>) -> bool {
        if let Some(name) = path_hint
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        {
            if name.eq_ignore_ascii_case("coverage-final.json") {
                return true;
            }
        }

        let head = sniff_head(content);
        let trimmed = head.trim_start();
        trimmed.starts_with('{')
            && trimmed.contains("\"statementMap\"")
            && trimmed.contains("\"fnMap\"")
    }

    fn parse(&self, content: &str) -> Result<CoverageResult> {
        parse(content)
    }
}

/// Parse Istanbul JSON coverage data.
pub fn parse(content: &str) -> Result<CoverageResult> {
    let root: Value = serde_json::from_str(content).map_err(|source| CovcheckError::Json {
        format: Format::Istanbul,
        source,
    })?;

    let Some(entries) = root.as_object() else {
        return Err(parse_err(
            Format::Istanbul,
            "expected a top-level JSON object keyed by file path",
        ));
    };

    let mut files = Vec::with_capacity(entries.len());
    for (path, entry) in entries {
        files.push(parse_file_entry(path, entry));
    }

    let metrics = CoverageMetrics::from_files(&files);
    Ok(CoverageResult { metrics, files })
}

/// Parse a single `{ path: entry }` value.
fn parse_file_entry(path: &str, entry: &Value) -> FileCoverage {
    let mut file = FileCoverage::new(path);

    let (line_hits, stmt_total, stmt_covered) = collect_statements(entry);
    let (line_branches, branch_total, branch_covered) = collect_branches(entry);
    let (fn_total, fn_covered) = collect_functions(entry);

    for (line_number, hit_count) in line_hits {
        file.lines.push(LineCoverage::stmt(line_number, hit_count));
    }

    // Lines that also host a branch become conditional lines; a branch on a
    // line with no statement entry still surfaces.
    for (line_number, (covered, total)) in line_branches {
        match file.lines.iter_mut().find(|l| l.line_number == line_number) {
            Some(line) => {
                line.kind = LineKind::Conditional;
                line.branches_covered = covered;
                line.branches_total = total;
            }
            None => file
                .lines
                .push(LineCoverage::cond(line_number, u64::from(covered > 0), covered, total)),
        }
    }

    file.statements = stmt_total;
    file.covered_statements = stmt_covered;
    file.conditionals = branch_total;
    file.covered_conditionals = branch_covered;
    file.methods = fn_total;
    file.covered_methods = fn_covered;
    file.finalize();
    file
}

/// Walk `statementMap` + `s`: per-line max hit counts plus the raw
/// statement counters.
fn collect_statements(entry: &Value) -> (HashMap<u32, u64>, u64, u64) {
    let mut line_hits: HashMap<u32, u64> = HashMap::new();
    let mut total = 0u64;
    let mut covered = 0u64;

    let Some(stmt_map) = entry.get("statementMap").and_then(|v| v.as_object()) else {
        return (line_hits, total, covered);
    };
    let hits = entry.get("s").and_then(|v| v.as_object());

    for (idx, loc) in stmt_map {
        let count = hits
            .and_then(|h| h.get(idx.as_str()))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        total += 1;
        if count > 0 {
            covered += 1;
        }

        let Some(line) = start_line(loc) else { continue };
        line_hits
            .entry(line)
            .and_modify(|e| *e = (*e).max(count))
            .or_insert(count);
    }

    (line_hits, total, covered)
}

/// Walk `branchMap` + `b`: per-line (covered, total) arm pairs plus the raw
/// branch counters. Arm totals come from `locations.length`; an arm is
/// covered when its hit-count entry is > 0.
fn collect_branches(entry: &Value) -> (HashMap<u32, (u32, u32)>, u64, u64) {
    let mut line_branches: HashMap<u32, (u32, u32)> = HashMap::new();
    let mut total = 0u64;
    let mut covered = 0u64;

    let Some(branch_map) = entry.get("branchMap").and_then(|v| v.as_object()) else {
        return (line_branches, total, covered);
    };
    let hits = entry.get("b").and_then(|v| v.as_object());

    for (idx, branch_info) in branch_map {
        let arm_count = branch_info
            .get("locations")
            .and_then(|locs| locs.as_array())
            .map(|arr| arr.len())
            .unwrap_or(0);
        if arm_count == 0 {
            continue;
        }

        let arm_hits = hits
            .and_then(|h| h.get(idx.as_str()))
            .and_then(|v| v.as_array());
        let arms_covered = (0..arm_count)
            .filter(|&i| {
                arm_hits
                    .and_then(|arr| arr.get(i))
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0)
                    > 0
            })
            .count();

        total += arm_count as u64;
        covered += arms_covered as u64;

        // The branch anchors to `loc.start.line`, falling back to the first
        // location's start line.
        let line = branch_info
            .get("loc")
            .and_then(start_line)
            .or_else(|| {
                branch_info
                    .get("locations")
                    .and_then(|locs| locs.as_array())
                    .and_then(|arr| arr.first())
                    .and_then(start_line)
            });
        if let Some(line) = line {
            let pair = line_branches.entry(line).or_insert((0, 0));
            pair.0 += arms_covered as u32;
            pair.1 += arm_count as u32;
        }
    }

    (line_branches, total, covered)
}

/// Walk `fnMap` + `f`: function counters.
fn collect_functions(entry: &Value) -> (u64, u64) {
    let Some(fn_map) = entry.get("fnMap").and_then(|v| v.as_object()) else {
        return (0, 0);
    };
    let hits = entry.get("f").and_then(|v| v.as_object());

    let total = fn_map.len() as u64;
    let covered = fn_map
        .keys()
        .filter(|idx| {
            hits.and_then(|h| h.get(idx.as_str()))
                .and_then(|v| v.as_u64())
                .unwrap_or(0)
                > 0
        })
        .count() as u64;

    (total, covered)
}

fn start_line(loc: &Value) -> Option<u32> {
    loc.get("start")
        .and_then(|s| s.get("line"))
        .and_then(|l| l.as_u64())
        .map(|l| l as u32)
}
