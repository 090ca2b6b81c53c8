/// Parser for the LCOV `.info` format.
///
/// Reference: https://ltp.sourceforge.net/coverage/lcov/geninfo.1.php
///
/// Key records:
///   TN:<test name>
///   SF:<path to source file>
///   FN:<line>,<function name>
///   FNDA:<execution count>,<function name>
///   FNF:<number of functions found>
///   FNH:<number of functions hit>
///   DA:<line number>,<execution count>[,<checksum>]
///   BRDA:<line>,<block>,<branch>,<taken>   ("-" means not taken)
///   BRF:<branches found>
///   BRH:<branches hit>
///   LF:<lines found>
///   LH:<lines hit>
///   end_of_record
///
/// The summary records (LF/LH/FNF/FNH/BRF/BRH) are authoritative for the
/// file's counters when present; otherwise counters derive from the
/// DA/BRDA/FN/FNDA records. Multiple BRDA records sharing a line number
/// aggregate into one branch pair on that line.
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{CoverageParser, Format};
use crate::error::Result;
use crate::model::{CoverageMetrics, CoverageResult, FileCoverage, LineCoverage, LineKind};

/// LCOV format parser.
pub struct LcovParser;

impl CoverageParser for LcovParser {
    fn format(&self) -> Format {
        Format::Lcov
    }

    fn can_parse(&self, content: &str, _path_hint: Option<&std::path::Path>) -> bool {
        // Check that lines actually start with the record tags to avoid
        // false positives on files that merely contain these strings.
        let head = super::sniff_head(content);
        let has_sf = head.lines().any(|l| l.starts_with("SF:"));
        let has_da_or_fn = head
            .lines()
            .any(|l| l.starts_with("DA:") || l.starts_with("FN:"));
        has_sf && has_da_or_fn
    }

    fn parse(&self, content: &str) -> Result<CoverageResult> {
        parse(content)
    }
}

/// Per-record accumulator, flushed at each `end_of_record`.
#[derive(Default)]
struct Record {
    path: String,
    /// line number → hit count, from DA records.
    da: BTreeMap<u32, u64>,
    /// line number → (arms taken, arm count), from BRDA records.
    brda: BTreeMap<u32, (u32, u32)>,
    /// Function names seen in FN records.
    fn_names: HashSet<String>,
    /// function name → execution count, from FNDA records.
    fn_hits: HashMap<String, u64>,
    lf: Option<u64>,
    lh: Option<u64>,
    fnf: Option<u64>,
    fnh: Option<u64>,
    brf: Option<u64>,
    brh: Option<u64>,
}

impl Record {
    fn new(path: String) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    fn into_file(self) -> FileCoverage {
        let mut file = FileCoverage::new(self.path);

        for (&line_number, &hit_count) in &self.da {
            file.lines.push(LineCoverage::stmt(line_number, hit_count));
        }

        // Attach aggregated branch pairs; a BRDA line without a DA record
        // still surfaces as a conditional line, hit iff any arm was taken.
        for (&line_number, &(covered, total)) in &self.brda {
            match file.lines.iter_mut().find(|l| l.line_number == line_number) {
                Some(line) => {
                    line.kind = LineKind::Conditional;
                    line.branches_covered = covered;
                    line.branches_total = total;
                }
                None => {
                    file.lines
                        .push(LineCoverage::cond(line_number, u64::from(covered > 0), covered, total));
                }
            }
        }

        let derived_fn_total = {
            let mut names: HashSet<&String> = self.fn_names.iter().collect();
            names.extend(self.fn_hits.keys());
            names.len() as u64
        };
        let derived_fn_hit = self.fn_hits.values().filter(|&&c| c > 0).count() as u64;

        file.statements = self.lf.unwrap_or(self.da.len() as u64);
        file.covered_statements = self
            .lh
            .unwrap_or_else(|| self.da.values().filter(|&&c| c > 0).count() as u64);
        file.conditionals = self
            .brf
            .unwrap_or_else(|| self.brda.values().map(|&(_, t)| u64::from(t)).sum());
        file.covered_conditionals = self
            .brh
            .unwrap_or_else(|| self.brda.values().map(|&(c, _)| u64::from(c)).sum());
        file.methods = self.fnf.unwrap_or(derived_fn_total);
        file.covered_methods = self.fnh.unwrap_or(derived_fn_hit);

        file.finalize();
        file
    }
}

/// Parse LCOV coverage data.
pub fn parse(content: &str) -> Result<CoverageResult> {
    let mut files: Vec<FileCoverage> = Vec::new();
    let mut current: Option<Record> = None;

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "end_of_record" {
            if let Some(record) = current.take() {
                files.push(record.into_file());
            }
            continue;
        }

        // Split on first ':'
        let Some((tag, value)) = line.split_once(':') else {
            continue; // Skip lines we don't understand
        };

        match tag {
            "TN" => {
                // Test name — ignored.
            }
            "SF" => {
                // A new SF before end_of_record implicitly closes the
                // previous record.
                if let Some(record) = current.take() {
                    files.push(record.into_file());
                }
                current = Some(Record::new(value.to_string()));
            }
            "FN" => {
                if let Some(record) = current.as_mut() {
                    if let Some((_line_str, name)) = value.split_once(',') {
                        record.fn_names.insert(name.to_string());
                    }
                }
            }
            "FNDA" => {
                if let Some(record) = current.as_mut() {
                    if let Some((count_str, name)) = value.split_once(',') {
                        let count = count_str.parse::<u64>().unwrap_or(0);
                        record.fn_hits.insert(name.to_string(), count);
                    }
                }
            }
            "DA" => {
                // DA:<line_number>,<execution_count>[,<checksum>]
                // Some instrumenters use negative counts (e.g. -1) for
                // non-instrumentable lines; those are skipped entirely.
                if let Some(record) = current.as_mut() {
                    let parts: Vec<&str> = value.splitn(3, ',').collect();
                    if parts.len() >= 2 {
                        if let Ok(line_number) = parts[0].parse::<u32>() {
                            if let Ok(count) = parts[1].parse::<i64>() {
                                if count >= 0 {
                                    let entry =
                                        record.da.entry(line_number).or_insert(0);
                                    *entry = (*entry).max(count as u64);
                                }
                            }
                        }
                    }
                }
            }
            "BRDA" => {
                // BRDA:<line>,<block>,<branch>,<taken> — "-" means not taken.
                if let Some(record) = current.as_mut() {
                    let parts: Vec<&str> = value.splitn(4, ',').collect();
                    if parts.len() == 4 {
                        if let Ok(line_number) = parts[0].parse::<u32>() {
                            let taken = if parts[3] == "-" {
                                0
                            } else {
                                parts[3].parse::<u64>().unwrap_or(0)
                            };
                            let pair = record.brda.entry(line_number).or_insert((0, 0));
                            pair.1 += 1;
                            if taken > 0 {
                                pair.0 += 1;
                            }
                        }
                    }
                }
            }
            "LF" => set_summary(&mut current, value, |r, v| r.lf = Some(v)),
            "LH" => set_summary(&mut current, value, |r, v| r.lh = Some(v)),
            "FNF" => set_summary(&mut current, value, |r, v| r.fnf = Some(v)),
            "FNH" => set_summary(&mut current, value, |r, v| r.fnh = Some(v)),
            "BRF" => set_summary(&mut current, value, |r, v| r.brf = Some(v)),
            "BRH" => set_summary(&mut current, value, |r, v| r.brh = Some(v)),
            _ => {}
        }
    }

    // Handle input ending without a final end_of_record
    if let Some(record) = current.take() {
        files.push(record.into_file());
    }

    let metrics = CoverageMetrics::from_files(&files);
    Ok(CoverageResult { metrics, files })
}

fn set_summary(current: &mut Option<Record>, value: &str, set: impl FnOnce(&mut Record, u64)) {
    if let Some(record) = current.as_mut() {
        if let Ok(v) = value.trim().parse::<u64>() {
            set(record, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lcov() {
        let input = include_str!("../../tests/fixtures/sample.lcov");
        let result = parse(input).unwrap();

        assert_eq!(result.files.len(), 2);

        let lib = &result.files[0];
        assert_eq!(lib.path, "/src/lib.rs");
        assert_eq!(lib.lines.len(), 6);
        assert_eq!(lib.lines[0].line_number, 1);
        assert_eq!(lib.lines[0].hit_count, 5);

        // Two BRDA records on line 2 aggregate into one pair.
        let branch = lib.lines.iter().find(|l| l.line_number == 2).unwrap();
        assert_eq!(branch.kind, LineKind::Conditional);
        assert_eq!(branch.branches_covered, 1);
        assert_eq!(branch.branches_total, 2);

        // Summary records are authoritative.
        assert_eq!(lib.statements, 6);
        assert_eq!(lib.covered_statements, 3);
        assert_eq!(lib.conditionals, 2);
        assert_eq!(lib.covered_conditionals, 1);
        assert_eq!(lib.methods, 2);
        assert_eq!(lib.covered_methods, 1);
        assert_eq!(lib.line_rate, 50.0);
        assert_eq!(lib.missing_lines, vec![3, 4, 7]);
        assert_eq!(lib.partial_lines, vec![2]);

        let util = &result.files[1];
        assert_eq!(util.path, "/src/util.rs");
        assert_eq!(util.statements, 4);
        assert_eq!(util.covered_statements, 4);
        assert_eq!(util.line_rate, 100.0);

        // Aggregated metrics: 10 lines, 7 hit.
        assert_eq!(result.metrics.statements, 10);
        assert_eq!(result.metrics.covered_statements, 7);
        assert_eq!(result.metrics.line_rate, 70.0);
    }

    #[test]
    fn test_parse_lcov_derives_counts_without_summaries() {
        let input = "SF:/src/a.rs\nFN:1,main\nFNDA:5,main\nDA:1,5\nDA:2,0\nBRDA:1,0,0,5\nBRDA:1,0,1,-\nend_of_record\n";
        let result = parse(input).unwrap();
        let file = &result.files[0];
        assert_eq!(file.statements, 2);
        assert_eq!(file.covered_statements, 1);
        assert_eq!(file.conditionals, 2);
        assert_eq!(file.covered_conditionals, 1);
        assert_eq!(file.methods, 1);
        assert_eq!(file.covered_methods, 1);
    }

    #[test]
    fn test_parse_lcov_no_end_of_record() {
        let input = "SF:/src/lib.rs\nDA:1,5\nDA:2,0\n";
        let result = parse(input).unwrap();
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].lines.len(), 2);
    }

    #[test]
    fn test_parse_lcov_negative_counts_skipped() {
        let input = "SF:/src/lib.rs\nDA:1,5\nDA:2,-1\nDA:3,0\nDA:4,3\nend_of_record\n";
        let result = parse(input).unwrap();
        let file = &result.files[0];
        assert_eq!(file.lines.len(), 3);
        assert_eq!(file.lines[0].line_number, 1);
        assert_eq!(file.lines[1].line_number, 3);
        assert_eq!(file.lines[2].line_number, 4);
        assert_eq!(file.statements, 3);
    }

    #[test]
    fn test_parse_lcov_branch_without_da_line() {
        let input = "SF:/src/lib.rs\nBRDA:9,0,0,2\nBRDA:9,0,1,1\nend_of_record\n";
        let result = parse(input).unwrap();
        let file = &result.files[0];
        assert_eq!(file.lines.len(), 1);
        assert_eq!(file.lines[0].line_number, 9);
        assert_eq!(file.lines[0].kind, LineKind::Conditional);
        assert_eq!(file.lines[0].hit_count, 1);
        assert_eq!(file.conditionals, 2);
        assert_eq!(file.covered_conditionals, 2);
    }

    #[test]
    fn test_parse_lcov_empty() {
        let result = parse("TN:test\n").unwrap();
        assert!(result.files.is_empty());
        assert_eq!(result.metrics.statements, 0);
        assert_eq!(result.metrics.line_rate, 0.0);
    }

    #[test]
    fn test_can_parse_lcov() {
        let parser = LcovParser;
        assert!(parser.can_parse("TN:test\nSF:/src/lib.rs\nDA:1,5\nend_of_record\n", None));
        assert!(!parser.can_parse("<?xml version=\"1.0\"?><coverage>", None));
        // Mentions of the tags mid-line must not match.
        assert!(!parser.can_parse("this file discusses SF: and DA: records", None));
    }
}
