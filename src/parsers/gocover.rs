/// Parser for Go's `-coverprofile` format.
///
/// Reference: https://go.dev/blog/cover
///
/// Format:
///   mode: set|count|atomic
///   <file>:<startLine>.<startCol>,<endLine>.<endCol> <numStatements> <count>
///
/// Each line describes a basic block (a range of source lines) with the
/// number of statements in the block and how many times it was executed.
/// Blocks expand into per-line entries; a line touched by overlapping
/// blocks takes the max count, never the sum. This format carries no
/// branch or method data.
use std::collections::HashMap;

use super::{sniff_head, CoverageParser, Format};
use crate::error::Result;
use crate::model::{CoverageMetrics, CoverageResult, FileCoverage, LineCoverage};

/// Go coverage profile parser.
pub struct GocoverParser;

impl CoverageParser for GocoverParser {
    fn format(&self) -> Format {
        Format::Gocover
    }

    fn can_parse(&self, content: &str, _path_hint: Option<&std::path::Path>) -> bool {
        // First line is usually "mode: ...". The block-pattern fallback
        // catches profiles without a mode header (rare, but merging tools
        // produce them).
        let head = sniff_head(content);
        if let Some(first) = head.lines().next() {
            if first.starts_with("mode: ") {
                return true;
            }
        }
        head.lines().any(looks_like_go_block)
    }

    fn parse(&self, content: &str) -> Result<CoverageResult> {
        parse(content)
    }
}

/// A parsed block from a single profile line.
struct Block {
    start_line: u32,
    end_line: u32,
    count: u64,
}

/// Quick heuristic: does this line look like a Go coverage block?
/// e.g. "github.com/user/repo/file.go:10.1,20.5 3 1"
fn looks_like_go_block(line: &str) -> bool {
    let Some(colon_pos) = line.rfind(".go:") else {
        return false;
    };
    let after = &line[colon_pos + 4..];
    after.contains(',') && after.split_whitespace().count() >= 2
}

/// Parse a single block line, returning (file_path, Block).
///
/// Format: `<file>:<startLine>.<startCol>,<endLine>.<endCol> <numStmt> <count>`
fn parse_block_line(line: &str) -> Option<(&str, Block)> {
    // Anchor on the last ".go:" to split the file path from the block range;
    // this naturally handles paths containing colons.
    let colon_pos = line.rfind(".go:")? + 3; // position of ':'

    let file = &line[..colon_pos];
    let rest = &line[colon_pos + 1..];

    // rest = "startLine.startCol,endLine.endCol numStmt count"
    let (range, tail) = rest.split_once(' ')?;
    let (start, end) = range.split_once(',')?;

    let start_line: u32 = start.split_once('.')?.0.parse().ok()?;
    let end_line: u32 = end.split_once('.')?.0.parse().ok()?;

    let mut parts = tail.split_whitespace();
    let _num_stmt = parts.next()?;
    let count: u64 = parts.next()?.parse().ok()?;

    Some((
        file,
        Block {
            start_line,
            end_line,
            count,
        },
    ))
}

/// Parse Go coverage profile data.
pub fn parse(content: &str) -> Result<CoverageResult> {
    // Collect blocks grouped by file path, preserving first-appearance order.
    let mut file_order: Vec<String> = Vec::new();
    let mut file_blocks: HashMap<String, Vec<Block>> = HashMap::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("mode:") {
            continue;
        }

        if let Some((file, block)) = parse_block_line(line) {
            if !file_blocks.contains_key(file) {
                file_order.push(file.to_string());
            }
            file_blocks.entry(file.to_string()).or_default().push(block);
        }
    }

    let mut files = Vec::with_capacity(file_order.len());
    for file_path in file_order {
        if let Some(blocks) = file_blocks.remove(&file_path) {
            files.push(blocks_to_file_coverage(file_path, &blocks));
        }
    }

    let metrics = CoverageMetrics::from_files(&files);
    Ok(CoverageResult { metrics, files })
}

/// Convert the blocks for one file into a `FileCoverage`, expanding line
/// ranges with a max-reduction over a sparse map.
fn blocks_to_file_coverage(path: String, blocks: &[Block]) -> FileCoverage {
    let mut line_hits: HashMap<u32, u64> = HashMap::new();

    for block in blocks {
        for line_num in block.start_line..=block.end_line {
            let entry = line_hits.entry(line_num).or_insert(0);
            if block.count > *entry {
                *entry = block.count;
            }
        }
    }

    let mut file = FileCoverage::new(path);
    file.lines = line_hits
        .into_iter()
        .map(|(line_number, hit_count)| LineCoverage::stmt(line_number, hit_count))
        .collect();
    file.tally_counters();
    file.finalize();
    file
}
