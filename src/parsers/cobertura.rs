/// Parser for Cobertura XML coverage reports.
///
/// Cobertura XML structure:
///   <coverage line-rate="..." branch-rate="...">
///     <sources><source>...</source></sources>
///     <packages>
///       <package name="...">
///         <classes>
///           <class name="..." filename="..." line-rate="..." branch-rate="...">
///             <methods>
///               <method name="..." ... line-rate="...">
///                 <lines><line number="..." hits="..." .../></lines>
///               </method>
///             </methods>
///             <lines>
///               <line number="..." hits="..." branch="true|false"
///                     condition-coverage="50% (1/2)" />
///             </lines>
///           </class>
///         </classes>
///       </package>
///     </packages>
///   </coverage>
///
/// Two estimates are deliberate and known approximations, not bugs:
///   - A `branch="true"` line without a parsable condition-coverage string is
///     assumed to have exactly 2 branches, 1 of them covered iff the line was
///     hit at all.
///   - A class without `<method>` elements is credited with 1 method, covered
///     iff any of its statements were covered.
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use super::{attr_map, looks_like_xml, parse_err, sniff_head, xml_err};
use super::{CoverageParser, Format};
use crate::error::Result;
use crate::model::{CoverageMetrics, CoverageResult, FileCoverage, LineCoverage, LineKind};

/// Pre-compiled regex for condition-coverage attributes like "75% (3/4)".
static BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+)/(\d+)\)").unwrap());

/// Cobertura XML format parser.
pub struct CoberturaParser;

impl CoverageParser for CoberturaParser {
    fn format(&self) -> Format {
        Format::Cobertura
    }

    fn can_parse(&self, content: &str, _path_hint: Option<&std::path::Path>) -> bool {
        let head = sniff_head(content);
        // <coverage> + line-rate + <packages> is the Cobertura signature;
        // <project (Clover) and <report (JaCoCo) exclude sibling formats.
        looks_like_xml(head)
            && head.contains("<coverage")
            && head.contains("line-rate")
            && head.contains("<packages")
            && !head.contains("<project")
            && !head.contains("<report")
    }

    fn parse(&self, content: &str) -> Result<CoverageResult> {
        parse(content)
    }
}

/// Parse Cobertura XML coverage data.
pub fn parse(content: &str) -> Result<CoverageResult> {
    let mut reader = Reader::from_reader(content.as_bytes());
    let mut buf = Vec::new();

    let mut files: Vec<FileCoverage> = Vec::new();
    let mut saw_root = false;

    // State tracking
    let mut current_file: Option<FileCoverage> = None;
    let mut line_index_map: HashMap<u32, usize> = HashMap::new();
    let mut branch_done: HashSet<u32> = HashSet::new();
    let mut in_method = false;
    let mut method_hit = false;
    let mut method_count: u64 = 0;
    let mut methods_covered: u64 = 0;

    // Source prefix from <source> elements
    let mut sources: Vec<String> = Vec::new();
    let mut in_source = false;

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => return Err(xml_err(Format::Cobertura, e, &reader)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"coverage" => saw_root = true,
                b"source" => {
                    // Only set for Start events; a self-closing <source/> has
                    // no text and no End event, so the flag would leak onto
                    // the next unrelated Text event.
                    if is_start_event {
                        in_source = true;
                    }
                }
                b"class" => {
                    let attrs = attr_map(e);
                    if let Some(filename) = attrs.get("filename") {
                        let path = resolve_source_path(filename, &sources);
                        current_file = Some(FileCoverage::new(path));
                        line_index_map.clear();
                        branch_done.clear();
                        method_count = 0;
                        methods_covered = 0;
                    }
                }
                b"method" => {
                    in_method = true;
                    method_hit = false;
                }
                b"line" => {
                    let attrs = attr_map(e);
                    if let Some(file) = current_file.as_mut() {
                        if let Some(line_number) =
                            attrs.get("number").and_then(|v| v.parse::<u32>().ok())
                        {
                            let hits = attrs
                                .get("hits")
                                .and_then(|h| h.parse::<u64>().ok())
                                .unwrap_or(0);

                            // Lines may appear both under <method><lines> and
                            // <class><lines>; dedupe keeping the max hit count.
                            let idx = match line_index_map.get(&line_number) {
                                Some(&idx) => {
                                    if hits > file.lines[idx].hit_count {
                                        file.lines[idx].hit_count = hits;
                                    }
                                    idx
                                }
                                None => {
                                    line_index_map.insert(line_number, file.lines.len());
                                    file.lines.push(LineCoverage::stmt(line_number, hits));
                                    file.lines.len() - 1
                                }
                            };

                            if in_method && hits > 0 {
                                method_hit = true;
                            }

                            // Branch data — only on the first encounter of
                            // this line, so method/class duplicates don't
                            // double-count arms.
                            let is_branch =
                                attrs.get("branch").map(|v| v == "true").unwrap_or(false);
                            if is_branch && branch_done.insert(line_number) {
                                let parsed = attrs
                                    .get("condition-coverage")
                                    .and_then(|cond| BRANCH_RE.captures(cond))
                                    .and_then(|caps| {
                                        let covered: u32 = caps[1].parse().ok()?;
                                        let total: u32 = caps[2].parse().ok()?;
                                        Some((covered, total))
                                    });
                                // No parsable condition-coverage string:
                                // assume 2 branches, credit 1 if the line
                                // was hit (conservative estimate).
                                let (covered, total) =
                                    parsed.unwrap_or((u32::from(hits > 0), 2));
                                let line = &mut file.lines[idx];
                                line.kind = LineKind::Conditional;
                                line.branches_covered = covered;
                                line.branches_total = total;
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if in_source {
                    if let Ok(text) = e.unescape() {
                        let text = text.trim();
                        if !text.is_empty() {
                            sources.push(text.to_string());
                        }
                    }
                    in_source = false;
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"source" => in_source = false,
                b"method" => {
                    if in_method {
                        method_count += 1;
                        if method_hit {
                            methods_covered += 1;
                        }
                        in_method = false;
                    }
                }
                b"class" => {
                    if let Some(file) = current_file.take() {
                        files.push(finish_file(file, method_count, methods_covered));
                    }
                }
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(parse_err(
            Format::Cobertura,
            "missing <coverage> root element",
        ));
    }

    // Handle unclosed class
    if let Some(file) = current_file.take() {
        files.push(finish_file(file, method_count, methods_covered));
    }

    let metrics = CoverageMetrics::from_files(&files);
    Ok(CoverageResult { metrics, files })
}

fn finish_file(mut file: FileCoverage, method_count: u64, methods_covered: u64) -> FileCoverage {
    file.tally_counters();
    if method_count > 0 {
        file.methods = method_count;
        file.covered_methods = methods_covered;
    } else {
        // No <method> elements — estimate a single method, covered iff
        // anything in the class was.
        file.methods = 1;
        file.covered_methods = u64::from(file.covered_statements > 0);
    }
    file.finalize();
    file
}

/// Resolve a filename against the list of `<source>` prefixes.
///
/// - If the filename is already absolute, return it as-is.
/// - Otherwise, prepend the first non-empty source prefix.
/// - If no non-empty sources exist, return the filename unchanged.
fn resolve_source_path(filename: &str, sources: &[String]) -> String {
    if filename.starts_with('/') {
        return filename.to_string();
    }
    for source in sources {
        let base = source.trim_end_matches('/');
        if !base.is_empty() {
            return format!("{}/{}", base, filename);
        }
    }
    filename.to_string()
}
