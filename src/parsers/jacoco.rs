/// Parser for JaCoCo XML coverage reports.
///
/// JaCoCo XML structure:
///   <report name="...">
///     <sessioninfo id="..." start="..." dump="..."/>
///     <package name="com/example">
///       <class name="com/example/Foo" sourcefilename="Foo.java">
///         <method name="doStuff" desc="()V" line="10">
///           <counter type="INSTRUCTION" missed="0" covered="5"/>
///           ...
///         </method>
///         <counter type="LINE" missed="1" covered="5"/>
///       </class>
///       <sourcefile name="Foo.java">
///         <line nr="10" mi="0" ci="3" mb="0" cb="2"/>
///         <counter type="LINE" missed="1" covered="5"/>
///         ...
///       </sourcefile>
///     </package>
///     <counter type="LINE" missed="2" covered="10"/>
///     ...
///   </report>
///
/// `<counter>` elements appear at method, class, sourcefile, package, and
/// report scope, so attribution depends on which element encloses them.
/// Sourcefile counters are authoritative for per-file totals and the
/// report-scope counters for the overall metrics. JaCoCo's instruction-based
/// accounting can diverge slightly from a re-sum of line records, so what
/// the report states is never re-derived.
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{attr_map, get_attr, looks_like_xml, parse_err, sniff_head, xml_err};
use super::{CoverageParser, Format};
use crate::error::Result;
use crate::model::{CoverageMetrics, CoverageResult, FileCoverage, LineCoverage};

/// JaCoCo XML format parser.
pub struct JacocoParser;

impl CoverageParser for JacocoParser {
    fn format(&self) -> Format {
        Format::Jacoco
    }

    fn can_parse(&self, content: &str, _path_hint: Option<&std::path::Path>) -> bool {
        let head = sniff_head(content);
        // XML with a <report element and either a JaCoCo DTD reference or
        // JaCoCo-specific child elements.
        looks_like_xml(head)
            && head.contains("<report")
            && (head.contains("jacoco") || head.contains("JACOCO") || head.contains("<package"))
    }

    fn parse(&self, content: &str) -> Result<CoverageResult> {
        parse(content)
    }
}

/// (missed, covered) pairs for the three counter types we keep.
#[derive(Debug, Default, Clone, Copy)]
struct CounterSet {
    line: Option<(u64, u64)>,
    branch: Option<(u64, u64)>,
    method: Option<(u64, u64)>,
}

impl CounterSet {
    fn record(&mut self, counter_type: &str, missed: u64, covered: u64) {
        match counter_type {
            "LINE" => self.line = Some((missed, covered)),
            "BRANCH" => self.branch = Some((missed, covered)),
            "METHOD" => self.method = Some((missed, covered)),
            _ => {}
        }
    }
}

/// Parse JaCoCo XML coverage data.
pub fn parse(content: &str) -> Result<CoverageResult> {
    let mut reader = Reader::from_reader(content.as_bytes());
    let mut buf = Vec::new();

    let mut files: Vec<FileCoverage> = Vec::new();
    let mut saw_root = false;

    // Scope tracking for counter attribution.
    let mut current_package: Option<String> = None;
    let mut in_class = false;
    let mut in_method = false;
    let mut current_file: Option<FileCoverage> = None;
    let mut file_counters = CounterSet::default();
    let mut report_counters = CounterSet::default();

    loop {
        let event = reader.read_event_into(&mut buf);
        let is_start_event = matches!(&event, Ok(Event::Start(_)));
        match event {
            Err(e) => return Err(xml_err(Format::Jacoco, e, &reader)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"report" => saw_root = true,
                b"package" => {
                    current_package = get_attr(e, b"name");
                }
                b"class" if is_start_event => in_class = true,
                b"method" if is_start_event => in_method = true,
                b"sourcefile" => {
                    if let Some(name) = get_attr(e, b"name") {
                        let path = match &current_package {
                            Some(pkg) if !pkg.is_empty() => format!("{}/{}", pkg, name),
                            _ => name,
                        };
                        current_file = Some(FileCoverage::new(path));
                        file_counters = CounterSet::default();
                    }
                }
                b"line" => {
                    if let Some(file) = current_file.as_mut() {
                        let attrs = attr_map(e);
                        let get =
                            |key: &str| attrs.get(key).and_then(|v| v.parse::<u64>().ok());
                        if let Some(nr) = attrs.get("nr").and_then(|v| v.parse::<u32>().ok()) {
                            let mi = get("mi").unwrap_or(0);
                            let ci = get("ci").unwrap_or(0);
                            let mb = get("mb").unwrap_or(0);
                            let cb = get("cb").unwrap_or(0);

                            // Only lines with at least one instruction (or
                            // branch) are instrumentable; ci is the hit count.
                            if mi + ci + mb + cb > 0 {
                                let total_branches = (mb + cb) as u32;
                                let line = if total_branches > 0 {
                                    LineCoverage::cond(nr, ci, cb as u32, total_branches)
                                } else {
                                    LineCoverage::stmt(nr, ci)
                                };
                                file.lines.push(line);
                            }
                        }
                    }
                }
                b"counter" => {
                    let attrs = attr_map(e);
                    let counter_type = attrs.get("type").cloned().unwrap_or_default();
                    let missed = attrs
                        .get("missed")
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(0);
                    let covered = attrs
                        .get("covered")
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(0);

                    if in_method || in_class {
                        // Method/class counters duplicate what the sourcefile
                        // scope reports.
                    } else if current_file.is_some() {
                        file_counters.record(&counter_type, missed, covered);
                    } else if current_package.is_none() {
                        report_counters.record(&counter_type, missed, covered);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"package" => current_package = None,
                b"class" => in_class = false,
                b"method" => in_method = false,
                b"sourcefile" => {
                    if let Some(file) = current_file.take() {
                        files.push(finish_file(file, file_counters));
                    }
                }
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(parse_err(Format::Jacoco, "missing <report> root element"));
    }

    // Handle unclosed sourcefile
    if let Some(file) = current_file.take() {
        files.push(finish_file(file, file_counters));
    }

    // Report-scope counters are authoritative; fall back to summing file
    // counters only where they are absent.
    let mut metrics = CoverageMetrics::from_files(&files);
    if let Some((missed, covered)) = report_counters.line {
        metrics.statements = missed + covered;
        metrics.covered_statements = covered;
    }
    if let Some((missed, covered)) = report_counters.branch {
        metrics.conditionals = missed + covered;
        metrics.covered_conditionals = covered;
    }
    if let Some((missed, covered)) = report_counters.method {
        metrics.methods = missed + covered;
        metrics.covered_methods = covered;
    }
    metrics.update_rates();

    Ok(CoverageResult { metrics, files })
}

fn finish_file(mut file: FileCoverage, counters: CounterSet) -> FileCoverage {
    file.tally_counters();
    if let Some((missed, covered)) = counters.line {
        file.statements = missed + covered;
        file.covered_statements = covered;
    }
    if let Some((missed, covered)) = counters.branch {
        file.conditionals = missed + covered;
        file.covered_conditionals = covered;
    }
    if let Some((missed, covered)) = counters.method {
        file.methods = missed + covered;
        file.covered_methods = covered;
    }
    file.finalize();
    file
}
