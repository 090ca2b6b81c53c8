/// Parser for Clover XML coverage reports.
///
/// Clover XML structure (as produced by OpenClover, Atlassian Clover, and
/// plugins like `jest --coverageReporters=clover`, PHPUnit, etc.):
///
///   <coverage generated="..." clover="4.x.x">
///     <project timestamp="..." name="...">
///       <metrics statements="..." coveredstatements="..." .../>
///       <package name="...">
///         <file name="Foo.py" path="/absolute/path/to/Foo.py">
///           <metrics statements="..." coveredstatements="..." .../>
///           <class name="Foo"><metrics .../></class>
///           <line num="1" count="5" type="stmt"/>
///           <line num="3" count="2" type="method" signature="do_stuff()"/>
///           <line num="5" count="1" type="cond" truecount="1" falsecount="1"/>
///         </file>
///       </package>
///     </project>
///   </coverage>
///
/// Metrics appear at project, package, file, and class scope. File-scope
/// metrics are trusted for the file's counters; lines are only tallied when
/// the file carries no metrics element. Project-scope metrics back the
/// report totals when no files were produced at all.
///
/// A `cond` line's truecount/falsecount are execution counts of the true and
/// false outcomes; the line normalizes to one condition with two arms, an arm
/// counting as covered when its outcome was ever taken.
use quick_xml::events::Event;
use quick_xml::Reader;

use super::{attr_map, get_attr, looks_like_xml, parse_err, sniff_head, xml_err};
use super::{CoverageParser, Format};
use crate::error::Result;
use crate::model::{CoverageMetrics, CoverageResult, FileCoverage, LineCoverage};

/// Clover XML format parser.
pub struct CloverParser;

impl CoverageParser for CloverParser {
    fn format(&self) -> Format {
        Format::Clover
    }

    fn can_parse(&self, content: &str, _path_hint: Option<&std::path::Path>) -> bool {
        let head = sniff_head(content);
        // The `clover` version attribute on the <coverage> root distinguishes
        // Clover from Cobertura (which also uses <coverage>).
        looks_like_xml(head) && head.contains("<coverage") && head.contains("clover=")
    }

    fn parse(&self, content: &str) -> Result<CoverageResult> {
        parse(content)
    }
}

/// The six counters a Clover `<metrics>` element carries.
#[derive(Debug, Clone, Copy)]
struct MetricsAttrs {
    statements: u64,
    covered_statements: u64,
    conditionals: u64,
    covered_conditionals: u64,
    methods: u64,
    covered_methods: u64,
}

impl MetricsAttrs {
    fn from_element(attrs: &std::collections::HashMap<String, String>) -> Self {
        let get = |key: &str| {
            attrs
                .get(key)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
        };
        Self {
            statements: get("statements"),
            covered_statements: get("coveredstatements"),
            conditionals: get("conditionals"),
            covered_conditionals: get("coveredconditionals"),
            methods: get("methods"),
            covered_methods: get("coveredmethods"),
        }
    }

    fn apply_to(&self, file: &mut FileCoverage) {
        file.statements = self.statements;
        file.covered_statements = self.covered_statements;
        file.conditionals = self.conditionals;
        file.covered_conditionals = self.covered_conditionals;
        file.methods = self.methods;
        file.covered_methods = self.covered_methods;
    }

    fn into_metrics(self) -> CoverageMetrics {
        let mut metrics = CoverageMetrics {
            statements: self.statements,
            covered_statements: self.covered_statements,
            conditionals: self.conditionals,
            covered_conditionals: self.covered_conditionals,
            methods: self.methods,
            covered_methods: self.covered_methods,
            ..Default::default()
        };
        metrics.update_rates();
        metrics
    }
}

/// Parse Clover XML coverage data.
pub fn parse(content: &str) -> Result<CoverageResult> {
    let mut reader = Reader::from_reader(content.as_bytes());
    let mut buf = Vec::new();

    let mut files: Vec<FileCoverage> = Vec::new();
    let mut saw_root = false;

    // Scope tracking: metrics elements mean different things depending on
    // which element encloses them.
    let mut in_project = false;
    let mut in_package = false;
    let mut in_class = false;
    let mut current_file: Option<FileCoverage> = None;
    let mut file_metrics: Option<MetricsAttrs> = None;
    let mut project_metrics: Option<MetricsAttrs> = None;

    loop {
        let event = reader.read_event_into(&mut buf);
        match event {
            Err(e) => return Err(xml_err(Format::Clover, e, &reader)),
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"coverage" => saw_root = true,
                b"project" => in_project = true,
                b"package" => in_package = true,
                b"class" => in_class = true,
                b"file" => {
                    // Prefer the `path` attribute (absolute) over `name`
                    // (basename).
                    let path = get_attr(e, b"path")
                        .or_else(|| get_attr(e, b"name"))
                        .unwrap_or_default();
                    current_file = Some(FileCoverage::new(path));
                    file_metrics = None;
                }
                b"metrics" => {
                    if in_class {
                        // Class metrics repeat the file's numbers per class;
                        // never let them shadow the file scope.
                    } else if current_file.is_some() {
                        file_metrics = Some(MetricsAttrs::from_element(&attr_map(e)));
                    } else if !in_package && in_project && project_metrics.is_none() {
                        project_metrics = Some(MetricsAttrs::from_element(&attr_map(e)));
                    }
                }
                b"line" => {
                    if let Some(file) = current_file.as_mut() {
                        let attrs = attr_map(e);
                        let num = attrs.get("num").and_then(|v| v.parse::<u32>().ok());
                        let count = attrs
                            .get("count")
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(0);

                        if let Some(line_number) = num {
                            let line = match attrs.get("type").map(String::as_str) {
                                Some("method") => LineCoverage::method(line_number, count),
                                Some("cond") => {
                                    let truecount = attrs
                                        .get("truecount")
                                        .and_then(|v| v.parse::<u64>().ok())
                                        .unwrap_or(0);
                                    let falsecount = attrs
                                        .get("falsecount")
                                        .and_then(|v| v.parse::<u64>().ok())
                                        .unwrap_or(0);
                                    let covered =
                                        u32::from(truecount > 0) + u32::from(falsecount > 0);
                                    LineCoverage::cond(line_number, count, covered, 2)
                                }
                                _ => LineCoverage::stmt(line_number, count),
                            };
                            file.lines.push(line);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"project" => in_project = false,
                b"package" => in_package = false,
                b"class" => in_class = false,
                b"file" => {
                    if let Some(file) = current_file.take() {
                        files.push(finish_file(file, file_metrics.take()));
                    }
                }
                _ => {}
            },
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(parse_err(Format::Clover, "missing <coverage> root element"));
    }

    // Handle unclosed file
    if let Some(file) = current_file.take() {
        files.push(finish_file(file, file_metrics.take()));
    }

    let metrics = if files.is_empty() {
        project_metrics
            .map(MetricsAttrs::into_metrics)
            .unwrap_or_default()
    } else {
        CoverageMetrics::from_files(&files)
    };

    Ok(CoverageResult { metrics, files })
}

fn finish_file(mut file: FileCoverage, metrics: Option<MetricsAttrs>) -> FileCoverage {
    match metrics {
        Some(m) => m.apply_to(&mut file),
        None => file.tally_counters(),
    }
    file.finalize();
    file
}
