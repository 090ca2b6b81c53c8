pub mod clover;
pub mod cobertura;
pub mod codecov;
pub mod gocover;
pub mod istanbul;
pub mod jacoco;
pub mod lcov;

use std::collections::HashMap;
use std::path::Path;

use quick_xml::events::BytesStart;

pub use crate::detect::Format;
use crate::error::{CovcheckError, Result};
use crate::model::CoverageResult;

/// Every format parser implements this trait.
///
/// `can_parse` is a cheap content-signature test and must never panic or
/// allocate heavily; `parse` raises a typed error naming the format on
/// malformed input. Parsers hold no state; detection order lives in the
/// [`crate::detect::ParserRegistry`].
pub trait CoverageParser {
    /// The format this parser handles.
    fn format(&self) -> Format;

    /// Cheap signature test. The optional path is a hint only; content
    /// markers take precedence and each format's check excludes the
    /// signatures of sibling formats.
    fn can_parse(&self, content: &str, path_hint: Option<&Path>) -> bool;

    /// Parse the input into the uniform coverage model.
    fn parse(&self, content: &str) -> Result<CoverageResult>;
}

/// How much of the content signature checks look at.
const SNIFF_LEN: usize = 4096;

/// The first few KiB of the content, for cheap signature checks.
pub(crate) fn sniff_head(content: &str) -> &str {
    if content.len() <= SNIFF_LEN {
        return content;
    }
    let mut end = SNIFF_LEN;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

/// Does this look like an XML document?
pub(crate) fn looks_like_xml(head: &str) -> bool {
    head.contains("<?xml") || head.trim_start().starts_with('<')
}

/// Wrap a quick-xml error with the format tag and the reader's position.
pub(crate) fn xml_err<R>(
    format: Format,
    source: quick_xml::Error,
    reader: &quick_xml::Reader<R>,
) -> CovcheckError {
    CovcheckError::Xml {
        format,
        source,
        position: reader.buffer_position(),
    }
}

/// A parse error for a structural problem the XML/JSON layer can't see.
pub(crate) fn parse_err(format: Format, message: impl Into<String>) -> CovcheckError {
    CovcheckError::Parse {
        format,
        message: message.into(),
    }
}

/// Fetch a single attribute value from an XML element.
pub(crate) fn get_attr(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes().flatten().find_map(|attr| {
        if attr.key.local_name().as_ref() == name {
            attr.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

/// Extract all attributes of an XML element into a map.
pub(crate) fn attr_map(e: &BytesStart) -> HashMap<String, String> {
    e.attributes()
        .filter_map(|a| {
            let attr = a.ok()?;
            let key = std::str::from_utf8(attr.key.local_name().into_inner())
                .ok()?
                .to_string();
            let value = attr.unescape_value().ok()?.to_string();
            Some((key, value))
        })
        .collect()
}
