use thiserror::Error;

use crate::detect::Format;

#[derive(Error, Debug)]
pub enum CovcheckError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{format} parse error at position {position}: {source}")]
    Xml {
        format: Format,
        source: quick_xml::Error,
        position: usize,
    },

    #[error("{format} parse error: {source}")]
    Json {
        format: Format,
        source: serde_json::Error,
    },

    #[error("{format} parse error: {message}")]
    Parse { format: Format, message: String },

    #[error("Unknown coverage format: '{0}'")]
    UnknownFormat(String),
}

pub type Result<T> = std::result::Result<T, CovcheckError>;
