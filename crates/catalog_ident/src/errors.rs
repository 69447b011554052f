use crate::registry::Operation;
use crate::section::Section;

#[derive(Debug, thiserror::Error)]
pub enum IdentError {
    #[error("cannot encode segments under the null section")]
    InvalidSection,

    #[error("segment {index} contains a NUL byte and cannot use the delimited format")]
    InvalidSegment { index: usize },

    #[error("unknown section tag: {0}")]
    UnknownSection(u8),

    #[error("unknown section name: {0}")]
    UnknownSectionName(String),

    #[error("malformed internal id: {0}")]
    MalformedId(String),

    #[error("expected id of section {expected}, got {actual}")]
    SectionMismatch { expected: Section, actual: Section },

    #[error("{operation} on {section} rejected: {reason}")]
    OperationRejected {
        operation: Operation,
        section: Section,
        reason: String,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T, E = IdentError> = std::result::Result<T, E>;

macro_rules! malformed {
    ($($arg:tt)*) => {
        crate::errors::IdentError::MalformedId(std::format!($($arg)*))
    };
}
pub(crate) use malformed;
