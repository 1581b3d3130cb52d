use thiserror::Error;

/// Errors surfaced by the relation, its page files and queries
#[derive(Error, Debug)]
pub enum MalhError {
    /// A stream could not be opened, read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad relation parameters, or an attribute count that does not match the relation
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed textual input such as a choice vector
    #[error("parse error: {0}")]
    Parse(String),

    /// The stored metadata or page files have the wrong shape
    #[error("corrupt metadata: {0}")]
    CorruptMetadata(String),

    /// The tuple does not fit even in an empty page
    #[error("tuple of {len} bytes does not fit in an empty page ({capacity} bytes)")]
    Capacity { len: usize, capacity: usize },
}

pub type Result<T> = std::result::Result<T, MalhError>;
