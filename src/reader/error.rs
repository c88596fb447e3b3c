use thiserror::Error;

#[doc = r#"
A set of errors that can occur while decoding track data out of the shared buffer
"#]
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Reading at Position {position}, {kind}")]
pub struct ReaderError {
    position: usize,
    pub(crate) kind: ReaderErrorKind,
}

/// A kind of error that a reader can produce
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ReaderErrorKind {
    /// Reading out of bounds.
    #[error("Read out of bounds!")]
    OutOfBounds,
    /// A data byte appeared before any status byte.
    #[error("Data byte {0:#04x} without a running status")]
    MissingStatus(u8),
    /// A variable-length quantity had more than four bytes.
    #[error("Variable-length quantity exceeds four bytes")]
    VlqOverflow,
}

impl ReaderError {
    /// Create a reader error from a position and kind
    pub const fn new(position: usize, kind: ReaderErrorKind) -> Self {
        Self { position, kind }
    }
    /// True if out of bounds or unexpected end of track
    pub const fn is_out_of_bounds(&self) -> bool {
        matches!(self.kind, ReaderErrorKind::OutOfBounds)
    }
    /// Returns the error kind of the reader.
    pub fn error_kind(&self) -> &ReaderErrorKind {
        &self.kind
    }
    /// Returns the position where the read error occurred.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Create a new out of bounds error
    pub const fn oob(position: usize) -> Self {
        Self {
            position,
            kind: ReaderErrorKind::OutOfBounds,
        }
    }
}

/// The Read Result type (see [`ReaderError`])
pub type ReadResult<T> = Result<T, ReaderError>;
