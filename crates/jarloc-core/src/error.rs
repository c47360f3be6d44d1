//! Error types for the jarloc-core library.
//!
//! Library calls return the first error they hit. The scan pipeline is the
//! one place that keeps going: any failure on a single entry is logged and
//! recorded as a skip.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for jarloc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all jarloc operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read an archive from disk
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write an archive to disk
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Malformed class file or code buffer
    #[error("malformed class data at offset {offset}: {details}")]
    Decode {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Opcode with no entry in the instruction table
    #[error("unknown opcode 0x{opcode:02x} at bytecode offset {offset}")]
    UnknownOpcode {
        /// The offending opcode byte
        opcode: u8,
        /// Offset of the opcode within the code buffer
        offset: usize,
    },

    /// A constant-pool index does not name the kind of entry the caller needs
    #[error("constant pool index {index} is not a valid {expected} entry")]
    InvalidConstantReference {
        /// The constant-pool index
        index: u16,
        /// What the index was expected to point at
        expected: &'static str,
    },

    /// Encoded string does not fit a Utf8 entry's u16 length prefix
    #[error("encoded string is {len} bytes, a constant pool entry holds at most 65535")]
    StringTooLong {
        /// Encoded length in bytes
        len: usize,
    },

    /// An archive entry named by the caller does not exist
    #[error("archive entry '{name}' not found")]
    ArchiveEntryMissing {
        /// The entry name
        name: String,
    },

    /// The zip container itself could not be read or written
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new decode error
    pub fn decode(offset: usize, details: impl Into<String>) -> Self {
        Self::Decode {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new invalid constant reference error
    pub fn invalid_constant(index: u16, expected: &'static str) -> Self {
        Self::InvalidConstantReference { index, expected }
    }

    /// Creates a new missing entry error
    pub fn entry_missing(name: impl Into<String>) -> Self {
        Self::ArchiveEntryMissing { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::entry_missing("com/example/Main.class");
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("com/example/Main.class"));

        let err = Error::UnknownOpcode {
            opcode: 0xfe,
            offset: 12,
        };
        assert_eq!(err.to_string(), "unknown opcode 0xfe at bytecode offset 12");
    }

    #[test]
    fn test_constructors() {
        assert!(matches!(
            Error::decode(7, "truncated"),
            Error::Decode { offset: 7, .. }
        ));
        assert!(matches!(
            Error::invalid_constant(3, "Utf8"),
            Error::InvalidConstantReference { index: 3, expected: "Utf8" }
        ));
    }
}
