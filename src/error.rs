use std::path::PathBuf;
use thiserror::Error;

use crate::db::{ChunkKey, IbanError, MoneyError};

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid IBAN {value:?} in line {line}: {source}")]
    InvalidIban {
        line: usize,
        value: String,
        #[source]
        source: IbanError,
    },

    #[error("Invalid amount {value:?} in line {line}: {source}")]
    InvalidAmount {
        line: usize,
        value: String,
        #[source]
        source: MoneyError,
    },

    #[error("Invalid date {value:?} in line {line}")]
    InvalidDate { line: usize, value: String },

    #[error("Line {line} has {found} columns but the header has {expected}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Unrecognized CSV headers: {header:?}")]
    UnrecognizedFormat { header: Vec<String> },

    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Entry for {entry} does not belong to chunk {chunk}")]
    PartitionMismatch { chunk: ChunkKey, entry: ChunkKey },

    #[error("Chunk file {} is corrupt", .path.display())]
    CorruptChunk {
        path: PathBuf,
        #[source]
        source: crate::db::FileError,
    },

    #[error("Metadata file {} is corrupt", .path.display())]
    CorruptMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to {op} {}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} already contains a database", .path.display())]
    AlreadyExists { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
