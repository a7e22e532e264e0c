use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;


/// Errors raised by the pipeline stages.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: ExitStatus },

    #[error("empty command line")]
    EmptyCommand,

    #[error("dictionary data exceeds 4 GiB, offset {0} does not fit into 32 bits")]
    OffsetOverflow(u64),

    #[error("no JSONL data found at {0}")]
    NoData(PathBuf),

    #[error("malformed index file {path}: {reason}")]
    InvalidIndex { path: PathBuf, reason: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
