use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure is fatal for the run: there is no partial-success mode, since
/// dropping or misassigning a record breaks the 1:1 ordering the merge relies on.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    ExternalProcess(#[from] ExternalProcessError),

    #[error(transparent)]
    InputRange(#[from] InputRangeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// A line that could not be decoded as an alignment record.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed SAM line, possibly header? found {found} of {expected} mandatory fields")]
    TooFewFields { found: usize, expected: usize },

    #[error("invalid {field} value: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("sequence length {sequence} does not match quality length {quality}")]
    LengthMismatch { sequence: usize, quality: usize },

    #[error("malformed optional field: {0:?}")]
    MalformedOptionalField(String),

    #[error("unknown optional field type {type_code:?} in {field:?}")]
    UnknownFieldType { type_code: String, field: String },

    #[error("invalid {type_code} value in optional field {field:?}")]
    InvalidFieldValue { type_code: char, field: String },

    #[error("read id {0:?} has a READ_POS value that is not a position")]
    MissingReadPosition(String),

    #[error("malformed alignment info line: {0:?}")]
    MalformedAlnLine(String),

    #[error("malformed predictions row {row}: {reason}")]
    MalformedPrediction { row: u64, reason: String },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FormatError {
    #[error("CIGAR string {cigar:?} does not tokenize at byte {offset}")]
    Untokenizable { cigar: String, offset: usize },

    #[error("CIGAR string {cigar:?} has a run length that does not fit")]
    RunLengthOverflow { cigar: String },
}

/// The two passes, or the record and prediction streams, disagree.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("read {0:?} missing from the mapping count table; input changed between passes?")]
    MissingMultiplicity(String),

    #[error("read {0:?} has no ground-truth position")]
    MissingTruth(String),

    #[error("prediction stream desynchronized at row {row}: expected {expected:?}, found {found:?}")]
    Desynchronized {
        row: u64,
        expected: String,
        found: String,
    },

    #[error("prediction stream ended before read {0:?}")]
    PredictionsExhausted(String),

    #[error("{0} prediction rows left over after the last mapped record")]
    UnconsumedPredictions(u64),

    #[error("chunk {expected} missing from recalibration output (next available: {found:?})")]
    MissingChunk { expected: usize, found: Option<usize> },
}

#[derive(thiserror::Error, Debug)]
pub enum ExternalProcessError {
    #[error("model command template is empty")]
    EmptyTemplate,

    #[error("failed to launch {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command:?} exited with {status}")]
    Failed { command: String, status: ExitStatus },

    #[error("{command:?} did not finish within {timeout:?}")]
    TimedOut { command: String, timeout: Duration },

    #[error("model file {0} does not exist")]
    MissingModel(PathBuf),
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum InputRangeError {
    #[error("prediction {value} for read {read_id:?} is outside [0, 1)")]
    Probability { read_id: String, value: f64 },
}
