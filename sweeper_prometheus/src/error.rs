use surf::http::Method;
use thiserror::Error;

/// Failure while decoding the text exposition format
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based line number of the offending line
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("invalid metric name {0:?}")]
    InvalidMetricName(String),
    #[error("invalid label name {0:?}")]
    InvalidLabelName(String),
    #[error("duplicate label name {0:?}")]
    DuplicateLabel(String),
    #[error("expected '=' after label name {0:?}")]
    ExpectedEquals(String),
    #[error("expected '\"' to open value of label {0:?}")]
    ExpectedQuote(String),
    #[error("unterminated value for label {0:?}")]
    UnterminatedLabelValue(String),
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("unexpected {0:?} in label set")]
    UnexpectedInLabels(char),
    #[error("unterminated label set")]
    UnterminatedLabels,
    #[error("missing sample value")]
    MissingValue,
    #[error("invalid sample value {0:?}")]
    InvalidValue(String),
    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),
    #[error("unexpected trailing text {0:?}")]
    TrailingText(String),
    #[error("unknown metric type {0:?}")]
    UnknownType(String),
    #[error("second HELP line for metric {0:?}")]
    DuplicateHelp(String),
    #[error("second TYPE line for metric {0:?}, or TYPE reported after samples")]
    DuplicateType(String),
}

/// Failure talking to the push-gateway, or decoding what it returned.
///
/// `surf::Error` does not implement `std::error::Error`, so transport failures are
/// carried by value and rendered in the message.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("{method} {url} failed: {error}")]
    Transport {
        method: Method,
        url: String,
        error: surf::Error,
    },
    #[error("{method} {url} timed out")]
    Timeout { method: Method, url: String },
    #[error("unexpected status code {status} from {method} {url}")]
    UnexpectedStatus {
        method: Method,
        url: String,
        status: u16,
    },
    #[error("failed to parse metrics: {0}")]
    Decode(#[from] ParseError),
    #[error("failed to write audit line: {0}")]
    Audit(#[from] std::io::Error),
}

pub type SweepResult<T> = std::result::Result<T, SweepError>;
