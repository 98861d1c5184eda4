use thiserror::Error;

/// Errors raised by the threshold-rule engine.
#[derive(Debug, Error, PartialEq)]
pub enum RuleError {
    #[error("please provide a valid condition; provided condition {0:?} is not valid")]
    UnknownCondition(String),

    #[error(
        "please use threshold 1 as lower bound and threshold 2 as upper bound \
         (got {lower} and {upper})"
    )]
    InvertedBounds { lower: f64, upper: f64 },

    #[error("please use different threshold values; provided thresholds are both {0}")]
    EqualBounds(f64),
}

#[derive(Debug, Error)]
pub enum Error {
    /// Bad user-supplied configuration: customer id, date range, thresholds,
    /// missing credentials.
    #[error("configuration error: {0}")]
    Config(String),

    /// The reporting API answered with an error payload.
    #[error("api error: {0}")]
    Api(String),

    /// The request never completed (connection, TLS, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not parseable JSON.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// An extraction or labeling produced zero rows; an empty report is an
    /// error condition, not a valid report.
    #[error("no rows to write to table {0:?}")]
    EmptyResult(String),

    #[error(transparent)]
    Rule(#[from] RuleError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }
}
