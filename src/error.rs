//! Typed errors for the extraction engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that abort a work unit.
///
/// Every variant except [`ExtractionError::Cancelled`] surfaces to the host
/// scheduler as a work-unit-level failure; the scheduler owns re-run policy.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Request or decode failure from the remote source
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Retriable auth failures exhausted the retry budget
    #[error("auth retries exhausted after {attempts} attempts")]
    AuthRetriesExhausted { attempts: u32 },

    /// The source returned no status at all (distinct from end-of-data)
    #[error("source returned no response")]
    EmptyResponse,

    /// The session key matched the configured fail pattern
    #[error("session fail condition matched: {key}")]
    FailConditionMatched { key: String },

    /// Neither the success nor the fail pattern resolved in time
    #[error("session timed out after {elapsed_ms}ms (limit {timeout_ms}ms)")]
    SessionTimeout { elapsed_ms: u128, timeout_ms: u64 },

    /// Fewer records than the configured minimum at normal completion
    #[error("work unit produced {processed} records, minimum is {minimum}")]
    InsufficientRecords { processed: u64, minimum: u64 },

    /// A configured pattern (session success/fail, name cleansing) is invalid
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// The declared processor chain could not be built
    #[error("processor error: {0}")]
    Processor(#[from] ProcessorError),

    /// Watermark bound could not be resolved
    #[error("watermark error: {0}")]
    Watermark(#[from] WatermarkError),

    /// The work unit already failed; no further cycles are possible
    #[error("work unit already failed")]
    AlreadyFailed,

    /// Operation was cancelled by the host
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors reported by a [`Source`](crate::traits::Source) collaborator.
///
/// Only [`SourceError::RetriableAuth`] is retried by the state machine;
/// everything else is immediately fatal to the owning work unit.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Authentication failure that may succeed on retry (expired token, etc.)
    #[error("retriable auth failure: {0}")]
    RetriableAuth(String),

    /// Transport failure (connection, protocol)
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The response could not be decoded into a status
    #[error("decode error: {0}")]
    Decode(String),
}

impl SourceError {
    /// Whether the state machine may retry this failure.
    pub fn is_retriable(&self) -> bool {
        matches!(self, SourceError::RetriableAuth(_))
    }
}

/// Errors from stream processors and the processor registry.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// No processor registered under this key
    #[error("unknown processor: {key}")]
    Unknown { key: String },

    /// The processor failed to transform the buffer
    #[error("processor {name} failed: {source}")]
    Process {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors resolving watermark bounds.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// The bound matched no date-time pattern, including the lenient fallback
    #[error("unparsable watermark bound: {value}")]
    UnparsableBound { value: String },

    /// The configured time zone name is not in the tz database
    #[error("unknown time zone: {zone}")]
    UnknownZone { zone: String },
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Result type alias for source operations.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// Result type alias for stream-processor operations.
pub type ProcessorResult<T> = std::result::Result<T, ProcessorError>;
