//! Source trait for pluggable remote-source connections.
//!
//! A [`Source`] is the one collaborator the extraction state machine
//! drives: it receives the resolved request parameters for a cycle and
//! returns an updated [`SourceStatus`]. HTTP clients, file systems, and
//! queues all sit behind this seam; the engine never owns a wire
//! protocol.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::SourceResult;

/// Well-known keys in the [`SourceStatus`] message bag.
pub mod message {
    pub const CONTENT_TYPE: &str = "contentType";
    pub const HEADERS: &str = "headers";
    pub const SCHEMA: &str = "schema";
}

/// Request/response state exchanged with a source each cycle.
///
/// Outbound, `parameters` carries the cycle's resolved request
/// parameters. Inbound, the source fills the payload buffer (absent
/// buffer signals end of data), counts, session key, and pagination
/// cursor - each only if it actually has a value to report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceStatus {
    /// Payload bytes; `None` signals end of data.
    pub buffer: Option<Vec<u8>>,

    /// Free-form message bag (`contentType`, `headers`, `schema`).
    #[serde(default)]
    pub messages: HashMap<String, String>,

    /// Total records the source expects to deliver for this work unit.
    pub total_count: Option<u64>,

    /// Records contained in this response's set.
    pub set_count: Option<u64>,

    /// Source-reported session token.
    pub session_key: Option<String>,

    /// Pagination cursor: next record offset.
    pub page_start: Option<u64>,

    /// Pagination cursor: page size.
    pub page_size: Option<u64>,

    /// Pagination cursor: page number.
    pub page_number: Option<u64>,

    /// Resolved request parameters for this cycle (outbound).
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
}

impl SourceStatus {
    /// Create an empty status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the payload buffer.
    pub fn with_buffer(mut self, buffer: impl Into<Vec<u8>>) -> Self {
        self.buffer = Some(buffer.into());
        self
    }

    /// Add a message-bag entry.
    pub fn with_message(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.messages.insert(key.into(), value.into());
        self
    }

    /// Set the expected total record count.
    pub fn with_total_count(mut self, total: u64) -> Self {
        self.total_count = Some(total);
        self
    }

    /// Set this response's record count.
    pub fn with_set_count(mut self, count: u64) -> Self {
        self.set_count = Some(count);
        self
    }

    /// Set the session key.
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = Some(key.into());
        self
    }

    /// Set the pagination cursor.
    pub fn with_cursor(mut self, start: u64, size: u64, number: u64) -> Self {
        self.page_start = Some(start);
        self.page_size = Some(size);
        self.page_number = Some(number);
        self
    }

    /// Content type from the message bag, if reported.
    pub fn content_type(&self) -> Option<&str> {
        self.messages.get(message::CONTENT_TYPE).map(String::as_str)
    }

    /// Source-provided schema from the message bag, if reported.
    pub fn source_schema(&self) -> Option<&str> {
        self.messages.get(message::SCHEMA).map(String::as_str)
    }
}

/// A remote-source connection driven by the extraction state machine.
///
/// `execute_first` opens the protocol session; `execute_next` continues
/// it. Returning `Ok(None)` means the source produced no response at all,
/// which is fatal to the work unit (distinct from a status whose buffer
/// is absent, which is a clean end of data). Only
/// [`SourceError::RetriableAuth`](crate::error::SourceError::RetriableAuth)
/// is retried.
#[async_trait]
pub trait Source: Send {
    /// Execute the opening request for a work unit.
    async fn execute_first(&mut self, status: SourceStatus) -> SourceResult<Option<SourceStatus>>;

    /// Execute a follow-up request using the prior cycle's status.
    async fn execute_next(&mut self, status: SourceStatus) -> SourceResult<Option<SourceStatus>>;

    /// Release per-work-unit resources.
    async fn close_stream(&mut self) {}

    /// Release everything, including pooled connections.
    async fn close_all(&mut self) {}

    /// Source name for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}
