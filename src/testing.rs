//! Testing utilities including mock implementations.
//!
//! Useful for testing hosts that embed the extraction engine without a
//! real remote source behind the [`Source`] seam.

use async_trait::async_trait;
use std::collections::VecDeque;

use crate::error::{SourceError, SourceResult};
use crate::traits::source::{Source, SourceStatus};

/// One scripted response from a [`MockSource`].
#[derive(Debug)]
enum Scripted {
    /// Return this status.
    Status(SourceStatus),
    /// Return an error (consumed once).
    Error(SourceError),
    /// Return `Ok(None)`: no response at all.
    NoResponse,
}

/// A mock source driven by a scripted response sequence.
///
/// Responses are returned in the order they were queued, across both
/// `execute_first` and `execute_next`. Once the script runs dry, the
/// mock returns an end-of-data status (no buffer). Every outbound
/// request status is captured for assertions.
#[derive(Debug, Default)]
pub struct MockSource {
    script: VecDeque<Scripted>,
    requests: Vec<SourceStatus>,
    calls: usize,
    always_auth_fail: bool,
    stream_closed: bool,
    all_closed: bool,
}

impl MockSource {
    /// Create a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page response.
    pub fn with_page(mut self, status: SourceStatus) -> Self {
        self.script.push_back(Scripted::Status(status));
        self
    }

    /// Queue an explicit end-of-data response (status without buffer).
    pub fn with_eof(mut self) -> Self {
        self.script.push_back(Scripted::Status(SourceStatus::new()));
        self
    }

    /// Queue an error response.
    pub fn with_error(mut self, error: SourceError) -> Self {
        self.script.push_back(Scripted::Error(error));
        self
    }

    /// Queue a `None` result (the source produced nothing at all).
    pub fn with_no_response(mut self) -> Self {
        self.script.push_back(Scripted::NoResponse);
        self
    }

    /// Every call fails with a retriable auth error, forever.
    pub fn always_failing_auth(mut self) -> Self {
        self.always_auth_fail = true;
        self
    }

    /// Total `execute_first`/`execute_next` calls made.
    pub fn call_count(&self) -> usize {
        self.calls
    }

    /// Outbound request statuses, in call order.
    pub fn requests(&self) -> &[SourceStatus] {
        &self.requests
    }

    /// Whether `close_stream` was called.
    pub fn stream_closed(&self) -> bool {
        self.stream_closed
    }

    /// Whether `close_all` was called.
    pub fn all_closed(&self) -> bool {
        self.all_closed
    }

    fn execute(&mut self, status: SourceStatus) -> SourceResult<Option<SourceStatus>> {
        self.calls += 1;
        self.requests.push(status);

        if self.always_auth_fail {
            return Err(SourceError::RetriableAuth("token expired".to_string()));
        }

        match self.script.pop_front() {
            Some(Scripted::Status(response)) => Ok(Some(response)),
            Some(Scripted::Error(error)) => Err(error),
            Some(Scripted::NoResponse) => Ok(None),
            None => Ok(Some(SourceStatus::new())),
        }
    }
}

#[async_trait]
impl Source for MockSource {
    async fn execute_first(&mut self, status: SourceStatus) -> SourceResult<Option<SourceStatus>> {
        self.execute(status)
    }

    async fn execute_next(&mut self, status: SourceStatus) -> SourceResult<Option<SourceStatus>> {
        self.execute(status)
    }

    async fn close_stream(&mut self) {
        self.stream_closed = true;
    }

    async fn close_all(&mut self) {
        self.all_closed = true;
    }

    fn name(&self) -> &str {
        "mock"
    }
}
