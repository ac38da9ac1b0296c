//! Per-work-unit mutable session state.

use indexmap::IndexMap;
use std::time::{Duration, Instant};

use crate::schema::ColumnSchema;
use crate::traits::source::SourceStatus;
use crate::types::config::{PaginationConfig, SessionConfig};

/// Mutable state for one work unit's extraction loop.
///
/// Created at work-unit start, updated once per response cycle, discarded
/// at work-unit end. Exclusively owned by its
/// [`WorkUnitExtractor`](crate::extractor::WorkUnitExtractor); never
/// shared across work units.
#[derive(Debug)]
pub struct ExtractionSession {
    /// Records delivered so far; monotonically non-decreasing.
    pub processed_count: u64,

    /// Current page number.
    pub page_number: u64,

    /// Current record offset.
    pub page_start: u64,

    /// Page size; persists the last non-zero value the source reported.
    pub page_size: u64,

    /// Last session key the source reported, or the configured initial
    /// value before the first response.
    pub session_key: Option<String>,

    /// The most recently resolved request parameters.
    pub dynamic_parameters: IndexMap<String, String>,

    /// Schema inferred from the first sampled page, if any. Built once;
    /// later records never revise it.
    pub inferred_schema: Option<Vec<ColumnSchema>>,

    /// The source signaled end of data.
    pub is_eof: bool,

    pub(crate) started_at: Instant,
    pub(crate) cycles: u64,
    pub(crate) expected_total: Option<u64>,
    pub(crate) last_set_count: Option<u64>,
    pub(crate) reported: ReportedFields,
}

/// Which cursor fields the previous response actually reported.
///
/// Later request cycles seed only from reported fields; an omitted field
/// stays out of the substitution context (page size excepted - it
/// persists from the last non-zero value).
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ReportedFields {
    pub session_key: bool,
    pub page_start: bool,
    pub page_size: bool,
    pub page_number: bool,
}

impl ExtractionSession {
    /// Create session state seeded from declarative config.
    pub fn new(pagination: &PaginationConfig, session: &SessionConfig) -> Self {
        Self {
            processed_count: 0,
            page_number: pagination.initial_page_number,
            page_start: pagination.initial_page_start,
            page_size: pagination.initial_page_size,
            session_key: session.initial_value.clone(),
            dynamic_parameters: IndexMap::new(),
            inferred_schema: None,
            is_eof: false,
            started_at: Instant::now(),
            cycles: 0,
            expected_total: None,
            last_set_count: None,
            reported: ReportedFields::default(),
        }
    }

    /// Wall clock elapsed since the session started.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Completed response cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Fold one response into the session.
    ///
    /// Counters update only from fields the source reported; the page
    /// size additionally ignores reported zeros so the last useful value
    /// persists.
    pub(crate) fn absorb(&mut self, status: &SourceStatus) {
        self.cycles += 1;
        self.last_set_count = status.set_count;
        self.processed_count += status.set_count.unwrap_or(0);

        if status.total_count.is_some() {
            self.expected_total = status.total_count;
        }
        if let Some(key) = &status.session_key {
            self.session_key = Some(key.clone());
        }
        if let Some(start) = status.page_start {
            self.page_start = start;
        }
        if let Some(number) = status.page_number {
            self.page_number = number;
        }
        if let Some(size) = status.page_size {
            if size > 0 {
                self.page_size = size;
            }
        }
        if status.buffer.is_none() {
            self.is_eof = true;
        }

        self.reported = ReportedFields {
            session_key: status.session_key.is_some(),
            page_start: status.page_start.is_some(),
            page_size: status.page_size.is_some(),
            page_number: status.page_number.is_some(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ExtractionSession {
        ExtractionSession::new(&PaginationConfig::new(), &SessionConfig::new())
    }

    #[test]
    fn seeds_from_config() {
        let pagination = PaginationConfig::new()
            .with_page_start(10)
            .with_page_size(50)
            .with_page_number(2);
        let config = SessionConfig::new().with_initial_value("pending");
        let session = ExtractionSession::new(&pagination, &config);

        assert_eq!(session.page_start, 10);
        assert_eq!(session.page_size, 50);
        assert_eq!(session.page_number, 2);
        assert_eq!(session.session_key.as_deref(), Some("pending"));
        assert_eq!(session.processed_count, 0);
    }

    #[test]
    fn absorb_accumulates_counts() {
        let mut session = session();
        session.absorb(&SourceStatus::new().with_buffer(b"x".to_vec()).with_set_count(25));
        session.absorb(&SourceStatus::new().with_buffer(b"y".to_vec()).with_set_count(15));

        assert_eq!(session.processed_count, 40);
        assert_eq!(session.cycles(), 2);
        assert_eq!(session.last_set_count, Some(15));
    }

    #[test]
    fn page_size_persists_last_non_zero() {
        let mut session = session();
        let mut status = SourceStatus::new().with_buffer(b"x".to_vec());
        status.page_size = Some(250);
        session.absorb(&status);
        assert_eq!(session.page_size, 250);

        // A reported zero does not clobber the useful value.
        let mut zero = SourceStatus::new().with_buffer(b"y".to_vec());
        zero.page_size = Some(0);
        session.absorb(&zero);
        assert_eq!(session.page_size, 250);
        assert!(session.reported.page_size);

        // An omitted size leaves it alone and marks it unreported.
        session.absorb(&SourceStatus::new().with_buffer(b"z".to_vec()));
        assert_eq!(session.page_size, 250);
        assert!(!session.reported.page_size);
    }

    #[test]
    fn absent_buffer_marks_eof() {
        let mut session = session();
        session.absorb(&SourceStatus::new());
        assert!(session.is_eof);
    }

    #[test]
    fn unreported_fields_leave_state_untouched() {
        let mut session = session();
        session.absorb(
            &SourceStatus::new()
                .with_buffer(b"x".to_vec())
                .with_session_key("running"),
        );
        assert_eq!(session.session_key.as_deref(), Some("running"));
        assert!(session.reported.session_key);
        assert!(!session.reported.page_start);

        session.absorb(&SourceStatus::new().with_buffer(b"y".to_vec()));
        // Key value survives, but it is no longer marked as reported.
        assert_eq!(session.session_key.as_deref(), Some("running"));
        assert!(!session.reported.session_key);
    }
}
