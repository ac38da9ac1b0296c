//! Declarative configuration for the extraction state machine.
//!
//! These structs mirror what a job definition supplies: pagination seeds,
//! session success/fail patterns, retry budget, and record thresholds.
//! Validation of the surrounding job file happens elsewhere; patterns are
//! compiled when the extractor is constructed.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::ColumnSchema;

/// Configuration for one work unit's extraction loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Declared request parameters; values may contain `{{name}}`
    /// placeholders resolved each cycle.
    #[serde(default)]
    pub parameters: IndexMap<String, String>,

    /// Pagination seeds and on/off switch.
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Session-key polling: success/fail patterns and bounded wait.
    #[serde(default)]
    pub session: SessionConfig,

    /// Attempts for retriable auth failures. Effective value is
    /// `max(retry_count, 1)`; only auth failures are retried.
    #[serde(default)]
    pub retry_count: u32,

    /// Fatal failure if fewer records than this at normal completion.
    #[serde(default)]
    pub min_work_unit_records: u64,

    /// Do not issue the first request before this instant. Used to
    /// stagger many simultaneously-launched work units.
    pub start_at: Option<DateTime<Utc>>,

    /// chrono format for watermark values in request parameters.
    #[serde(default = "default_watermark_format")]
    pub watermark_format: String,

    /// Fixed output schema; when set, inference is skipped entirely.
    pub fixed_schema: Option<Vec<ColumnSchema>>,

    /// Stream-processor registry keys, applied in declared order.
    #[serde(default)]
    pub processors: Vec<String>,
}

fn default_watermark_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            parameters: IndexMap::new(),
            pagination: PaginationConfig::default(),
            session: SessionConfig::default(),
            retry_count: 0,
            min_work_unit_records: 0,
            start_at: None,
            watermark_format: default_watermark_format(),
            fixed_schema: None,
            processors: Vec::new(),
        }
    }
}

impl ExtractorConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declared request parameter (may contain `{{name}}`).
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Set pagination config.
    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    /// Set session config.
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Set the auth retry budget.
    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = count;
        self
    }

    /// Set the minimum-record guard.
    pub fn with_min_records(mut self, min: u64) -> Self {
        self.min_work_unit_records = min;
        self
    }

    /// Gate the first request behind an instant.
    pub fn with_start_at(mut self, at: DateTime<Utc>) -> Self {
        self.start_at = Some(at);
        self
    }

    /// Set the watermark render format.
    pub fn with_watermark_format(mut self, format: impl Into<String>) -> Self {
        self.watermark_format = format.into();
        self
    }

    /// Supply a fixed schema, disabling inference.
    pub fn with_fixed_schema(mut self, schema: Vec<ColumnSchema>) -> Self {
        self.fixed_schema = Some(schema);
        self
    }

    /// Append a stream processor by registry key.
    pub fn with_processor(mut self, key: impl Into<String>) -> Self {
        self.processors.push(key.into());
        self
    }
}

/// Pagination seeds for the first request cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// When false, the work unit completes after a single cycle.
    pub enabled: bool,

    /// Initial record offset.
    pub initial_page_start: u64,

    /// Initial page size; later cycles persist the last non-zero value
    /// the source reported.
    pub initial_page_size: u64,

    /// Initial page number.
    pub initial_page_number: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_page_start: 0,
            initial_page_size: 100,
            initial_page_number: 1,
        }
    }
}

impl PaginationConfig {
    /// Create pagination config with default seeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable pagination (single-cycle extraction).
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the initial offset.
    pub fn with_page_start(mut self, start: u64) -> Self {
        self.initial_page_start = start;
        self
    }

    /// Set the initial page size.
    pub fn with_page_size(mut self, size: u64) -> Self {
        self.initial_page_size = size;
        self
    }

    /// Set the initial page number.
    pub fn with_page_number(mut self, number: u64) -> Self {
        self.initial_page_number = number;
        self
    }
}

/// Session-key polling configuration.
///
/// When a success or fail pattern is set, the source's reported session
/// key is matched each cycle: fail first (fatal), then success
/// (complete). If neither resolves before `timeout_ms` of wall clock,
/// the work unit fails with a timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session value seeded into the first request's parameters.
    pub initial_value: Option<String>,

    /// Regex marking the session as successfully drained.
    pub success_pattern: Option<String>,

    /// Regex marking the session as failed; checked before success.
    pub fail_pattern: Option<String>,

    /// Bounded wait for session resolution, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            initial_value: None,
            success_pattern: None,
            fail_pattern: None,
            timeout_ms: 600_000,
        }
    }
}

impl SessionConfig {
    /// Create session config with defaults (no patterns, 10 min timeout).
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the first request's session value.
    pub fn with_initial_value(mut self, value: impl Into<String>) -> Self {
        self.initial_value = Some(value.into());
        self
    }

    /// Set the success pattern.
    pub fn with_success_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.success_pattern = Some(pattern.into());
        self
    }

    /// Set the fail pattern.
    pub fn with_fail_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.fail_pattern = Some(pattern.into());
        self
    }

    /// Set the session timeout.
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }
}
