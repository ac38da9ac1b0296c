//! The per-work-unit extraction state machine.
//!
//! One `WorkUnitExtractor` owns one work unit start to finish, driving a
//! paginated request/response protocol against a [`Source`]: resolve the
//! cycle's request parameters, invoke the source (retrying only
//! retriable auth failures), run the declared stream processors, fold
//! the response into the session, and decide completion, retry, or
//! failure. Cycles are strictly sequential; cycle *k+1*'s parameters
//! depend only on cycle *k*'s completed response.

use chrono::Utc;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ExtractionError, Result};
use crate::extractor::parameters::ParameterResolver;
use crate::extractor::session::ExtractionSession;
use crate::schema::{ColumnSchema, SchemaInferencer};
use crate::traits::processor::{ProcessorRegistry, StreamProcessor};
use crate::traits::source::{Source, SourceStatus};
use crate::types::config::ExtractorConfig;
use crate::types::work_unit::WorkUnit;

/// Extraction states. `Failed` is reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    Requesting,
    HasRecords,
    Complete,
    Failed,
}

/// One decoded-ready page of payload handed to the downstream decoder.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// Processed payload bytes.
    pub data: Vec<u8>,

    /// Content type the source reported, if any.
    pub content_type: Option<String>,

    /// Source-provided schema string, if any.
    pub source_schema: Option<String>,

    /// Page number after this response.
    pub page_number: u64,

    /// Records the source reported in this set.
    pub set_count: Option<u64>,
}

/// Summary of a finished work unit.
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// Pages pulled before completion.
    pub pages: usize,

    /// Total records the source reported across all sets.
    pub records: u64,

    /// Wall clock from first pull to completion.
    pub elapsed: Duration,

    /// Index of the work unit this report covers.
    pub work_unit_index: usize,
}

/// The extraction state machine for a single work unit.
pub struct WorkUnitExtractor<S: Source> {
    source: S,
    work_unit: WorkUnit,
    config: ExtractorConfig,
    resolver: ParameterResolver,
    success_pattern: Option<Regex>,
    fail_pattern: Option<Regex>,
    processors: Vec<Box<dyn StreamProcessor>>,
    inferencer: SchemaInferencer,
    session: ExtractionSession,
    state: State,
    cancel: CancellationToken,
}

impl<S: Source> WorkUnitExtractor<S> {
    /// Build an extractor for one work unit, compiling session patterns.
    pub fn new(source: S, work_unit: WorkUnit, config: ExtractorConfig) -> Result<Self> {
        let success_pattern = config
            .session
            .success_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        let fail_pattern = config
            .session
            .fail_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;
        let session = ExtractionSession::new(&config.pagination, &config.session);
        let resolver = ParameterResolver::new(config.parameters.clone());

        Ok(Self {
            source,
            work_unit,
            config,
            resolver,
            success_pattern,
            fail_pattern,
            processors: Vec::new(),
            inferencer: SchemaInferencer::new(),
            session,
            state: State::Init,
            cancel: CancellationToken::new(),
        })
    }

    /// Build the declared processor chain from a registry.
    pub fn with_processor_registry(mut self, registry: &ProcessorRegistry) -> Result<Self> {
        self.processors = registry.build(&self.config.processors)?;
        Ok(self)
    }

    /// Supply an already-built processor chain.
    pub fn with_processors(mut self, processors: Vec<Box<dyn StreamProcessor>>) -> Self {
        self.processors = processors;
        self
    }

    /// Use a configured schema inferencer (cleansing rule, overrides).
    pub fn with_inferencer(mut self, inferencer: SchemaInferencer) -> Self {
        self.inferencer = inferencer;
        self
    }

    /// Attach a host cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The owned session (read-only view).
    pub fn session(&self) -> &ExtractionSession {
        &self.session
    }

    /// The work unit this extractor owns.
    pub fn work_unit(&self) -> &WorkUnit {
        &self.work_unit
    }

    /// Pull the next page, or `None` once the work unit is complete.
    ///
    /// Any error marks the work unit failed; further pulls return
    /// [`ExtractionError::AlreadyFailed`].
    pub async fn next_page(&mut self) -> Result<Option<ExtractedPage>> {
        match self.state {
            State::Complete => return Ok(None),
            State::Failed => return Err(ExtractionError::AlreadyFailed),
            _ => {}
        }

        if self.state == State::Init {
            if let Err(e) = self.wait_for_gate().await {
                return Err(self.fail(e));
            }
        }

        match self.completion() {
            Ok(true) => return self.complete().await,
            Ok(false) => {}
            Err(e) => return Err(self.fail(e)),
        }

        let mut status = match self.request().await {
            Ok(status) => status,
            Err(e) => return Err(self.fail(e)),
        };
        self.session.absorb(&status);

        let Some(buffer) = status.buffer.take() else {
            // Clean end of data; re-run the predicate so the
            // minimum-record guard still applies.
            return match self.completion() {
                Err(e) => Err(self.fail(e)),
                Ok(_) => self.complete().await,
            };
        };

        let data = self.run_processors(buffer);
        self.state = State::HasRecords;
        debug!(
            work_unit = self.work_unit.index(),
            page = self.session.page_number,
            bytes = data.len(),
            "pulled page"
        );

        Ok(Some(ExtractedPage {
            data,
            content_type: status.content_type().map(str::to_string),
            source_schema: status.source_schema().map(str::to_string),
            page_number: self.session.page_number,
            set_count: status.set_count,
        }))
    }

    /// Pull to exhaustion and summarize.
    pub async fn drive(mut self) -> Result<ExtractionReport> {
        let started = Instant::now();
        let mut pages = 0;
        loop {
            match self.next_page().await {
                Ok(Some(_)) => pages += 1,
                Ok(None) => break,
                Err(e) => {
                    self.source.close_all().await;
                    return Err(e);
                }
            }
        }
        self.source.close_all().await;

        let report = ExtractionReport {
            pages,
            records: self.session.processed_count,
            elapsed: started.elapsed(),
            work_unit_index: self.work_unit.index(),
        };
        info!(
            work_unit = report.work_unit_index,
            pages = report.pages,
            records = report.records,
            "work unit complete"
        );
        Ok(report)
    }

    /// Output schema for this work unit: fixed if configured, otherwise
    /// inferred once from the given sample and cached. A finalized schema
    /// is never revised by later samples.
    pub fn resolve_schema(&mut self, sample: &[Value]) -> Vec<ColumnSchema> {
        if let Some(fixed) = &self.config.fixed_schema {
            return fixed.clone();
        }
        if let Some(cached) = &self.session.inferred_schema {
            return cached.clone();
        }
        let inferred = self.inferencer.infer_materialized(sample);
        self.session.inferred_schema = Some(inferred.clone());
        inferred
    }

    /// Completion predicate, evaluated before each request.
    ///
    /// The fail condition is checked first and is fatal. Success is any
    /// of: success pattern match, source EOF, expected total reached,
    /// an empty record set, or pagination disabled after one cycle. In
    /// session-polling mode, neither resolving before the configured
    /// timeout is fatal.
    fn completion(&self) -> Result<bool> {
        if let (Some(pattern), Some(key)) = (&self.fail_pattern, &self.session.session_key) {
            if pattern.is_match(key) {
                return Err(ExtractionError::FailConditionMatched { key: key.clone() });
            }
        }

        let success_matched = match (&self.success_pattern, &self.session.session_key) {
            (Some(pattern), Some(key)) => pattern.is_match(key),
            _ => false,
        };
        let total_reached = self
            .session
            .expected_total
            .is_some_and(|total| self.session.processed_count >= total);
        let empty_set = self.session.last_set_count == Some(0);
        let single_cycle_done = !self.config.pagination.enabled && self.session.cycles() >= 1;

        if success_matched || self.session.is_eof || total_reached || empty_set || single_cycle_done
        {
            if self.session.processed_count < self.config.min_work_unit_records {
                return Err(ExtractionError::InsufficientRecords {
                    processed: self.session.processed_count,
                    minimum: self.config.min_work_unit_records,
                });
            }
            return Ok(true);
        }

        // Session-polling mode: bounded wait for a pattern to resolve.
        if self.success_pattern.is_some() || self.fail_pattern.is_some() {
            let elapsed = self.session.elapsed();
            if elapsed.as_millis() > u128::from(self.config.session.timeout_ms) {
                return Err(ExtractionError::SessionTimeout {
                    elapsed_ms: elapsed.as_millis(),
                    timeout_ms: self.config.session.timeout_ms,
                });
            }
        }

        Ok(false)
    }

    /// One request cycle, retrying only retriable auth failures, bounded
    /// by `max(retry_count, 1)`, with no backoff.
    async fn request(&mut self) -> Result<SourceStatus> {
        let parameters = self.resolve_parameters();
        self.session.dynamic_parameters = parameters.clone();

        let mut outbound = SourceStatus::new();
        outbound.parameters = parameters;
        outbound.session_key = self.session.session_key.clone();
        outbound.page_start = Some(self.session.page_start);
        outbound.page_size = Some(self.session.page_size);
        outbound.page_number = Some(self.session.page_number);

        let first = self.session.cycles() == 0;
        let attempts = self.config.retry_count.max(1);
        self.state = State::Requesting;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = if first {
                self.source.execute_first(outbound.clone()).await
            } else {
                self.source.execute_next(outbound.clone()).await
            };

            match result {
                Ok(Some(status)) => return Ok(status),
                // No response at all is fatal, never retried further.
                Ok(None) => return Err(ExtractionError::EmptyResponse),
                Err(e) if e.is_retriable() && attempt < attempts => {
                    warn!(
                        work_unit = self.work_unit.index(),
                        attempt,
                        attempts,
                        error = %e,
                        "retriable auth failure"
                    );
                }
                Err(e) if e.is_retriable() => {
                    return Err(ExtractionError::AuthRetriesExhausted { attempts });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Build the substitution context for this cycle.
    ///
    /// The first cycle seeds from watermark bounds, initial pagination
    /// values, and the optional session-initial value. Later cycles seed
    /// pagination and session values only from fields the previous
    /// response reported, except the page size, which persists from the
    /// last non-zero value.
    fn resolve_parameters(&self) -> IndexMap<String, String> {
        let mut context = IndexMap::new();
        let format = self.config.watermark_format.as_str();
        context.insert(
            "watermark_low".to_string(),
            self.work_unit.low().format(format),
        );
        context.insert(
            "watermark_high".to_string(),
            self.work_unit.high().format(format),
        );

        if self.session.cycles() == 0 {
            if self.config.pagination.enabled {
                context.insert("page_start".to_string(), self.session.page_start.to_string());
                context.insert("page_size".to_string(), self.session.page_size.to_string());
                context.insert(
                    "page_number".to_string(),
                    self.session.page_number.to_string(),
                );
            }
            if let Some(initial) = &self.config.session.initial_value {
                context.insert("session_key".to_string(), initial.clone());
            }
        } else {
            let reported = self.session.reported;
            if reported.page_start {
                context.insert("page_start".to_string(), self.session.page_start.to_string());
            }
            if reported.page_size || self.session.page_size > 0 {
                context.insert("page_size".to_string(), self.session.page_size.to_string());
            }
            if reported.page_number {
                context.insert(
                    "page_number".to_string(),
                    self.session.page_number.to_string(),
                );
            }
            if reported.session_key {
                if let Some(key) = &self.session.session_key {
                    context.insert("session_key".to_string(), key.clone());
                }
            }
        }

        self.resolver.resolve(&context)
    }

    /// Chain the declared processors over the payload.
    ///
    /// A processor failure is logged and the unmodified buffer is used
    /// as-is; processors never fail the work unit.
    fn run_processors(&self, buffer: Vec<u8>) -> Vec<u8> {
        let mut current = buffer;
        for processor in &self.processors {
            match processor.process(&current) {
                Ok(next) => current = next,
                Err(e) => {
                    warn!(
                        work_unit = self.work_unit.index(),
                        processor = processor.name(),
                        error = %e,
                        "stream processor failed; passing buffer through"
                    );
                }
            }
        }
        current
    }

    /// Cancellable sleep until the configured start instant.
    async fn wait_for_gate(&self) -> Result<()> {
        let Some(start_at) = self.config.start_at else {
            return Ok(());
        };
        let now = Utc::now();
        if start_at <= now {
            return Ok(());
        }
        let wait = (start_at - now)
            .to_std()
            .unwrap_or_else(|_| Duration::from_secs(0));
        info!(
            work_unit = self.work_unit.index(),
            wait_ms = wait.as_millis() as u64,
            "waiting for start gate"
        );

        tokio::select! {
            _ = self.cancel.cancelled() => Err(ExtractionError::Cancelled),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }

    async fn complete(&mut self) -> Result<Option<ExtractedPage>> {
        self.state = State::Complete;
        self.source.close_stream().await;
        Ok(None)
    }

    fn fail(&mut self, error: ExtractionError) -> ExtractionError {
        self.state = State::Failed;
        warn!(
            work_unit = self.work_unit.index(),
            error = %error,
            "work unit failed"
        );
        error
    }
}
