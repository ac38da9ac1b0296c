//! Stream processors: decode-time byte transforms, chained in order.
//!
//! Processors are instantiated from a string-key registry resolved at
//! startup - an explicit constructor table, not reflection. Failures in
//! a processor are logged by the state machine and the unmodified buffer
//! is passed through; they never fail the work unit.

use std::collections::HashMap;

use crate::error::{ProcessorError, ProcessorResult};

/// A byte-stream transform applied between source and decoder.
pub trait StreamProcessor: Send + Sync {
    /// Decode-time transform (decompression, decryption).
    fn process(&self, input: &[u8]) -> ProcessorResult<Vec<u8>>;

    /// Symmetric encode-time transform. Identity unless overridden.
    fn encode(&self, input: &[u8]) -> ProcessorResult<Vec<u8>> {
        Ok(input.to_vec())
    }

    /// File-name suffix the encoded form carries, if any.
    fn file_extension(&self) -> Option<&str> {
        None
    }

    /// Processor name for logging and registry diagnostics.
    fn name(&self) -> &str;
}

type ProcessorCtor = Box<dyn Fn() -> Box<dyn StreamProcessor> + Send + Sync>;

/// String-key to constructor registry for stream processors.
///
/// Hosts register constructors once at startup, then build ordered
/// processor chains from the keys a job declares.
#[derive(Default)]
pub struct ProcessorRegistry {
    ctors: HashMap<String, ProcessorCtor>,
}

impl ProcessorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in processors registered.
    pub fn with_defaults() -> Self {
        use crate::processors::{GzipProcessor, IdentityProcessor};

        let mut registry = Self::new();
        registry.register("identity", || Box::new(IdentityProcessor));
        registry.register("gzip", || Box::new(GzipProcessor));
        registry
    }

    /// Register a constructor under a key, replacing any previous one.
    pub fn register<F>(&mut self, key: impl Into<String>, ctor: F)
    where
        F: Fn() -> Box<dyn StreamProcessor> + Send + Sync + 'static,
    {
        self.ctors.insert(key.into(), Box::new(ctor));
    }

    /// Whether a key is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.ctors.contains_key(key)
    }

    /// Build the declared processor chain, in order.
    pub fn build(&self, keys: &[String]) -> ProcessorResult<Vec<Box<dyn StreamProcessor>>> {
        keys.iter()
            .map(|key| {
                self.ctors
                    .get(key)
                    .map(|ctor| ctor())
                    .ok_or_else(|| ProcessorError::Unknown { key: key.clone() })
            })
            .collect()
    }
}
