//! Built-in stream processors.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::{ProcessorError, ProcessorResult};
use crate::traits::processor::StreamProcessor;

/// Pass-through processor. Useful as a chain placeholder in job configs.
#[derive(Debug, Default)]
pub struct IdentityProcessor;

impl StreamProcessor for IdentityProcessor {
    fn process(&self, input: &[u8]) -> ProcessorResult<Vec<u8>> {
        Ok(input.to_vec())
    }

    fn name(&self) -> &str {
        "identity"
    }
}

/// Gzip decompression on decode, compression on encode.
#[derive(Debug, Default)]
pub struct GzipProcessor;

impl StreamProcessor for GzipProcessor {
    fn process(&self, input: &[u8]) -> ProcessorResult<Vec<u8>> {
        let mut decoder = GzDecoder::new(input);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| self.failure(e))?;
        Ok(out)
    }

    fn encode(&self, input: &[u8]) -> ProcessorResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(input).map_err(|e| self.failure(e))?;
        encoder.finish().map_err(|e| self.failure(e))
    }

    fn file_extension(&self) -> Option<&str> {
        Some("gz")
    }

    fn name(&self) -> &str {
        "gzip"
    }
}

impl GzipProcessor {
    fn failure(&self, source: std::io::Error) -> ProcessorError {
        ProcessorError::Process {
            name: self.name().to_string(),
            source: Box::new(source),
        }
    }
}
