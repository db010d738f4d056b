//! Composition of the pipeline stages.
//!
//! Every call owns its input and output; nothing is shared between
//! invocations, so independent files can be processed in parallel.

use bytes::Bytes;
use rayon::prelude::*;

use crate::{
    collector::collect_fixes,
    errors::PipelineError,
    file_parsers::{FileType, parse_activity_file},
    metrics::derive_samples,
    models::{ParsedFile, RawFix},
    series::{Track, assemble},
};

/// Collect, derive and assemble a parsed file into a [`Track`].
pub fn process_parsed(file: &ParsedFile) -> Result<Track, PipelineError> {
    let fixes = collect_fixes(file)?;
    Ok(process_fixes(&fixes))
}

/// Derive and assemble from fixes that were already collected.
pub fn process_fixes(fixes: &[RawFix]) -> Track {
    assemble(derive_samples(fixes))
}

/// Parse raw file bytes and run the whole pipeline.
pub fn process_bytes(file_type: FileType, bytes: Bytes) -> Result<Track, PipelineError> {
    let parsed = parse_activity_file(file_type, bytes)?;
    process_parsed(&parsed)
}

/// Runs [`process_parsed`] over many files on the rayon pool. Results keep the
/// input order; a failing file does not affect the others.
pub fn process_batch(files: &[ParsedFile]) -> Vec<Result<Track, PipelineError>> {
    files.par_iter().map(process_parsed).collect()
}
