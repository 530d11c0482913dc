//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns lines, pure, no I/O) for
//! testability and a `print_*` wrapper that writes to stdout. Normalized data
//! URLs themselves are printed raw so the output can be piped.
//!
//! ## Describe
//!
//! ```text
//! Type:   image/avif
//! Format: AVIF
//! Size:   18342 bytes (17.9 KB)
//! ```
//!
//! ## Batch summary
//!
//! ```text
//! Batch: 12 inputs, 9 unchanged, 2 transcoded, 1 empty, 1 failed
//! ```

use crate::pipeline::ImageInfo;
use std::fmt;

/// Format an [`ImageInfo`] as aligned `Label: value` lines.
pub fn format_info(info: &ImageInfo) -> Vec<String> {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let size = match info.size_kb {
        Some(kb) => format!("{} bytes ({kb:.1} KB)", info.size),
        None => format!("{} bytes", info.size),
    };
    vec![
        format!("Type:   {}", or_dash(&info.media_type)),
        format!("Format: {}", or_dash(&info.format)),
        format!("Size:   {size}"),
    ]
}

pub fn print_info(info: &ImageInfo) {
    for line in format_info(info) {
        println!("{line}");
    }
}

/// What happened to one batch input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Unchanged,
    Transcoded,
    Empty,
    Failed,
}

/// Running tally of batch outcomes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub unchanged: usize,
    pub transcoded: usize,
    pub empty: usize,
    pub failed: usize,
}

impl BatchStats {
    pub fn record(&mut self, outcome: BatchOutcome) {
        match outcome {
            BatchOutcome::Unchanged => self.unchanged += 1,
            BatchOutcome::Transcoded => self.transcoded += 1,
            BatchOutcome::Empty => self.empty += 1,
            BatchOutcome::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.unchanged + self.transcoded + self.empty + self.failed
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inputs, {} unchanged, {} transcoded, {} empty, {} failed",
            self.total(),
            self.unchanged,
            self.transcoded,
            self.empty,
            self.failed
        )
    }
}

/// Classify a batch result by comparing input and output text.
pub fn classify<E>(input: Option<&str>, result: &Result<Option<String>, E>) -> BatchOutcome {
    match result {
        Err(_) => BatchOutcome::Failed,
        Ok(None) => BatchOutcome::Empty,
        Ok(Some(out)) if Some(out.as_str()) == input => BatchOutcome::Unchanged,
        Ok(Some(_)) => BatchOutcome::Transcoded,
    }
}

/// Format a failed batch line for stderr. `line` is 1-based.
pub fn format_batch_error(line: usize, error: &dyn std::error::Error) -> String {
    format!("line {line}: {error}")
}

pub fn format_batch_summary(stats: &BatchStats) -> String {
    format!("Batch: {stats}")
}
