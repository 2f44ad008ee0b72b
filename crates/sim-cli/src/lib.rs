//! Library half of the `simcpu` command-line runner.

/// Program files and `file@priority` arguments.
pub mod source;
/// Text and JSON run reports.
pub mod report;
/// Tracing subscriber setup.
pub mod logging;
