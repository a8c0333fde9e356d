//! Constants for the transfer engine.

/// Characters of an error page kept in the diagnostic excerpt.
pub const ERROR_EXCERPT_CHARS: usize = 200;

/// Progress is logged at debug level every time this many bytes pass.
pub const PROGRESS_LOG_INTERVAL_BYTES: u64 = 8 * 1024 * 1024;

/// Range header sent with every transfer; the full body is requested.
pub const FULL_BODY_RANGE: &str = "bytes=0-";
