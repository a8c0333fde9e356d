//! Request identifiers, pipeline states and the status record callers poll.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message shown when every resolution strategy came up empty.
pub const NOT_FOUND_MESSAGE: &str = "Could not find download URL. The link might be: password protected, expired, or require premium account.";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Opaque identifier minted per submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Mints a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Pipeline state. Transitions only move forward; `Failed` is reachable from
/// every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestState {
    /// Accepted, pipeline not started.
    Queued,
    /// Fetching the share page and extracting the file name.
    Resolving,
    /// Running the download-URL strategy chain.
    LocatingUrl,
    /// Streaming the file.
    Downloading,
    /// File written.
    Completed,
    /// Pipeline stopped with an error.
    Failed,
}

impl RequestState {
    /// Returns the wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Resolving => "resolving",
            Self::LocatingUrl => "locating-url",
            Self::Downloading => "downloading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Position along the pipeline; terminal states share the highest rank.
    #[must_use]
    pub fn rank(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Resolving => 1,
            Self::LocatingUrl => 2,
            Self::Downloading => 3,
            Self::Completed | Self::Failed => 4,
        }
    }

    /// Returns true for `Completed` and `Failed`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a record in this state may be replaced by one in `next`.
    ///
    /// `Downloading -> Downloading` is allowed so progress can be refreshed.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if *self == Self::Downloading && next == Self::Downloading {
            return true;
        }
        next.rank() > self.rank()
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "resolving" => Ok(Self::Resolving),
            "locating-url" => Ok(Self::LocatingUrl),
            "downloading" => Ok(Self::Downloading),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid request state: {s}")),
        }
    }
}

/// Full status snapshot for one request. Each transition replaces the whole
/// record; fields not restated by the new state are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusRecord {
    /// Current state.
    pub state: RequestState,
    /// Human-readable status line.
    pub message: String,
    /// Resolved file name, once known.
    pub filename: Option<String>,
    /// Written file path (completed only).
    pub filepath: Option<PathBuf>,
    /// File size in bytes (completed only).
    pub size: Option<u64>,
    /// Transfer fraction in `[0, 1]` while downloading with a known size.
    pub progress: Option<f64>,
    /// When this record was written.
    pub updated_at: SystemTime,
}

impl StatusRecord {
    fn new(state: RequestState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
            filename: None,
            filepath: None,
            size: None,
            progress: None,
            updated_at: SystemTime::now(),
        }
    }

    /// Initial record.
    #[must_use]
    pub fn queued() -> Self {
        Self::new(RequestState::Queued, "Request queued")
    }

    /// Page fetch and name extraction started.
    #[must_use]
    pub fn resolving() -> Self {
        Self::new(
            RequestState::Resolving,
            "Extracting file information from share page...",
        )
    }

    /// Strategy chain started for `filename`.
    #[must_use]
    pub fn locating_url(filename: &str) -> Self {
        Self {
            filename: Some(filename.to_string()),
            ..Self::new(
                RequestState::LocatingUrl,
                "Finding download URL... This may take a moment.",
            )
        }
    }

    /// Transfer running; `progress` is the completed fraction when known.
    #[must_use]
    pub fn downloading(filename: &str, progress: Option<f64>) -> Self {
        let message = match progress {
            Some(fraction) if fraction > 0.0 => {
                format!("Downloading... {:.0}%", (fraction * 100.0).min(100.0))
            }
            _ => "Starting download...".to_string(),
        };
        Self {
            filename: Some(filename.to_string()),
            progress,
            ..Self::new(RequestState::Downloading, message)
        }
    }

    /// File written to `filepath` with `size` bytes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn completed(filename: &str, filepath: &Path, size: u64) -> Self {
        Self {
            filename: Some(filename.to_string()),
            filepath: Some(filepath.to_path_buf()),
            size: Some(size),
            progress: Some(1.0),
            ..Self::new(
                RequestState::Completed,
                format!(
                    "Download completed successfully! File size: {:.2} MB",
                    size as f64 / BYTES_PER_MB
                ),
            )
        }
    }

    /// Pipeline failed with `message`.
    #[must_use]
    pub fn failed(message: impl Into<String>, filename: Option<&str>) -> Self {
        Self {
            filename: filename.map(str::to_string),
            ..Self::new(RequestState::Failed, message)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique_and_round_trip_display() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().parse::<RequestId>().unwrap(), a);
        assert!("not-a-uuid".parse::<RequestId>().is_err());
    }

    #[test]
    fn test_state_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&RequestState::LocatingUrl).unwrap(),
            "\"locating-url\""
        );
        assert_eq!("locating-url".parse::<RequestState>().unwrap(), RequestState::LocatingUrl);
        assert!("processing".parse::<RequestState>().is_err());
    }

    #[test]
    fn test_forward_only_transitions() {
        use RequestState as S;
        assert!(S::Queued.can_transition_to(S::Resolving));
        assert!(S::Resolving.can_transition_to(S::LocatingUrl));
        assert!(S::LocatingUrl.can_transition_to(S::Downloading));
        assert!(S::Downloading.can_transition_to(S::Downloading));
        assert!(S::Downloading.can_transition_to(S::Completed));
        assert!(S::Resolving.can_transition_to(S::Failed));
        assert!(!S::LocatingUrl.can_transition_to(S::Resolving));
        assert!(!S::Resolving.can_transition_to(S::Resolving));
        assert!(!S::Completed.can_transition_to(S::Failed));
        assert!(!S::Failed.can_transition_to(S::Completed));
    }

    #[test]
    fn test_completed_message_reports_megabytes() {
        let record = StatusRecord::completed("a.mp4", Path::new("/d/a.mp4"), 5 * 1024 * 1024 + 512 * 1024);
        assert_eq!(
            record.message,
            "Download completed successfully! File size: 5.50 MB"
        );
        assert_eq!(record.size, Some(5_767_168));
    }

    #[test]
    fn test_downloading_message_shows_percent() {
        assert_eq!(StatusRecord::downloading("a", None).message, "Starting download...");
        assert_eq!(
            StatusRecord::downloading("a", Some(0.423)).message,
            "Downloading... 42%"
        );
    }

    #[test]
    fn test_records_do_not_carry_previous_fields() {
        let failed = StatusRecord::failed(NOT_FOUND_MESSAGE, Some("a.mp4"));
        assert_eq!(failed.state, RequestState::Failed);
        assert!(failed.filepath.is_none());
        assert!(failed.size.is_none());
        assert!(failed.message.contains("password protected"));
    }

    #[test]
    fn test_record_serializes_state_name() {
        let json = serde_json::to_value(StatusRecord::resolving()).unwrap();
        assert_eq!(json["state"], "resolving");
        assert!(json["filename"].is_null());
    }
}
