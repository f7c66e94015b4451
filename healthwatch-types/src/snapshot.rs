//! StatusSnapshot - one health observation from the recorder.

use crate::{OverallStatus, SubResource, LABEL_ERROR, TRANSPORT_ERROR_CODE};

/// A point-in-time health report.
///
/// Snapshots are emitted by the recorder's health endpoint whenever it has
/// something to say, and are also synthesized locally when the connection to
/// that endpoint fails (see [`StatusSnapshot::transport_error`]). Equality is
/// field-wise: two snapshots are equivalent only if every field matches.
///
/// # Example
///
/// ```rust
/// use healthwatch_types::{OverallStatus, StatusSnapshot};
///
/// let down = StatusSnapshot::transport_error("connection refused");
/// assert_eq!(down.status, OverallStatus::Error);
/// assert_eq!(down.status_code, 500);
///
/// // Serialize with serde (requires "serde" feature)
/// // let json = serde_json::to_string(&down)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusSnapshot {
    /// Overall verdict.
    pub status: OverallStatus,

    /// HTTP-style status code accompanying the verdict.
    pub status_code: u16,

    /// When the last screen frame was captured, as reported by the recorder.
    pub last_frame_timestamp: Option<String>,

    /// When the last audio chunk was captured.
    pub last_audio_timestamp: Option<String>,

    /// When the last UI event was captured.
    pub last_ui_timestamp: Option<String>,

    /// Frame pipeline label (`ok`, `stale`, `disabled`, ...).
    pub frame_status: String,

    /// Audio pipeline label.
    pub audio_status: String,

    /// UI pipeline label.
    pub ui_status: String,

    /// Human-readable explanation.
    pub message: String,
}

impl StatusSnapshot {
    /// Create a builder for constructing snapshots.
    pub fn builder() -> StatusSnapshotBuilder {
        StatusSnapshotBuilder::new()
    }

    /// Build the snapshot that stands in for a failed connection.
    ///
    /// Status `error`, code 500, every pipeline `error`, no timestamps.
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self {
            status: OverallStatus::Error,
            status_code: TRANSPORT_ERROR_CODE,
            last_frame_timestamp: None,
            last_audio_timestamp: None,
            last_ui_timestamp: None,
            frame_status: LABEL_ERROR.to_string(),
            audio_status: LABEL_ERROR.to_string(),
            ui_status: LABEL_ERROR.to_string(),
            message: message.into(),
        }
    }

    /// Whether the overall status is `ok`.
    pub fn is_ok(&self) -> bool {
        self.status == OverallStatus::Ok
    }

    /// Label reported for one pipeline.
    pub fn resource_status(&self, resource: SubResource) -> &str {
        match resource {
            SubResource::Frame => &self.frame_status,
            SubResource::Audio => &self.audio_status,
            SubResource::Ui => &self.ui_status,
        }
    }

    /// Last-seen timestamp reported for one pipeline.
    pub fn last_seen(&self, resource: SubResource) -> Option<&str> {
        match resource {
            SubResource::Frame => self.last_frame_timestamp.as_deref(),
            SubResource::Audio => self.last_audio_timestamp.as_deref(),
            SubResource::Ui => self.last_ui_timestamp.as_deref(),
        }
    }
}

/// Builder for constructing `StatusSnapshot` instances.
///
/// Unset labels default to `error` and the status defaults to `Error`, so a
/// half-built snapshot never reads as healthy.
#[derive(Debug)]
pub struct StatusSnapshotBuilder {
    snapshot: StatusSnapshot,
}

impl StatusSnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        let mut snapshot = StatusSnapshot::transport_error("");
        snapshot.status_code = 0;
        Self { snapshot }
    }

    /// Set the overall status.
    pub fn status(mut self, status: OverallStatus) -> Self {
        self.snapshot.status = status;
        self
    }

    /// Set the status code.
    pub fn status_code(mut self, code: u16) -> Self {
        self.snapshot.status_code = code;
        self
    }

    /// Set one pipeline's label.
    pub fn resource_status(mut self, resource: SubResource, label: impl Into<String>) -> Self {
        let label = label.into();
        match resource {
            SubResource::Frame => self.snapshot.frame_status = label,
            SubResource::Audio => self.snapshot.audio_status = label,
            SubResource::Ui => self.snapshot.ui_status = label,
        }
        self
    }

    /// Set one pipeline's last-seen timestamp.
    pub fn last_seen(mut self, resource: SubResource, timestamp: impl Into<String>) -> Self {
        let timestamp = Some(timestamp.into());
        match resource {
            SubResource::Frame => self.snapshot.last_frame_timestamp = timestamp,
            SubResource::Audio => self.snapshot.last_audio_timestamp = timestamp,
            SubResource::Ui => self.snapshot.last_ui_timestamp = timestamp,
        }
        self
    }

    /// Set the message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.snapshot.message = message.into();
        self
    }

    /// Build the snapshot.
    pub fn build(self) -> StatusSnapshot {
        self.snapshot
    }
}

impl Default for StatusSnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
