//! Status labels used by health snapshots.

use core::fmt;

/// Overall health reported by the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OverallStatus {
    Ok,
    Error,
}

impl OverallStatus {
    /// The wire label for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OverallStatus::Ok => "ok",
            OverallStatus::Error => "error",
        }
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the capture pipelines the recorder reports on individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubResource {
    /// Screen frame capture.
    Frame,
    /// Audio capture.
    Audio,
    /// UI / accessibility tree capture.
    Ui,
}

impl SubResource {
    /// All sub-resources, in reporting order.
    pub const ALL: [SubResource; 3] = [SubResource::Frame, SubResource::Audio, SubResource::Ui];

    /// Short lowercase name used in logs and CLI output.
    pub fn name(&self) -> &'static str {
        match self {
            SubResource::Frame => "frame",
            SubResource::Audio => "audio",
            SubResource::Ui => "ui",
        }
    }
}

impl fmt::Display for SubResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sub-resource label for a healthy pipeline.
pub const LABEL_OK: &str = "ok";

/// Sub-resource label for a pipeline the user switched off.
pub const LABEL_DISABLED: &str = "disabled";

/// Sub-resource label used by synthesized error snapshots.
pub const LABEL_ERROR: &str = "error";
