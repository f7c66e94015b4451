//! Dashboard verdict derived from the latest status snapshot.
//!
//! The recorder reports each sub-resource independently. This module folds a
//! snapshot into a single verdict, taking into account which sub-resources
//! the operator actually expects to be running.

use std::fmt;

use healthwatch_types::{StatusSnapshot, SubResource, LABEL_DISABLED, LABEL_OK};
use serde::Serialize;

/// Which sub-resources must be healthy for the recorder to count as healthy.
///
/// Frame capture is always required. Audio and UI capture can be switched
/// off in the recorder, in which case their status is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expectations {
    /// Audio capture is expected to run.
    pub audio: bool,
    /// UI capture is expected to run.
    pub ui: bool,
}

impl Expectations {
    /// Whether `resource` participates in the verdict.
    pub fn requires(&self, resource: SubResource) -> bool {
        match resource {
            SubResource::Frame => true,
            SubResource::Audio => self.audio,
            SubResource::Ui => self.ui,
        }
    }
}

impl Default for Expectations {
    fn default() -> Self {
        Self {
            audio: true,
            ui: true,
        }
    }
}

/// Overall verdict for a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    /// Nothing received yet.
    Unknown,
    /// The recorder reported an error, or the connection failed.
    Down,
    /// A required sub-resource is neither `ok` nor `disabled`.
    Degraded(SubResource),
    Healthy,
}

impl Assessment {
    /// Evaluate a snapshot against the given expectations.
    pub fn of(status: Option<&StatusSnapshot>, expectations: &Expectations) -> Self {
        let Some(status) = status else {
            return Assessment::Unknown;
        };
        if !status.is_ok() {
            return Assessment::Down;
        }

        SubResource::ALL
            .into_iter()
            .filter(|resource| expectations.requires(*resource))
            .find(|resource| {
                let label = status.resource_status(*resource);
                label != LABEL_OK && label != LABEL_DISABLED
            })
            .map_or(Assessment::Healthy, Assessment::Degraded)
    }

    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Assessment::Unknown => "...",
            Assessment::Down => "DOWN",
            Assessment::Degraded(_) => "WARN",
            Assessment::Healthy => "OK",
        }
    }

    /// Whether the verdict is based on an actual snapshot.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Assessment::Unknown)
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assessment::Unknown => f.write_str("waiting for status"),
            Assessment::Down => f.write_str("down"),
            Assessment::Degraded(resource) => write!(f, "{} degraded", resource),
            Assessment::Healthy => f.write_str("healthy"),
        }
    }
}

/// One output record, as printed with `--json`.
#[derive(Debug, Serialize)]
struct Report<'a> {
    assessment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<&'a StatusSnapshot>,
}

/// Render a delivery as a single human-readable line.
pub fn render_line(status: Option<&StatusSnapshot>, expectations: &Expectations) -> String {
    let assessment = Assessment::of(status, expectations);
    let Some(status) = status else {
        return format!("[{}] {}", assessment.symbol(), assessment);
    };

    let resources: Vec<String> = SubResource::ALL
        .into_iter()
        .map(|resource| format!("{}={}", resource, status.resource_status(resource)))
        .collect();

    format!(
        "[{}] {} ({}) {} | {}",
        assessment.symbol(),
        status.status,
        status.status_code,
        resources.join(" "),
        status.message
    )
}

/// Render a delivery as a single JSON line.
pub fn render_json(
    status: Option<&StatusSnapshot>,
    expectations: &Expectations,
) -> serde_json::Result<String> {
    let report = Report {
        assessment: Assessment::of(status, expectations).to_string(),
        snapshot: status,
    };
    serde_json::to_string(&report)
}
