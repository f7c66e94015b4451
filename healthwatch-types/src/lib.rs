//! # healthwatch-types
//!
//! Core types for the recorder health feed. A recording service publishes
//! one [`StatusSnapshot`] per message on its health endpoint; this crate
//! defines that payload so producers, the monitor client, and tooling agree
//! on a single shape.
//!
//! ## Features
//!
//! - `serde`: JSON (or any serde format) serialization of snapshots
//!
//! ## Example
//!
//! ```rust
//! use healthwatch_types::{OverallStatus, StatusSnapshot, SubResource};
//!
//! let snapshot = StatusSnapshot::builder()
//!     .status(OverallStatus::Ok)
//!     .status_code(200)
//!     .last_seen(SubResource::Frame, "2024-11-02T10:15:00Z")
//!     .resource_status(SubResource::Frame, "ok")
//!     .resource_status(SubResource::Audio, "disabled")
//!     .resource_status(SubResource::Ui, "ok")
//!     .message("all systems are functioning normally")
//!     .build();
//!
//! assert!(snapshot.is_ok());
//! assert_eq!(snapshot.resource_status(SubResource::Audio), "disabled");
//! ```

mod snapshot;
mod status;

pub use snapshot::*;
pub use status::*;

/// Status code carried by locally synthesized error snapshots.
pub const TRANSPORT_ERROR_CODE: u16 = 500;
