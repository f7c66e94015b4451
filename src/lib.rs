//! # healthwatch
//!
//! Command-line monitor for a recorder's live health feed.
//!
//! The heavy lifting lives in [`healthwatch_client`]: one self-healing
//! connection, duplicate suppression and subscriber fan-out. This crate adds
//! what the `healthwatch` binary needs on top:
//!
//! - **[`settings`]**: layered configuration (defaults, TOML file,
//!   `HEALTHWATCH_*` environment, flags)
//! - **[`assessment`]**: a single healthy/degraded/down verdict per snapshot,
//!   aware of which capture pipelines are expected to run
//!
//! ## Usage
//!
//! ```bash
//! # Follow the local recorder
//! healthwatch
//!
//! # One JSON line per change, from another host, ignoring UI capture
//! healthwatch --endpoint ws://10.0.0.5:3030/ws/health --json --no-ui
//!
//! # Probe: exit 0 if healthy, 1 otherwise
//! healthwatch --once
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use healthwatch::{Assessment, Expectations};
//! use healthwatch_client::HealthMonitor;
//!
//! # tokio_test::block_on(async {
//! let monitor = HealthMonitor::builder().build().unwrap();
//! monitor.ensure_started();
//!
//! let verdict = Assessment::of(monitor.current_status().as_ref(), &Expectations::default());
//! println!("{verdict}");
//! # });
//! ```

pub mod assessment;
pub mod settings;

pub use assessment::{render_json, render_line, Assessment, Expectations};
pub use settings::{Overrides, Settings};
