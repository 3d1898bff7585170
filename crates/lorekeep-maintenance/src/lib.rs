//! Integrity and replay tooling for Lorekeep event logs.
//!
//! Projections are derived state; the event log is the truth. This crate
//! walks a campaign's log and either checks it, rebuilds the game system
//! projections from it, or compares a scratch rebuild against what is live.
//!
//! # Modes
//!
//! | Mode | Flag | Writes |
//! |------|------|--------|
//! | [`Mode::Scan`] | `--dry-run` | nothing |
//! | [`Mode::Validate`] | `--validate` | nothing |
//! | [`Mode::Replay`] | (default) | live system projections |
//! | [`Mode::Integrity`] | `--integrity` | nothing |
//!
//! # Modules
//!
//! - [`options`] -- [`Options`], [`Flags`] and campaign selection
//! - [`runner`] -- [`Maintenance`], one pass per campaign
//! - [`report`] -- [`CampaignResult`] and its renderings
//! - [`error`] -- [`MaintenanceError`]

pub mod error;
pub mod options;
pub mod report;
pub mod runner;

pub use error::MaintenanceError;
pub use options::{CampaignSelection, Flags, Mode, Options, resolve_campaign_ids, split_csv};
pub use report::{CampaignResult, IntegrityReport, Report, ScanReport, cap_warnings};
pub use runner::Maintenance;
