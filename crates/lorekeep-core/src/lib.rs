//! Command facade and runtime configuration for Lorekeep.
//!
//! [`Game`] is the write path: every command validates against current
//! projections, appends events to the log, and applies them before
//! returning, all while holding its campaign's single-writer lock.
//!
//! # Modules
//!
//! - [`game`] -- [`Game`], [`CommandContext`], and the append-then-apply
//!   write path
//! - [`campaigns`] -- Campaign creation, metadata, and lifecycle
//! - [`roster`] -- Participant seats and characters
//! - [`sessions`] -- Play sessions, gates, and the spotlight
//! - [`daggerheart`] -- Vitals, conditions, damage, death moves, rolls, and
//!   GM Fear
//! - [`locks`] -- [`CampaignLocks`], one async mutex per campaign
//! - [`clock`] -- [`Clock`] and its wall-clock and manual implementations
//! - [`config`] -- YAML configuration with environment overrides
//! - [`error`] -- [`GameError`]

pub mod campaigns;
pub mod clock;
pub mod config;
pub mod daggerheart;
pub mod error;
pub mod game;
pub mod locks;
pub mod roster;
pub mod sessions;

pub use campaigns::CampaignPatch;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, LorekeepConfig};
pub use daggerheart::DamageRequest;
pub use error::GameError;
pub use game::{CommandContext, Game};
pub use locks::{CampaignGuard, CampaignLocks};
pub use roster::{CharacterPatch, ParticipantPatch};
