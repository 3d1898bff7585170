//! Daggerheart rules for Lorekeep.
//!
//! Derives per-character vitals, profiles, and the campaign GM Fear pool
//! from `daggerheart.*` events, and checks those events against the game's
//! rules.
//!
//! # Modules
//!
//! - [`events`] -- Event types and payload schemas
//! - [`profile`] -- Character profiles and per-kind defaults
//! - [`state`] -- Character vitals, caps, and conditions
//! - [`rules`] -- Pure rule helpers (patches, the vulnerable bracket, damage)
//! - [`validate`] -- Per-event rule checks
//! - [`adapter`] -- [`DaggerheartAdapter`], the projection engine plug-in

pub mod adapter;
pub mod events;
pub mod profile;
pub mod rules;
pub mod state;
pub mod validate;

pub use adapter::{DaggerheartAdapter, character_profile, character_state};
pub use events::{DeathMove, Severity};
pub use profile::{Experience, Profile, Traits, profile_defaults};
pub use rules::{
    Adjust, PatchRequest, apply_patch, damage_severity, resolve_damage, resolve_death_move,
    resolve_patch, vulnerable_transition,
};
pub use state::{CharacterState, LifeState};
pub use validate::{validate_event, validate_state_patch};

/// The `system_id` stamped on every Daggerheart event.
pub const SYSTEM_ID: &str = "daggerheart";

/// The `system_version` stamped on events this crate emits.
pub const SYSTEM_VERSION: &str = "1.0.0";
