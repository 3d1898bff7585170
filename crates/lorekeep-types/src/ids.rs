//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every entity in a campaign has a strongly-typed ID so that a character
//! id can never be passed where a participant id is expected. New ids use
//! UUID v7 (time-ordered) for efficient index locality in the event log.
//!
//! The nil UUID is treated as "empty": validation code rejects it wherever
//! an id is required.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// The nil identifier, used as the "missing" sentinel.
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Whether this identifier is the nil sentinel.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a campaign. Partition key of the event log.
    CampaignId
}

define_id! {
    /// Unique identifier for a participant (GM or player) in a campaign.
    ParticipantId
}

define_id! {
    /// Unique identifier for a character (PC or NPC) in a campaign.
    CharacterId
}

define_id! {
    /// Unique identifier for a play session.
    SessionId
}

define_id! {
    /// Unique identifier for a session gate.
    GateId
}
