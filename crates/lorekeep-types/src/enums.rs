//! Enumeration types shared across the campaign core.
//!
//! Every enum has a stable lower-case wire name used both in JSON payloads
//! and in the `PostgreSQL` projection tables. The wire names must never
//! change once events carrying them have been appended.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a wire string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    /// The enum being parsed.
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

/// Generates an enum with a fixed wire name per variant.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident : $kind:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $wire:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stable wire name of this variant.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    $($wire => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// Who caused an event to be appended.
    ActorType: "actor type" {
        /// The platform itself (migrations, derived rules, tooling).
        System => "system",
        /// A participant acting through their own identity.
        Participant => "participant",
        /// A participant acting with game-master authority.
        Gm => "gm",
    }
}

wire_enum! {
    /// Lifecycle status of a campaign.
    ///
    /// Legal edges are enforced by `lorekeep-campaign`:
    /// Draft -> Active -> {Completed, Archived}; Archived -> Draft.
    CampaignStatus: "campaign status" {
        /// Created but not yet played.
        Draft => "draft",
        /// In play.
        Active => "active",
        /// Finished; read-only.
        Completed => "completed",
        /// Shelved; may be restored to draft.
        Archived => "archived",
    }
}

wire_enum! {
    /// How the game master seat of a campaign is filled.
    GmMode: "gm mode" {
        /// A human runs the game.
        Human => "human",
        /// An AI runs the game.
        Ai => "ai",
        /// A human GM assisted by an AI.
        Hybrid => "hybrid",
    }
}

wire_enum! {
    /// Role of a participant within a campaign.
    ParticipantRole: "participant role" {
        /// Game master.
        Gm => "gm",
        /// Player.
        Player => "player",
    }
}

wire_enum! {
    /// Whether a participant seat is driven by a human or an AI.
    Controller: "controller" {
        /// Human-controlled seat.
        Human => "human",
        /// AI-controlled seat.
        Ai => "ai",
    }
}

wire_enum! {
    /// Player character or non-player character.
    CharacterKind: "character kind" {
        /// Player character.
        Pc => "pc",
        /// Non-player character.
        Npc => "npc",
    }
}

wire_enum! {
    /// Lifecycle status of a play session.
    SessionStatus: "session status" {
        /// The session is being played.
        Active => "active",
        /// The session has ended (terminal).
        Ended => "ended",
    }
}

wire_enum! {
    /// Lifecycle status of a session gate.
    GateStatus: "gate status" {
        /// The gate blocks play until resolved or abandoned.
        Open => "open",
        /// The gate was resolved (terminal).
        Resolved => "resolved",
        /// The gate was abandoned (terminal).
        Abandoned => "abandoned",
    }
}

wire_enum! {
    /// Who currently holds the session spotlight.
    SpotlightType: "spotlight type" {
        /// The game master holds the spotlight.
        Gm => "gm",
        /// A specific character holds the spotlight.
        Character => "character",
    }
}

impl SessionStatus {
    /// Whether the session can no longer change state.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ended)
    }
}

impl GateStatus {
    /// Whether the gate can no longer change state.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Open)
    }
}
