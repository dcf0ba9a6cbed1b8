//! Elemental matchup resolution.

use serde::Serialize;
use utoipa::ToSchema;

use crate::state::game::Element;

/// Outcome tier of an attacker/defender element matchup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Advantage {
    /// Attacker's element beats the defender's; double damage.
    Critical,
    /// No barrier or same element; base damage.
    Normal,
    /// Defender's element beats the attacker's; half damage.
    Weak,
}

impl Advantage {
    /// Scale `base` damage by this tier: doubled on critical, halved on weak.
    pub fn damage(self, base: u8) -> u16 {
        let base = u16::from(base);
        match self {
            Advantage::Critical => base * 2,
            Advantage::Normal => base,
            Advantage::Weak => base / 2,
        }
    }
}

/// Resolve `attacker` against `defender`: fire beats leaf, water beats fire, leaf beats water.
pub fn advantage(attacker: Element, defender: Element) -> Advantage {
    if attacker.beats() == defender {
        Advantage::Critical
    } else if defender.beats() == attacker {
        Advantage::Weak
    } else {
        Advantage::Normal
    }
}
