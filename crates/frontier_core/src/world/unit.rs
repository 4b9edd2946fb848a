//! Units: structures, transport ships and missiles.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::map::TileRef;
use crate::world::SmallId;
use crate::Tick;

/// Unique identifier for units. Never reused within a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Kind of unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitType {
    /// Raises the owner's troop cap.
    City,
    /// Generates trade income with other ports. Must sit on a shore tile.
    Port,
    /// Makes nearby tiles more expensive to conquer.
    DefensePost,
    /// Intercepts incoming nukes in range.
    SamLauncher,
    /// Launches atom bombs, hydrogen bombs and MIRVs.
    MissileSilo,
    /// Carries troops across water.
    TransportShip,
    /// Small nuke.
    AtomBomb,
    /// Large nuke.
    HydrogenBomb,
    /// Multiple independently targeted re-entry vehicle.
    Mirv,
    /// A single warhead split off a MIRV.
    MirvWarhead,
}

impl UnitType {
    /// Structures that stand on a tile and have an operating execution.
    pub const STRUCTURES: [UnitType; 5] = [
        UnitType::City,
        UnitType::Port,
        UnitType::DefensePost,
        UnitType::SamLauncher,
        UnitType::MissileSilo,
    ];

    /// Whether this kind is a static structure.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(
            self,
            Self::City | Self::Port | Self::DefensePost | Self::SamLauncher | Self::MissileSilo
        )
    }

    /// Whether this kind is launched from a missile silo.
    #[must_use]
    pub const fn is_nuke(self) -> bool {
        matches!(
            self,
            Self::AtomBomb | Self::HydrogenBomb | Self::Mirv | Self::MirvWarhead
        )
    }

    /// Whether players may order this kind through `build_unit`.
    #[must_use]
    pub const fn is_buildable(self) -> bool {
        !matches!(self, Self::TransportShip | Self::MirvWarhead)
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::City => "City",
            Self::Port => "Port",
            Self::DefensePost => "Defense Post",
            Self::SamLauncher => "SAM Launcher",
            Self::MissileSilo => "Missile Silo",
            Self::TransportShip => "Transport Ship",
            Self::AtomBomb => "Atom Bomb",
            Self::HydrogenBomb => "Hydrogen Bomb",
            Self::Mirv => "MIRV",
            Self::MirvWarhead => "MIRV Warhead",
        };
        f.write_str(name)
    }
}

/// A unit on the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique id.
    pub id: UnitId,
    /// Kind of unit.
    pub kind: UnitType,
    /// Current owner.
    pub owner: SmallId,
    /// Current tile (launch tile for missiles, departure tile for ships).
    pub tile: TileRef,
    /// Destination for ships and missiles.
    pub target_tile: Option<TileRef>,
    /// Structures stay inert until construction completes.
    pub under_construction: bool,
    /// Troops carried by a transport ship.
    pub troops: u64,
    /// Set by a cancel intent; the owning execution reacts on its next tick.
    pub retreating: bool,
    /// Tick until which the unit is on cooldown (silos, SAM launchers).
    pub cooldown_until: Option<Tick>,
}

impl Unit {
    /// Create a unit with default state.
    #[must_use]
    pub const fn new(id: UnitId, kind: UnitType, owner: SmallId, tile: TileRef) -> Self {
        Self {
            id,
            kind,
            owner,
            tile,
            target_tile: None,
            under_construction: false,
            troops: 0,
            retreating: false,
            cooldown_until: None,
        }
    }

    /// Whether the unit is built and off cooldown at `tick`.
    #[must_use]
    pub fn is_ready(&self, tick: Tick) -> bool {
        !self.under_construction && self.cooldown_until.map_or(true, |until| tick >= until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_classification() {
        for kind in UnitType::STRUCTURES {
            assert!(kind.is_structure());
            assert!(!kind.is_nuke());
            assert!(kind.is_buildable());
        }
        assert!(UnitType::Mirv.is_nuke());
        assert!(!UnitType::TransportShip.is_buildable());
        assert!(!UnitType::MirvWarhead.is_buildable());
    }

    #[test]
    fn test_ready_respects_cooldown() {
        let mut silo = Unit::new(UnitId(1), UnitType::MissileSilo, SmallId(1), 0);
        assert!(silo.is_ready(0));
        silo.cooldown_until = Some(10);
        assert!(!silo.is_ready(9));
        assert!(silo.is_ready(10));
        silo.under_construction = true;
        assert!(!silo.is_ready(20));
    }
}
