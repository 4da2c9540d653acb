//! Coin identifiers, kinds, and the in-flight coin entity.
//!
//! A [`CoinId`] is a 64-bit handle allocated monotonically by the registry
//! and never reused within a session. Because ids are never recycled,
//! "absent from the registry" is the stale-handle signal: consumers of a
//! lookup treat absence as a skip, not a fault.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// CoinId
// ---------------------------------------------------------------------------

/// An opaque coin identifier.
///
/// Ids are allocated in strictly increasing order and are unique for the
/// lifetime of a session. The ordering on the raw value provides the
/// tie-break used to deduplicate symmetric collision callbacks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CoinId(u64);

impl CoinId {
    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CoinId({})", self.0)
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "coin#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CoinKind
// ---------------------------------------------------------------------------

/// The fixed enumeration of coin kinds.
///
/// Which kinds react with which is declared in the
/// [`InteractionTable`](crate::table::InteractionTable), not here; this enum
/// only carries the per-kind economics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CoinKind {
    /// Baseline currency coin.
    Copper,
    /// Mid-tier currency coin.
    Silver,
    /// High-value currency coin.
    Gold,
    /// Raw resource; fuses with [`CoinKind::Flux`].
    Ore,
    /// Refining agent; fuses with [`CoinKind::Ore`].
    Flux,
    /// Fusion product of ore and flux.
    Ingot,
    /// Opens a chest on contact.
    Key,
    /// Opened by a key on contact.
    Chest,
    /// Reward produced by a key meeting a chest.
    Relic,
    /// Clones itself once when struck by the pusher.
    Mirror,
    /// Catalyst; turns copper into gold on contact.
    Quicksilver,
    /// Detonates on hard impacts.
    Bomb,
    /// Spawned by jackpot bursts.
    Lucky,
}

impl CoinKind {
    /// All kinds, in declaration order.
    pub const ALL: [CoinKind; 13] = [
        CoinKind::Copper,
        CoinKind::Silver,
        CoinKind::Gold,
        CoinKind::Ore,
        CoinKind::Flux,
        CoinKind::Ingot,
        CoinKind::Key,
        CoinKind::Chest,
        CoinKind::Relic,
        CoinKind::Mirror,
        CoinKind::Quicksilver,
        CoinKind::Bomb,
        CoinKind::Lucky,
    ];

    /// Cash credited when a coin of this kind is collected.
    pub fn value(self) -> u64 {
        match self {
            CoinKind::Copper => 1,
            CoinKind::Silver => 4,
            CoinKind::Gold => 10,
            CoinKind::Ore => 2,
            CoinKind::Flux => 2,
            CoinKind::Ingot => 12,
            CoinKind::Key => 3,
            CoinKind::Chest => 3,
            CoinKind::Relic => 40,
            CoinKind::Mirror => 4,
            CoinKind::Quicksilver => 6,
            CoinKind::Bomb => 0,
            CoinKind::Lucky => 8,
        }
    }

    /// Base score credited on collection, before multipliers.
    pub fn score_base(self) -> u64 {
        match self {
            CoinKind::Copper => 10,
            CoinKind::Silver => 40,
            CoinKind::Gold => 100,
            CoinKind::Ore => 20,
            CoinKind::Flux => 20,
            CoinKind::Ingot => 120,
            CoinKind::Key => 25,
            CoinKind::Chest => 25,
            CoinKind::Relic => 400,
            CoinKind::Mirror => 35,
            CoinKind::Quicksilver => 50,
            CoinKind::Bomb => 0,
            CoinKind::Lucky => 80,
        }
    }

    /// Purchase cost for one pack of this kind. `None` means the kind only
    /// enters circulation as a reaction product or jackpot spawn.
    pub fn pack_cost(self) -> Option<u64> {
        match self {
            CoinKind::Copper => Some(2),
            CoinKind::Silver => Some(12),
            CoinKind::Gold => Some(30),
            CoinKind::Ore => Some(6),
            CoinKind::Flux => Some(6),
            CoinKind::Ingot => None,
            CoinKind::Key => Some(10),
            CoinKind::Chest => Some(10),
            CoinKind::Relic => None,
            CoinKind::Mirror => Some(18),
            CoinKind::Quicksilver => Some(20),
            CoinKind::Bomb => Some(15),
            CoinKind::Lucky => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Coin
// ---------------------------------------------------------------------------

/// A coin currently on the bed.
///
/// The id is immutable for the coin's lifetime. A combine reaction destroys
/// both inputs and mints a product with a fresh id; transmutation is the one
/// mutation that changes `kind` in place without changing identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// Unique, immutable identity.
    pub id: CoinId,
    /// Current kind. Only transmutation changes this after creation.
    pub kind: CoinKind,
    /// World position, mirrored from the physics collaborator each tick.
    pub position: [f32; 3],
    /// Euler rotation; only the y component is meaningful.
    pub rotation: [f32; 3],
    /// Latched the first time a splitter-class coin triggers its split.
    /// Clones are born with this set so a split can never chain.
    pub has_split: bool,
    /// Reserved.
    pub is_active: bool,
}

impl Coin {
    /// Create a coin at the given position with default flags.
    pub fn new(id: CoinId, kind: CoinKind, position: [f32; 3]) -> Self {
        Self {
            id,
            kind,
            position,
            rotation: [0.0; 3],
            has_split: false,
            is_active: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_id_roundtrip_and_ordering() {
        let a = CoinId::from_raw(3);
        let b = CoinId::from_raw(7);
        assert!(a < b);
        assert_eq!(CoinId::from_raw(a.to_raw()), a);
        assert_eq!(format!("{a}"), "coin#3");
    }

    #[test]
    fn reaction_products_are_not_purchasable() {
        assert_eq!(CoinKind::Ingot.pack_cost(), None);
        assert_eq!(CoinKind::Relic.pack_cost(), None);
        assert_eq!(CoinKind::Lucky.pack_cost(), None);
    }

    #[test]
    fn purchasable_kinds_have_positive_cost() {
        for kind in CoinKind::ALL {
            if let Some(cost) = kind.pack_cost() {
                assert!(cost > 0, "{kind:?} has a zero pack cost");
            }
        }
    }

    #[test]
    fn bomb_is_worthless_on_collection() {
        assert_eq!(CoinKind::Bomb.value(), 0);
        assert_eq!(CoinKind::Bomb.score_base(), 0);
    }

    #[test]
    fn new_coin_has_default_flags() {
        let c = Coin::new(CoinId::from_raw(1), CoinKind::Copper, [0.0, 1.0, 0.0]);
        assert!(!c.has_split);
        assert!(c.is_active);
        assert_eq!(c.rotation, [0.0; 3]);
    }
}
