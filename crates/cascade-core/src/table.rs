//! Static interaction rule table.
//!
//! The [`InteractionTable`] is the single declarative source for which coin
//! kinds do anything on contact: symmetric combine pairs, the splitter and
//! explosive classes, and transmutation rules. Kinds that appear in no class
//! are rejected by the reducer before any lookup work, which both keeps the
//! hot path cheap and prevents accidental cross-reactions.
//!
//! The table is validated at construction. An inconsistent table is a
//! programming error and panics immediately rather than misbehaving per
//! event at runtime.

use std::collections::{HashMap, HashSet};

use crate::coin::CoinKind;

// ---------------------------------------------------------------------------
// TransmuteRule
// ---------------------------------------------------------------------------

/// A catalyst kind that converts a base kind into a terminal kind in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmuteRule {
    /// The kind that triggers the conversion.
    pub catalyst: CoinKind,
    /// The kind that gets converted.
    pub base: CoinKind,
    /// The kind the target becomes. Re-triggering on a coin already of this
    /// kind is a no-op downstream.
    pub terminal: CoinKind,
}

// ---------------------------------------------------------------------------
// InteractionTable
// ---------------------------------------------------------------------------

/// Declarative mapping from kind pairs to reaction outcomes.
#[derive(Debug, Clone)]
pub struct InteractionTable {
    /// Combine products keyed by the normalized (smaller, larger) kind pair.
    combine: HashMap<(CoinKind, CoinKind), CoinKind>,
    /// Kinds eligible for combine detection (derived from `combine` keys).
    reactive: HashSet<CoinKind>,
    /// Kinds that clone themselves once on pusher contact.
    splitter: HashSet<CoinKind>,
    /// Kinds that detonate on hard impacts.
    explosive: HashSet<CoinKind>,
    /// In-place conversion rules.
    transmute: Vec<TransmuteRule>,
}

impl InteractionTable {
    /// Build a table from explicit declarations and validate it.
    ///
    /// # Panics
    ///
    /// Panics if the declarations are inconsistent: a pair declared twice, a
    /// transmute rule whose base equals its terminal, or a kind claimed by
    /// more than one collision class.
    pub fn new(
        pairs: &[(CoinKind, CoinKind, CoinKind)],
        splitter: &[CoinKind],
        explosive: &[CoinKind],
        transmute: &[TransmuteRule],
    ) -> Self {
        let mut combine = HashMap::new();
        let mut reactive = HashSet::new();
        for &(a, b, product) in pairs {
            let key = Self::pair_key(a, b);
            assert!(
                combine.insert(key, product).is_none(),
                "combine pair ({a:?}, {b:?}) declared twice"
            );
            reactive.insert(a);
            reactive.insert(b);
        }

        for rule in transmute {
            assert!(
                rule.base != rule.terminal,
                "transmute rule for {:?} converts {:?} to itself",
                rule.catalyst,
                rule.base
            );
        }

        let table = Self {
            combine,
            reactive,
            splitter: splitter.iter().copied().collect(),
            explosive: explosive.iter().copied().collect(),
            transmute: transmute.to_vec(),
        };
        table.assert_classes_disjoint();
        table
    }

    /// The standard game table.
    ///
    /// Ore + flux fuse into an ingot; a key meeting a chest fuses into a
    /// relic. Mirrors split, bombs explode, quicksilver turns copper to gold.
    pub fn standard() -> Self {
        Self::new(
            &[
                (CoinKind::Ore, CoinKind::Flux, CoinKind::Ingot),
                (CoinKind::Key, CoinKind::Chest, CoinKind::Relic),
            ],
            &[CoinKind::Mirror],
            &[CoinKind::Bomb],
            &[TransmuteRule {
                catalyst: CoinKind::Quicksilver,
                base: CoinKind::Copper,
                terminal: CoinKind::Gold,
            }],
        )
    }

    /// Combine product for a pair of kinds, order-independent.
    pub fn combine(&self, a: CoinKind, b: CoinKind) -> Option<CoinKind> {
        self.combine.get(&Self::pair_key(a, b)).copied()
    }

    /// Whether a kind is eligible for combine detection at all.
    pub fn is_reactive(&self, kind: CoinKind) -> bool {
        self.reactive.contains(&kind)
    }

    /// Whether a kind clones itself on pusher contact.
    pub fn is_splitter(&self, kind: CoinKind) -> bool {
        self.splitter.contains(&kind)
    }

    /// Whether a kind detonates on hard impacts.
    pub fn is_explosive(&self, kind: CoinKind) -> bool {
        self.explosive.contains(&kind)
    }

    /// Terminal kind if `catalyst` converts `target`, else `None`.
    pub fn transmute_product(&self, catalyst: CoinKind, target: CoinKind) -> Option<CoinKind> {
        self.transmute
            .iter()
            .find(|r| r.catalyst == catalyst && r.base == target)
            .map(|r| r.terminal)
    }

    /// Whether a kind is a transmutation catalyst.
    pub fn is_catalyst(&self, kind: CoinKind) -> bool {
        self.transmute.iter().any(|r| r.catalyst == kind)
    }

    /// Fast reject: does this kind participate in any collision class?
    ///
    /// Kinds outside every class skip the coin-interaction check entirely.
    pub fn participates(&self, kind: CoinKind) -> bool {
        self.reactive.contains(&kind)
            || self.splitter.contains(&kind)
            || self.explosive.contains(&kind)
            || self.is_catalyst(kind)
    }

    // -- internal helpers ---------------------------------------------------

    fn pair_key(a: CoinKind, b: CoinKind) -> (CoinKind, CoinKind) {
        if a <= b { (a, b) } else { (b, a) }
    }

    fn assert_classes_disjoint(&self) {
        for kind in CoinKind::ALL {
            let classes = [
                self.reactive.contains(&kind),
                self.splitter.contains(&kind),
                self.explosive.contains(&kind),
                self.is_catalyst(kind),
            ];
            let count = classes.iter().filter(|&&c| c).count();
            assert!(
                count <= 1,
                "kind {kind:?} belongs to {count} collision classes, expected at most 1"
            );
        }
    }
}

impl Default for InteractionTable {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
