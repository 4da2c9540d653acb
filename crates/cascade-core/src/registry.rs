//! The authoritative set of in-flight coins.
//!
//! The [`CoinRegistry`] owns every coin currently on the bed. It keeps two
//! views that must stay in lock-step: an ordered id list (insertion order,
//! which downstream consumers rely on for deterministic iteration) and an
//! id -> coin map for O(1) lookup. The registry is mutated only by the batch
//! processor and the drop/collect handlers; the physics/render collaborator
//! holds a read-only mirrored view keyed by the same ids.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::coin::{Coin, CoinId, CoinKind};
use crate::RegistryError;

// ---------------------------------------------------------------------------
// CoinView
// ---------------------------------------------------------------------------

/// Read-only per-coin snapshot handed to the render layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinView {
    /// The coin's identity, shared with the physics body side-table.
    pub id: CoinId,
    /// Current kind.
    pub kind: CoinKind,
    /// World position.
    pub position: [f32; 3],
    /// Euler rotation (y meaningful).
    pub rotation: [f32; 3],
    /// Whether the split latch is set.
    pub has_split: bool,
}

// ---------------------------------------------------------------------------
// CoinRegistry
// ---------------------------------------------------------------------------

/// Owns the live coin set and allocates ids.
///
/// Invariant: every id in `order` appears exactly once in `coins`, and vice
/// versa. Ids are monotonic and never recycled, so a stale id simply fails
/// the lookup.
#[derive(Debug, Default)]
pub struct CoinRegistry {
    /// Ids in insertion order.
    order: Vec<CoinId>,
    /// Id -> coin storage.
    coins: HashMap<CoinId, Coin>,
    /// Next raw id to hand out.
    next_id: u64,
}

impl CoinRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a coin of `kind` at `position`, returning its fresh id.
    pub fn spawn(&mut self, kind: CoinKind, position: [f32; 3]) -> CoinId {
        let id = CoinId::from_raw(self.next_id);
        self.next_id += 1;
        self.order.push(id);
        self.coins.insert(id, Coin::new(id, kind, position));
        id
    }

    /// Remove a coin, returning it.
    ///
    /// Removing an id that is not present returns
    /// [`RegistryError::StaleCoin`]; callers draining deduplicated event
    /// queues treat that as an expected skip.
    pub fn remove(&mut self, id: CoinId) -> Result<Coin, RegistryError> {
        match self.coins.remove(&id) {
            Some(coin) => {
                self.order.retain(|&c| c != id);
                Ok(coin)
            }
            None => Err(RegistryError::StaleCoin { id }),
        }
    }

    /// Shared access to a coin.
    pub fn get(&self, id: CoinId) -> Option<&Coin> {
        self.coins.get(&id)
    }

    /// Mutable access to a coin.
    pub fn get_mut(&mut self, id: CoinId) -> Option<&mut Coin> {
        self.coins.get_mut(&id)
    }

    /// Whether the id refers to a live coin.
    pub fn contains(&self, id: CoinId) -> bool {
        self.coins.contains_key(&id)
    }

    /// Number of live coins.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate coins in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.order.iter().filter_map(|id| self.coins.get(id))
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> &[CoinId] {
        &self.order
    }

    /// Remove every coin, returning the drained ids in insertion order.
    pub fn clear(&mut self) -> Vec<CoinId> {
        self.coins.clear();
        std::mem::take(&mut self.order)
    }

    /// The ordered render view, recomputed on demand after each batch drain.
    pub fn render_view(&self) -> Vec<CoinView> {
        self.iter()
            .map(|c| CoinView {
                id: c.id,
                kind: c.kind,
                position: c.position,
                rotation: c.rotation,
                has_split: c.has_split,
            })
            .collect()
    }

    /// Check the order/map lock-step invariant. Test and debug aid.
    pub fn check_consistency(&self) -> bool {
        if self.order.len() != self.coins.len() {
            return false;
        }
        let mut seen = std::collections::HashSet::new();
        for id in &self.order {
            if !seen.insert(*id) || !self.coins.contains_key(id) {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- 1. Spawn and lookup -------------------------------------------------

    #[test]
    fn spawn_and_get() {
        let mut reg = CoinRegistry::new();
        let id = reg.spawn(CoinKind::Copper, [1.0, 2.0, 3.0]);
        let coin = reg.get(id).unwrap();
        assert_eq!(coin.kind, CoinKind::Copper);
        assert_eq!(coin.position, [1.0, 2.0, 3.0]);
        assert!(reg.contains(id));
        assert_eq!(reg.len(), 1);
    }

    // -- 2. Ids are unique and never recycled --------------------------------

    #[test]
    fn ids_monotonic_across_removal() {
        let mut reg = CoinRegistry::new();
        let a = reg.spawn(CoinKind::Copper, [0.0; 3]);
        reg.remove(a).unwrap();
        let b = reg.spawn(CoinKind::Copper, [0.0; 3]);
        assert!(b > a, "ids must not be recycled");
    }

    // -- 3. Removal semantics ------------------------------------------------

    #[test]
    fn remove_returns_coin_and_second_remove_is_stale() {
        let mut reg = CoinRegistry::new();
        let id = reg.spawn(CoinKind::Gold, [0.0; 3]);
        let coin = reg.remove(id).unwrap();
        assert_eq!(coin.kind, CoinKind::Gold);
        assert!(matches!(
            reg.remove(id),
            Err(RegistryError::StaleCoin { .. })
        ));
        assert!(!reg.contains(id));
    }

    // -- 4. Insertion order --------------------------------------------------

    #[test]
    fn iteration_preserves_insertion_order() {
        let mut reg = CoinRegistry::new();
        let a = reg.spawn(CoinKind::Copper, [0.0; 3]);
        let b = reg.spawn(CoinKind::Silver, [0.0; 3]);
        let c = reg.spawn(CoinKind::Gold, [0.0; 3]);
        reg.remove(b).unwrap();
        let ids: Vec<CoinId> = reg.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a, c]);
    }

    // -- 5. Render view -------------------------------------------------------

    #[test]
    fn render_view_mirrors_registry() {
        let mut reg = CoinRegistry::new();
        let id = reg.spawn(CoinKind::Mirror, [0.5, 0.0, 0.5]);
        reg.get_mut(id).unwrap().has_split = true;
        let view = reg.render_view();
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, id);
        assert!(view[0].has_split);
    }

    // -- 6. Consistency invariant ---------------------------------------------

    #[test]
    fn consistency_holds_under_churn() {
        let mut reg = CoinRegistry::new();
        let mut live = Vec::new();
        for i in 0..100 {
            live.push(reg.spawn(CoinKind::Copper, [i as f32, 0.0, 0.0]));
            if i % 3 == 0 {
                let victim = live.remove(live.len() / 2);
                reg.remove(victim).unwrap();
            }
            assert!(reg.check_consistency());
        }
        assert_eq!(reg.len(), live.len());
    }

    // -- 7. Render view crosses the UI boundary as JSON -------------------------

    #[test]
    fn render_view_serializes_for_the_ui() {
        let mut reg = CoinRegistry::new();
        reg.spawn(CoinKind::Lucky, [0.0, 1.0, 0.0]);
        let json = serde_json::to_value(reg.render_view()).unwrap();
        assert_eq!(json[0]["kind"], "Lucky");
        assert_eq!(json[0]["has_split"], false);
    }

    // -- 8. Clear --------------------------------------------------------------

    #[test]
    fn clear_drains_everything_in_order() {
        let mut reg = CoinRegistry::new();
        let a = reg.spawn(CoinKind::Copper, [0.0; 3]);
        let b = reg.spawn(CoinKind::Silver, [0.0; 3]);
        let drained = reg.clear();
        assert_eq!(drained, vec![a, b]);
        assert!(reg.is_empty());
        assert!(reg.check_consistency());
    }
}
