//! Collision event reducer.
//!
//! The physics collaborator reports contact-begin notifications per pair per
//! step, possibly several times for the same logical contact within one
//! step. Nothing may mutate the registry from inside those callbacks:
//! instead the [`EventReducer`] classifies each notification and enqueues at
//! most one logical event per dedup key per tick. A later notification that
//! maps to a key already present is a no-op enqueue, not a double-apply.
//!
//! Queues preserve insertion order (a `Vec` guarded by a `HashSet` of keys)
//! so the end-of-tick drain in [`batch`](crate::batch) is deterministic.

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::coin::{CoinId, CoinKind};
use crate::registry::CoinRegistry;
use crate::table::InteractionTable;

/// Squared relative speed above which an explosive-class coin detonates.
/// Gentle settling touches stay below this; hard impacts exceed it.
pub const IMPACT_THRESHOLD_SQ: f32 = 9.0;

/// Vertical clearance added to a split contact point so the clone spawns
/// above the bed instead of intersecting it.
pub const SPLIT_CLEARANCE: f32 = 0.25;

// ---------------------------------------------------------------------------
// Contact input
// ---------------------------------------------------------------------------

/// The non-coin side of a contact, or another coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactBody {
    /// Another coin on the bed.
    Coin(CoinId),
    /// The kinematic pusher actuator.
    Pusher,
    /// The static bed surface.
    Bed,
    /// A static side wall.
    Wall,
}

/// One oriented contact-begin notification.
///
/// The physics adapter reports each colliding pair in both orientations;
/// the reducer's dedup keys collapse the two into a single logical event.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// The coin this notification is delivered to.
    pub coin: CoinId,
    /// What it hit.
    pub other: ContactBody,
    /// Relative velocity between the two bodies at contact time.
    pub relative_velocity: [f32; 3],
    /// Approximate world-space contact location, when the adapter has one.
    pub point: Option<[f32; 3]>,
}

// ---------------------------------------------------------------------------
// Queued events
// ---------------------------------------------------------------------------

/// Two reactive coins fuse into a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombineEvent {
    /// The smaller-id reactant (tie-break winner).
    pub a: CoinId,
    /// The larger-id reactant.
    pub b: CoinId,
    /// The product kind from the rule table.
    pub product: CoinKind,
}

/// A splitter-class coin clones itself once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitEvent {
    /// The coin that split.
    pub source: CoinId,
    /// Where the clone spawns (contact point raised by the clearance).
    pub spawn_point: [f32; 3],
}

/// A catalyst converts a target coin's kind in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmuteEvent {
    /// The coin being converted. Identity is preserved.
    pub target: CoinId,
    /// The terminal kind from the rule table.
    pub product: CoinKind,
}

/// An explosive-class coin detonates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplodeEvent {
    /// The detonating coin.
    pub source: CoinId,
}

/// Everything the reducer queued this tick, drained in fixed priority order
/// by the batch processor.
#[derive(Debug, Default)]
pub struct EventBatch {
    /// Combine events, insertion order.
    pub combines: Vec<CombineEvent>,
    /// Split events, insertion order.
    pub splits: Vec<SplitEvent>,
    /// Transmute events, insertion order.
    pub transmutes: Vec<TransmuteEvent>,
    /// Explosion events, insertion order.
    pub explosions: Vec<ExplodeEvent>,
}

impl EventBatch {
    /// Total number of queued events.
    pub fn len(&self) -> usize {
        self.combines.len() + self.splits.len() + self.transmutes.len() + self.explosions.len()
    }

    /// Whether the batch holds no events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// EventReducer
// ---------------------------------------------------------------------------

/// Per-tick deduplicating event queue.
///
/// `observe` may be called any number of times per tick with duplicate or
/// symmetric notifications; `take_batch` hands the collapsed set to the
/// batch processor and resets the queues for the next tick.
#[derive(Debug, Default)]
pub struct EventReducer {
    batch: EventBatch,
    combine_keys: HashSet<(CoinId, CoinId, CoinKind)>,
    split_keys: HashSet<CoinId>,
    transmute_keys: HashSet<CoinId>,
    explosion_keys: HashSet<CoinId>,
}

impl EventReducer {
    /// Create an empty reducer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one contact notification and enqueue at most one event.
    ///
    /// Stale coin ids and non-participating kinds are rejected before any
    /// further work.
    pub fn observe(&mut self, registry: &CoinRegistry, table: &InteractionTable, contact: &Contact) {
        let Some(coin) = registry.get(contact.coin) else {
            trace!(coin = %contact.coin, "contact for stale coin dropped");
            return;
        };

        // Fast reject: kinds outside every collision class do nothing.
        if !table.participates(coin.kind) {
            return;
        }

        match contact.other {
            ContactBody::Coin(other_id) => {
                let Some(other) = registry.get(other_id) else {
                    trace!(other = %other_id, "contact against stale coin dropped");
                    return;
                };
                self.observe_coin_pair(table, coin.id, coin.kind, other.id, other.kind, contact);
            }
            ContactBody::Pusher => {
                if table.is_splitter(coin.kind) && !coin.has_split {
                    let point = contact.point.unwrap_or(coin.position);
                    self.enqueue_split(coin.id, point);
                }
                self.maybe_explode(table, coin.kind, coin.id, contact);
            }
            ContactBody::Bed | ContactBody::Wall => {
                self.maybe_explode(table, coin.kind, coin.id, contact);
            }
        }
    }

    /// Move the queued events out, resetting all dedup keys.
    pub fn take_batch(&mut self) -> EventBatch {
        self.combine_keys.clear();
        self.split_keys.clear();
        self.transmute_keys.clear();
        self.explosion_keys.clear();
        std::mem::take(&mut self.batch)
    }

    /// Number of events currently queued.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    // -- classification -----------------------------------------------------

    fn observe_coin_pair(
        &mut self,
        table: &InteractionTable,
        self_id: CoinId,
        self_kind: CoinKind,
        other_id: CoinId,
        other_kind: CoinKind,
        contact: &Contact,
    ) {
        // Combine: both sides reactive, table yields a product, and the
        // tie-break collapses the two symmetric callbacks into one event.
        if table.is_reactive(self_kind) && table.is_reactive(other_kind) {
            if let Some(product) = table.combine(self_kind, other_kind) {
                if self_id < other_id && self.combine_keys.insert((self_id, other_id, product)) {
                    debug!(a = %self_id, b = %other_id, ?product, "combine queued");
                    self.batch.combines.push(CombineEvent {
                        a: self_id,
                        b: other_id,
                        product,
                    });
                }
                return;
            }
        }

        // Transmute: keyed by the target so a second catalyst touching the
        // same coin in the same tick is a no-op enqueue.
        if let Some(product) = table.transmute_product(self_kind, other_kind) {
            if self.transmute_keys.insert(other_id) {
                debug!(target = %other_id, ?product, "transmute queued");
                self.batch.transmutes.push(TransmuteEvent {
                    target: other_id,
                    product,
                });
            }
            return;
        }

        self.maybe_explode(table, self_kind, self_id, contact);
    }

    fn maybe_explode(
        &mut self,
        table: &InteractionTable,
        kind: CoinKind,
        id: CoinId,
        contact: &Contact,
    ) {
        if !table.is_explosive(kind) {
            return;
        }
        let [vx, vy, vz] = contact.relative_velocity;
        let speed_sq = vx * vx + vy * vy + vz * vz;
        if speed_sq > IMPACT_THRESHOLD_SQ && self.explosion_keys.insert(id) {
            debug!(bomb = %id, speed_sq, "detonation queued");
            self.batch.explosions.push(ExplodeEvent { source: id });
        }
    }

    fn enqueue_split(&mut self, id: CoinId, point: [f32; 3]) {
        if self.split_keys.insert(id) {
            let spawn_point = [point[0], point[1] + SPLIT_CLEARANCE, point[2]];
            debug!(source = %id, "split queued");
            self.batch.splits.push(SplitEvent {
                source: id,
                spawn_point,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (CoinRegistry, InteractionTable, EventReducer) {
        (
            CoinRegistry::new(),
            InteractionTable::standard(),
            EventReducer::new(),
        )
    }

    fn coin_contact(coin: CoinId, other: CoinId) -> Contact {
        Contact {
            coin,
            other: ContactBody::Coin(other),
            relative_velocity: [0.0; 3],
            point: None,
        }
    }

    // -- 1. Combine dedup: both orientations collapse to one -----------------

    #[test]
    fn symmetric_callbacks_produce_one_combine() {
        let (mut reg, table, mut red) = setup();
        let ore = reg.spawn(CoinKind::Ore, [0.0; 3]);
        let flux = reg.spawn(CoinKind::Flux, [1.0, 0.0, 0.0]);

        red.observe(&reg, &table, &coin_contact(ore, flux));
        red.observe(&reg, &table, &coin_contact(flux, ore));

        let batch = red.take_batch();
        assert_eq!(batch.combines.len(), 1);
        let ev = batch.combines[0];
        assert_eq!((ev.a, ev.b), (ore, flux));
        assert_eq!(ev.product, CoinKind::Ingot);
    }

    #[test]
    fn repeated_contacts_within_tick_collapse() {
        let (mut reg, table, mut red) = setup();
        let key = reg.spawn(CoinKind::Key, [0.0; 3]);
        let chest = reg.spawn(CoinKind::Chest, [0.0; 3]);

        for _ in 0..8 {
            red.observe(&reg, &table, &coin_contact(key, chest));
            red.observe(&reg, &table, &coin_contact(chest, key));
        }
        assert_eq!(red.take_batch().combines.len(), 1);
    }

    // -- 2. Non-participating kinds rejected ---------------------------------

    #[test]
    fn plain_currency_contacts_queue_nothing() {
        let (mut reg, table, mut red) = setup();
        let a = reg.spawn(CoinKind::Silver, [0.0; 3]);
        let b = reg.spawn(CoinKind::Gold, [0.0; 3]);
        red.observe(&reg, &table, &coin_contact(a, b));
        red.observe(&reg, &table, &coin_contact(b, a));
        assert!(red.take_batch().is_empty());
    }

    #[test]
    fn reactive_pair_without_rule_queues_nothing() {
        let (mut reg, table, mut red) = setup();
        let ore = reg.spawn(CoinKind::Ore, [0.0; 3]);
        let key = reg.spawn(CoinKind::Key, [0.0; 3]);
        red.observe(&reg, &table, &coin_contact(ore, key));
        assert!(red.take_batch().is_empty());
    }

    // -- 3. Stale ids dropped -------------------------------------------------

    #[test]
    fn stale_coin_contact_is_dropped() {
        let (mut reg, table, mut red) = setup();
        let ore = reg.spawn(CoinKind::Ore, [0.0; 3]);
        let flux = reg.spawn(CoinKind::Flux, [0.0; 3]);
        reg.remove(flux).unwrap();
        red.observe(&reg, &table, &coin_contact(ore, flux));
        red.observe(&reg, &table, &coin_contact(flux, ore));
        assert!(red.take_batch().is_empty());
    }

    // -- 4. Split classification ----------------------------------------------

    #[test]
    fn split_requires_pusher_contact() {
        let (mut reg, table, mut red) = setup();
        let mirror = reg.spawn(CoinKind::Mirror, [0.0, 0.5, 0.0]);

        red.observe(
            &reg,
            &table,
            &Contact {
                coin: mirror,
                other: ContactBody::Bed,
                relative_velocity: [0.0; 3],
                point: None,
            },
        );
        assert!(red.take_batch().splits.is_empty());

        red.observe(
            &reg,
            &table,
            &Contact {
                coin: mirror,
                other: ContactBody::Pusher,
                relative_velocity: [0.0; 3],
                point: Some([1.0, 0.5, 2.0]),
            },
        );
        let batch = red.take_batch();
        assert_eq!(batch.splits.len(), 1);
        assert_eq!(
            batch.splits[0].spawn_point,
            [1.0, 0.5 + SPLIT_CLEARANCE, 2.0]
        );
    }

    #[test]
    fn already_split_coin_never_requeues() {
        let (mut reg, table, mut red) = setup();
        let mirror = reg.spawn(CoinKind::Mirror, [0.0; 3]);
        reg.get_mut(mirror).unwrap().has_split = true;
        red.observe(
            &reg,
            &table,
            &Contact {
                coin: mirror,
                other: ContactBody::Pusher,
                relative_velocity: [0.0; 3],
                point: None,
            },
        );
        assert!(red.take_batch().splits.is_empty());
    }

    #[test]
    fn duplicate_pusher_contacts_queue_one_split() {
        let (mut reg, table, mut red) = setup();
        let mirror = reg.spawn(CoinKind::Mirror, [0.0; 3]);
        for _ in 0..5 {
            red.observe(
                &reg,
                &table,
                &Contact {
                    coin: mirror,
                    other: ContactBody::Pusher,
                    relative_velocity: [0.0; 3],
                    point: None,
                },
            );
        }
        assert_eq!(red.take_batch().splits.len(), 1);
    }

    // -- 5. Transmute keyed by target -----------------------------------------

    #[test]
    fn transmute_queued_once_per_target() {
        let (mut reg, table, mut red) = setup();
        let cat_a = reg.spawn(CoinKind::Quicksilver, [0.0; 3]);
        let cat_b = reg.spawn(CoinKind::Quicksilver, [0.0; 3]);
        let copper = reg.spawn(CoinKind::Copper, [0.0; 3]);

        red.observe(&reg, &table, &coin_contact(cat_a, copper));
        red.observe(&reg, &table, &coin_contact(cat_b, copper));

        let batch = red.take_batch();
        assert_eq!(batch.transmutes.len(), 1);
        assert_eq!(batch.transmutes[0].target, copper);
        assert_eq!(batch.transmutes[0].product, CoinKind::Gold);
    }

    #[test]
    fn base_side_of_transmute_does_not_enqueue() {
        let (mut reg, table, mut red) = setup();
        let copper = reg.spawn(CoinKind::Copper, [0.0; 3]);
        let cat = reg.spawn(CoinKind::Quicksilver, [0.0; 3]);
        // Copper does not participate, so its orientation is a fast reject.
        red.observe(&reg, &table, &coin_contact(copper, cat));
        assert!(red.take_batch().is_empty());
    }

    // -- 6. Explosion threshold -----------------------------------------------

    #[test]
    fn bomb_detonates_only_above_threshold() {
        let (mut reg, table, mut red) = setup();
        let bomb = reg.spawn(CoinKind::Bomb, [0.0; 3]);
        let wall = Contact {
            coin: bomb,
            other: ContactBody::Wall,
            relative_velocity: [1.0, 0.0, 0.0],
            point: None,
        };
        red.observe(&reg, &table, &wall);
        assert!(red.take_batch().explosions.is_empty(), "gentle touch");

        // Exactly at the threshold: still a settling touch.
        let at = Contact {
            relative_velocity: [3.0, 0.0, 0.0],
            ..wall
        };
        red.observe(&reg, &table, &at);
        assert!(red.take_batch().explosions.is_empty(), "boundary is exclusive");

        let hard = Contact {
            relative_velocity: [3.0, 0.5, 0.0],
            ..wall
        };
        red.observe(&reg, &table, &hard);
        red.observe(&reg, &table, &hard);
        let batch = red.take_batch();
        assert_eq!(batch.explosions.len(), 1);
        assert_eq!(batch.explosions[0].source, bomb);
    }

    // -- 7. Fresh tick, fresh keys ---------------------------------------------

    #[test]
    fn keys_reset_after_take_batch() {
        let (mut reg, table, mut red) = setup();
        let ore = reg.spawn(CoinKind::Ore, [0.0; 3]);
        let flux = reg.spawn(CoinKind::Flux, [0.0; 3]);

        red.observe(&reg, &table, &coin_contact(ore, flux));
        assert_eq!(red.take_batch().combines.len(), 1);

        // Next tick: the pair still exists, so the event may queue again.
        // (In practice the batch processor consumed both coins already.)
        red.observe(&reg, &table, &coin_contact(ore, flux));
        assert_eq!(red.take_batch().combines.len(), 1);
    }
}
