//! End-of-tick event batch processor.
//!
//! Runs once per simulation tick, after physics has advanced and the reducer
//! has collapsed the raw contact stream. Drains the queued events in a fixed
//! priority order -- combines, then splits, then transmutes, then explosions
//! -- so that cross-event interactions are never order-dependent within a
//! tick. An event whose inputs were consumed by an earlier event in the same
//! drain is silently skipped; under deduplicated, possibly stale queues that
//! is the expected case, not a fault.
//!
//! The processor never talks to rendering, audio, or physics directly: every
//! registry mutation is surfaced as a one-shot [`CoinNotice`], and
//! detonations are returned as [`Detonation`]s for the caller to resolve
//! against the physics collaborator.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coin::{CoinId, CoinKind};
use crate::reducer::EventBatch;
use crate::registry::CoinRegistry;

// ---------------------------------------------------------------------------
// CoinNotice
// ---------------------------------------------------------------------------

/// One-shot notification of a registry mutation, for animation/audio hooks
/// and for the physics adapter to mirror.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CoinNotice {
    /// A coin entered the registry.
    Spawned {
        /// The new coin's id.
        id: CoinId,
        /// Its kind at spawn time.
        kind: CoinKind,
    },
    /// A coin left the registry.
    Removed {
        /// The departed id.
        id: CoinId,
    },
    /// A coin's kind changed in place (transmutation).
    Mutated {
        /// The unchanged identity.
        id: CoinId,
        /// The new kind.
        kind: CoinKind,
    },
}

// ---------------------------------------------------------------------------
// Detonation
// ---------------------------------------------------------------------------

/// A bomb that went off this tick. The detonating coin has already been
/// removed; the caller resolves the blast against nearby bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detonation {
    /// The removed bomb's id.
    pub source: CoinId,
    /// Where it was when it detonated.
    pub center: [f32; 3],
}

/// Result of one batch drain.
#[derive(Debug, Default)]
pub struct DrainOutcome {
    /// Registry mutations in application order.
    pub notices: Vec<CoinNotice>,
    /// Detonations awaiting blast resolution.
    pub detonations: Vec<Detonation>,
}

// ---------------------------------------------------------------------------
// Drain
// ---------------------------------------------------------------------------

/// Apply a deduplicated event batch to the registry.
pub fn drain(batch: EventBatch, registry: &mut CoinRegistry) -> DrainOutcome {
    let mut out = DrainOutcome::default();

    // Combines first: they consume the most inputs, so later event classes
    // see the post-fusion world.
    for ev in batch.combines {
        if !registry.contains(ev.a) || !registry.contains(ev.b) {
            debug!(a = %ev.a, b = %ev.b, "combine skipped, input already consumed");
            continue;
        }
        let first = registry.remove(ev.a).expect("presence checked above");
        let second = registry.remove(ev.b).expect("presence checked above");
        let mid = midpoint(first.position, second.position);
        let product = registry.spawn(ev.product, mid);
        out.notices.push(CoinNotice::Removed { id: ev.a });
        out.notices.push(CoinNotice::Removed { id: ev.b });
        out.notices.push(CoinNotice::Spawned {
            id: product,
            kind: ev.product,
        });
    }

    for ev in batch.splits {
        let Some(source) = registry.get_mut(ev.source) else {
            debug!(source = %ev.source, "split skipped, source gone");
            continue;
        };
        if source.has_split {
            debug!(source = %ev.source, "split skipped, already latched");
            continue;
        }
        source.has_split = true;
        let kind = source.kind;
        let clone = registry.spawn(kind, ev.spawn_point);
        // The clone is born latched so a split can never chain.
        registry
            .get_mut(clone)
            .expect("freshly spawned clone")
            .has_split = true;
        out.notices.push(CoinNotice::Spawned { id: clone, kind });
    }

    for ev in batch.transmutes {
        let Some(target) = registry.get_mut(ev.target) else {
            debug!(target = %ev.target, "transmute skipped, target gone");
            continue;
        };
        if target.kind == ev.product {
            debug!(target = %ev.target, "transmute skipped, already terminal");
            continue;
        }
        target.kind = ev.product;
        out.notices.push(CoinNotice::Mutated {
            id: ev.target,
            kind: ev.product,
        });
    }

    for ev in batch.explosions {
        let Ok(bomb) = registry.remove(ev.source) else {
            debug!(source = %ev.source, "detonation skipped, bomb gone");
            continue;
        };
        out.notices.push(CoinNotice::Removed { id: ev.source });
        out.detonations.push(Detonation {
            source: ev.source,
            center: bomb.position,
        });
    }

    out
}

fn midpoint(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        (a[0] + b[0]) * 0.5,
        (a[1] + b[1]) * 0.5,
        (a[2] + b[2]) * 0.5,
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
