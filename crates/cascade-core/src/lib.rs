//! Cascade core -- coin-interaction and economy state machine for a
//! physics-driven coin pusher.
//!
//! The physics collaborator reports raw contact notifications, possibly
//! several per pair per step. This crate turns that stream into
//! exactly-once game transitions:
//!
//! 1. The [`EventReducer`](reducer::EventReducer) classifies each contact
//!    and deduplicates it into at most one logical event per key per tick.
//! 2. Once per tick, [`batch::drain`] applies the collapsed events to the
//!    [`CoinRegistry`](registry::CoinRegistry) in a fixed priority order,
//!    surfacing every mutation as a one-shot notice.
//! 3. The [`Economy`](economy::Economy) state machine turns collections
//!    into cash, score, and bonus-meter progress, deferring re-entrant
//!    effects (jackpot bursts) to a caller-drained queue.
//!
//! Nothing here touches physics, rendering, or audio; see the engine crate
//! for the rapier adapter and the session driver.
//!
//! # Quick Start
//!
//! ```
//! use cascade_core::prelude::*;
//!
//! let table = InteractionTable::standard();
//! let mut registry = CoinRegistry::new();
//! let mut reducer = EventReducer::new();
//!
//! let ore = registry.spawn(CoinKind::Ore, [0.0, 0.5, 0.0]);
//! let flux = registry.spawn(CoinKind::Flux, [0.1, 0.5, 0.0]);
//!
//! // Both orientations of the same contact arrive; one event results.
//! for (a, b) in [(ore, flux), (flux, ore)] {
//!     reducer.observe(&registry, &table, &Contact {
//!         coin: a,
//!         other: ContactBody::Coin(b),
//!         relative_velocity: [0.0; 3],
//!         point: None,
//!     });
//! }
//!
//! let outcome = cascade_core::batch::drain(reducer.take_batch(), &mut registry);
//! assert_eq!(registry.len(), 1);
//! assert_eq!(outcome.notices.len(), 3);
//! ```

#![deny(unsafe_code)]

pub mod batch;
pub mod blast;
pub mod coin;
pub mod economy;
pub mod reducer;
pub mod registry;
pub mod table;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by registry operations.
///
/// Stale ids are *expected* under deduplicated event processing; callers in
/// the event path treat this as a skip, not a fault.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The coin is not (or no longer) in the registry.
    #[error("coin {id} is not in the registry (already consumed or never spawned)")]
    StaleCoin {
        /// The id that failed the lookup.
        id: coin::CoinId,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::batch::{drain, CoinNotice, Detonation, DrainOutcome};
    pub use crate::blast::{radial_impulses, BLAST_FORCE, BLAST_RADIUS};
    pub use crate::coin::{Coin, CoinId, CoinKind};
    pub use crate::economy::{
        ArtifactId, Economy, EconomyView, PendingEffect, Phase,
    };
    pub use crate::reducer::{
        Contact, ContactBody, EventBatch, EventReducer, IMPACT_THRESHOLD_SQ,
    };
    pub use crate::registry::{CoinRegistry, CoinView};
    pub use crate::table::{InteractionTable, TransmuteRule};
    pub use crate::RegistryError;
}
