//! Cascade engine -- rapier3d physics collaborator and session driver for
//! the coin pusher core.
//!
//! [`cascade_core`] owns the rules; this crate owns the simulation plumbing:
//! the [`PusherWorld`](physics::PusherWorld) adapter exposes exactly the
//! narrow interface the core consumes (contact notifications, a radius
//! query, impulse application, a collection sensor), and the
//! [`Session`](session::Session) runs the fixed-timestep pipeline that
//! turns contacts into exactly-once game transitions.
//!
//! # Quick Start
//!
//! ```
//! use cascade_engine::prelude::*;
//!
//! let mut session = Session::new(SessionConfig::default());
//! session.start();
//! for _ in 0..60 {
//!     session.tick();
//! }
//! assert_eq!(session.tick_count(), 60);
//! ```

#![deny(unsafe_code)]

pub mod physics;
pub mod session;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the core crate for convenience.
pub use cascade_core;

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    // Everything from the core prelude.
    pub use cascade_core::prelude::*;

    // Engine-specific exports.
    pub use crate::physics::{BedConfig, PusherWorld, StepEvents};
    pub use crate::session::{Session, SessionConfig, TickReport};
}
