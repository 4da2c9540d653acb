//! Fixed-timestep session driver.
//!
//! One [`Session::tick`] runs the whole per-frame pipeline in a fixed order:
//!
//! 1. Advance the pusher stroke and step physics.
//! 2. Mirror simulated transforms back into the registry.
//! 3. Feed every oriented contact through the reducer (dedup happens there).
//! 4. Credit coins that entered the drop sensor.
//! 5. Drain the event batch and mirror the mutations into physics.
//! 6. Resolve detonations against nearby bodies.
//! 7. Drain deferred economy effects (jackpot bursts).
//! 8. Advance simulated time for bonus decay and refresh the render view.
//!
//! The registry is mutated only here and in the player-facing handlers
//! below, all on the single game-logic thread; the physics/render layer
//! only ever reads the per-tick view.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cascade_core::batch::{drain, CoinNotice};
use cascade_core::blast::{radial_impulses, BLAST_FORCE, BLAST_RADIUS};
use cascade_core::coin::{CoinId, CoinKind};
use cascade_core::economy::{ArtifactId, Economy, EconomyView, PendingEffect};
use cascade_core::reducer::EventReducer;
use cascade_core::registry::{CoinRegistry, CoinView};
use cascade_core::table::InteractionTable;

use crate::physics::{BedConfig, PusherWorld};

/// Coins spawned below this height have left the play volume without
/// reaching the sensor (side gutters); they are removed uncredited.
const CULL_Y: f32 = -3.0;

/// Height above the bed at which dropped and burst coins appear.
const DROP_HEIGHT: f32 = 1.2;

/// Base linear damping for coin bodies; each damping upgrade level adds to
/// this so upgraded beds settle faster.
const BASE_DAMPING: f32 = 0.2;
const DAMPING_PER_LEVEL: f32 = 0.3;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Session construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Fixed simulation time step in seconds.
    pub fixed_dt: f32,
    /// Seed for burst/drop placement jitter. Same seed, same session.
    pub seed: u64,
    /// Copper coins pre-seeded onto the bed by [`Session::start`].
    pub initial_fill: u32,
    /// Bed geometry.
    pub bed: BedConfig,
}

impl Default for SessionConfig {
    /// 60 Hz, a fixed seed, and a dozen seeded coins.
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            seed: 7,
            initial_fill: 12,
            bed: BedConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// TickReport
// ---------------------------------------------------------------------------

/// What one tick did, for animation/audio hooks.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TickReport {
    /// One-shot registry mutation notices in application order.
    pub notices: Vec<CoinNotice>,
    /// Coins credited by the drop sensor this tick.
    pub collected: Vec<(CoinId, CoinKind)>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Owns the full game: physics collaborator, registry, rule table, reducer,
/// and economy.
pub struct Session {
    config: SessionConfig,
    physics: PusherWorld,
    registry: CoinRegistry,
    table: InteractionTable,
    reducer: EventReducer,
    economy: Economy,
    rng: Pcg32,
    tick_count: u64,
    view: Vec<CoinView>,
}

impl Session {
    /// Build a session with the standard rule table.
    pub fn new(config: SessionConfig) -> Self {
        let physics = PusherWorld::new(config.bed.clone());
        let rng = Pcg32::seed_from_u64(config.seed);
        Self {
            config,
            physics,
            registry: CoinRegistry::new(),
            table: InteractionTable::standard(),
            reducer: EventReducer::new(),
            economy: Economy::new(),
            rng,
            tick_count: 0,
            view: Vec::new(),
        }
    }

    /// Leave the menu and seed the bed with the initial copper fill.
    pub fn start(&mut self) -> bool {
        if !self.economy.start() {
            return false;
        }
        let d = self.config.bed.half_depth;
        for i in 0..self.config.initial_fill {
            // Deterministic grid above the middle of the bed.
            let col = (i % 4) as f32;
            let row = (i / 4) as f32;
            let pos = [
                -0.45 + col * 0.3,
                0.3 + row * 0.3,
                d * 0.2 + (row * 0.1),
            ];
            self.spawn_coin(CoinKind::Copper, pos);
        }
        info!(fill = self.config.initial_fill, "session started");
        true
    }

    /// Drop one coin from the deck at the drop slot. `false` when the deck
    /// is empty or the phase disallows dropping.
    pub fn drop_coin(&mut self, kind: CoinKind) -> bool {
        if !self.economy.take_deck_coin(kind) {
            debug!(?kind, "drop rejected");
            return false;
        }
        let x = self.rng.gen_range(-0.3..0.3);
        let z = -self.config.bed.half_depth * 0.3;
        let id = self.spawn_coin(kind, [x, DROP_HEIGHT, z]);
        debug!(%id, ?kind, "coin dropped");
        true
    }

    /// Direct spawn at an explicit position. Bypasses the deck; appropriate
    /// for initial setup and tests.
    pub fn spawn_coin(&mut self, kind: CoinKind, position: [f32; 3]) -> CoinId {
        let id = self.registry.spawn(kind, position);
        self.physics.register_coin(id, position, self.coin_damping());
        id
    }

    /// Run one fixed timestep.
    pub fn tick(&mut self) -> TickReport {
        let dt = self.config.fixed_dt;
        let mut report = TickReport::default();

        // 1. Pusher and physics.
        self.physics.advance_pusher(dt);
        let events = self.physics.step(dt);

        // 2. Mirror simulated transforms into the registry.
        for (id, position, rotation) in self.physics.read_positions() {
            if let Some(coin) = self.registry.get_mut(id) {
                coin.position = position;
                coin.rotation = rotation;
            }
        }

        // 3. Reduce the raw contact stream.
        for contact in &events.contacts {
            self.reducer.observe(&self.registry, &self.table, contact);
        }

        // 4. Collections. A stale id here means the coin was already
        // consumed; the sensor entry is silently dropped.
        for id in events.collected {
            let Ok(coin) = self.registry.remove(id) else {
                debug!(%id, "sensor entry for stale coin dropped");
                continue;
            };
            self.physics.unregister_coin(id);
            self.economy.collect(coin.kind);
            report.notices.push(CoinNotice::Removed { id });
            report.collected.push((id, coin.kind));
        }

        // 5. Drain the deduplicated event batch and mirror it into physics.
        let outcome = drain(self.reducer.take_batch(), &mut self.registry);
        for notice in &outcome.notices {
            match *notice {
                CoinNotice::Spawned { id, .. } => {
                    let position = self
                        .registry
                        .get(id)
                        .map(|c| c.position)
                        .unwrap_or([0.0, DROP_HEIGHT, 0.0]);
                    self.physics.register_coin(id, position, self.coin_damping());
                }
                CoinNotice::Removed { id } => self.physics.unregister_coin(id),
                CoinNotice::Mutated { .. } => {}
            }
        }
        report.notices.extend(outcome.notices);

        // 6. Blast resolution: query around each detonation, apply impulses.
        for det in &outcome.detonations {
            let nearby = self.physics.query_nearby(det.center, BLAST_RADIUS);
            for (id, impulse) in radial_impulses(det.center, BLAST_RADIUS, BLAST_FORCE, &nearby) {
                self.physics.apply_impulse(id, impulse);
            }
        }

        // 7. Deferred economy effects, outside the update that queued them.
        for effect in self.economy.take_effects() {
            match effect {
                PendingEffect::JackpotBurst { count } => {
                    info!(count, "jackpot burst");
                    for _ in 0..count {
                        let x = self.rng.gen_range(-0.4..0.4);
                        let z = self.rng.gen_range(-0.2..0.2);
                        let id = self.spawn_coin(CoinKind::Lucky, [x, DROP_HEIGHT, z]);
                        report.notices.push(CoinNotice::Spawned {
                            id,
                            kind: CoinKind::Lucky,
                        });
                    }
                }
            }
        }

        // 8. Cull coins that escaped the play volume without being sensed.
        let escaped: Vec<CoinId> = self
            .registry
            .iter()
            .filter(|c| c.position[1] < CULL_Y)
            .map(|c| c.id)
            .collect();
        for id in escaped {
            debug!(%id, "coin left the play volume uncredited");
            let _ = self.registry.remove(id);
            self.physics.unregister_coin(id);
            report.notices.push(CoinNotice::Removed { id });
        }

        // 9. Simulated time and the render view.
        self.economy.advance(dt);
        self.tick_count += 1;
        self.view = self.registry.render_view();
        report
    }

    // -- round & shop forwarding --------------------------------------------

    /// End the current round (Shop on success, GameOver on failure).
    pub fn end_round(&mut self) -> bool {
        self.economy.end_round()
    }

    /// Begin the next round from the shop.
    pub fn next_round(&mut self) -> bool {
        self.economy.next_round()
    }

    /// Full restart: clears the bed and returns to the menu snapshot.
    pub fn restart(&mut self) {
        for id in self.registry.clear() {
            self.physics.unregister_coin(id);
        }
        self.reducer.take_batch();
        self.economy.restart();
        self.view.clear();
    }

    /// Buy a pack of coins for the deck.
    pub fn buy_coins(&mut self, kind: CoinKind) -> bool {
        self.economy.buy_coins(kind)
    }

    /// Buy or level an artifact.
    pub fn buy_artifact(&mut self, id: ArtifactId) -> bool {
        self.economy.buy_artifact(id)
    }

    // -- accessors -----------------------------------------------------------

    /// The ordered live-entity view, recomputed after each tick.
    pub fn render_view(&self) -> &[CoinView] {
        &self.view
    }

    /// UI snapshot of the economy.
    pub fn economy_view(&self) -> EconomyView {
        self.economy.view()
    }

    /// Read access to the economy state machine.
    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    /// Number of coins currently on the bed.
    pub fn coin_count(&self) -> usize {
        self.registry.len()
    }

    /// Ticks run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Simulated seconds elapsed, computed (not accumulated) to avoid drift.
    pub fn sim_time(&self) -> f64 {
        self.tick_count as f64 * self.config.fixed_dt as f64
    }

    /// Read access to the registry, for inspection in tests.
    pub fn registry(&self) -> &CoinRegistry {
        &self.registry
    }

    // -- internal helpers ----------------------------------------------------

    fn coin_damping(&self) -> f32 {
        BASE_DAMPING + DAMPING_PER_LEVEL * self.economy.artifact_level(ArtifactId::Damping) as f32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::economy::Phase;

    #[test]
    fn start_seeds_the_bed() {
        let mut session = Session::new(SessionConfig::default());
        assert!(session.start());
        assert_eq!(session.coin_count(), 12);
        assert_eq!(session.physics.coin_count(), 12);
        assert_eq!(session.economy_view().phase, Phase::Playing);
        // Starting twice is a no-op.
        assert!(!session.start());
        assert_eq!(session.coin_count(), 12);
    }

    #[test]
    fn drop_coin_consumes_the_deck() {
        let mut session = Session::new(SessionConfig::default());
        session.start();
        let before = session.economy().deck_count(CoinKind::Copper);
        assert!(session.drop_coin(CoinKind::Copper));
        assert_eq!(session.economy().deck_count(CoinKind::Copper), before - 1);
        assert_eq!(session.coin_count(), 13);
        // No relics in the deck.
        assert!(!session.drop_coin(CoinKind::Relic));
    }

    #[test]
    fn registry_and_physics_stay_mirrored_under_simulation() {
        let mut session = Session::new(SessionConfig::default());
        session.start();
        for _ in 0..120 {
            session.tick();
            assert_eq!(session.coin_count(), session.physics.coin_count());
            assert!(session.registry().check_consistency());
        }
    }

    #[test]
    fn render_view_tracks_simulated_positions() {
        let mut session = Session::new(SessionConfig::default());
        session.start();
        session.tick();
        let first: Vec<[f32; 3]> = session.render_view().iter().map(|v| v.position).collect();
        for _ in 0..30 {
            session.tick();
        }
        let later: Vec<[f32; 3]> = session.render_view().iter().map(|v| v.position).collect();
        assert_eq!(first.len(), later.len());
        assert_ne!(first, later, "falling coins must move the view");
    }

    #[test]
    fn same_seed_same_session() {
        let run = |seed: u64| {
            let mut session = Session::new(SessionConfig {
                seed,
                ..SessionConfig::default()
            });
            session.start();
            session.drop_coin(CoinKind::Copper);
            for _ in 0..60 {
                session.tick();
            }
            session
                .render_view()
                .iter()
                .map(|v| (v.id, v.position))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn restart_clears_the_bed_and_economy() {
        let mut session = Session::new(SessionConfig::default());
        session.start();
        for _ in 0..10 {
            session.tick();
        }
        session.restart();
        assert_eq!(session.coin_count(), 0);
        assert_eq!(session.physics.coin_count(), 0);
        assert_eq!(session.economy_view().phase, Phase::Menu);
        // A restarted session can start again.
        assert!(session.start());
    }
}
