//! Economy and progression state machine.
//!
//! One explicit state object holds the phase machine, score, cash, bonus
//! meter, deck, and artifact levels. It is passed by reference to the
//! handful of transition methods below -- there is no ambient singleton.
//!
//! Effects that would re-enter a state update (the jackpot burst triggered
//! by the bonus meter filling *inside* `collect`) are never invoked
//! synchronously: they are pushed onto a pending-effects queue that the
//! caller drains with [`Economy::take_effects`] immediately after the
//! transition returns. That guarantees the effect runs exactly once and
//! outside the mutation that produced it.
//!
//! All temporal logic (the bonus-decay grace window) is driven by
//! accumulated simulated seconds, never wall clock, so time-scaling the
//! simulation scales decay proportionally.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::coin::CoinKind;

// ---------------------------------------------------------------------------
// Tuning constants
// ---------------------------------------------------------------------------

/// Cash at the start of a run.
pub const STARTING_CASH: u64 = 100;
/// Score target for the first round.
pub const STARTING_TARGET: u64 = 500;
/// Copper coins in the starting deck.
pub const STARTING_DECK_COPPER: u32 = 10;
/// Bonus meter gain per collected coin (25 coins fill the meter).
pub const BONUS_PER_COIN: f32 = 4.0;
/// Meter capacity; reaching it is edge-triggered, never a steady state.
pub const BONUS_MAX: f32 = 100.0;
/// Simulated seconds without a collection before the meter starts draining.
pub const BONUS_GRACE_SECS: f32 = 2.0;
/// Meter drain rate in bonus units per simulated second.
pub const BONUS_DECAY_PER_SEC: f32 = 10.0;
/// Coins added to the deck per purchased pack.
pub const PACK_SIZE: u32 = 5;
/// Score-target growth per round.
pub const TARGET_GROWTH: f64 = 1.5;
/// Artifact cost growth per owned level.
pub const ARTIFACT_COST_GROWTH: f64 = 1.5;
/// Upper bound on jackpot burst size.
pub const JACKPOT_CAP: u32 = 12;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The strict game phase machine:
/// `Menu -> Playing -> {Shop, GameOver}`, `Shop -> Playing`, and `GameOver`
/// is terminal until an explicit restart back to the menu snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Before the first round.
    Menu,
    /// A round is running.
    Playing,
    /// Between rounds; purchases happen here.
    Shop,
    /// Target missed; terminal until restart.
    GameOver,
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

/// The fixed upgrade catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactId {
    /// Widens the pusher bed (read by the physics collaborator; also feeds
    /// jackpot sizing).
    BedWidth,
    /// Increases settling damping (read by the physics collaborator).
    Damping,
    /// Multiplies collection score by 1.5 per level.
    Multiplier,
}

impl ArtifactId {
    /// Every artifact in the catalog.
    pub const ALL: [ArtifactId; 3] = [
        ArtifactId::BedWidth,
        ArtifactId::Damping,
        ArtifactId::Multiplier,
    ];

    /// Cost of the first level.
    pub fn base_cost(self) -> u64 {
        match self {
            ArtifactId::BedWidth => 50,
            ArtifactId::Damping => 40,
            ArtifactId::Multiplier => 60,
        }
    }
}

// ---------------------------------------------------------------------------
// Pending effects
// ---------------------------------------------------------------------------

/// An effect produced inside a state update, deferred to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingEffect {
    /// Spawn a burst of bonus coins above the bed.
    JackpotBurst {
        /// Number of coins to spawn.
        count: u32,
    },
}

// ---------------------------------------------------------------------------
// EconomyView
// ---------------------------------------------------------------------------

/// Read-only snapshot handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyView {
    /// Current phase.
    pub phase: Phase,
    /// Score this round.
    pub score: u64,
    /// Target to beat this round.
    pub target_score: u64,
    /// Spendable cash.
    pub cash: u64,
    /// Round counter, starting at 1.
    pub ante: u32,
    /// Bonus meter, 0..=100.
    pub bonus: f32,
    /// Bonus level, starting at 1.
    pub bonus_level: u32,
}

// ---------------------------------------------------------------------------
// Economy
// ---------------------------------------------------------------------------

/// The economy/progression state machine.
#[derive(Debug)]
pub struct Economy {
    phase: Phase,
    score: u64,
    target_score: u64,
    cash: u64,
    ante: u32,
    bonus: f32,
    bonus_level: u32,
    deck: HashMap<CoinKind, u32>,
    artifacts: HashMap<ArtifactId, u32>,
    pending: Vec<PendingEffect>,
    /// Simulated seconds since the last collection.
    since_last_collect: f32,
}

impl Economy {
    /// A fresh run at the menu.
    pub fn new() -> Self {
        let mut deck = HashMap::new();
        deck.insert(CoinKind::Copper, STARTING_DECK_COPPER);
        Self {
            phase: Phase::Menu,
            score: 0,
            target_score: STARTING_TARGET,
            cash: STARTING_CASH,
            ante: 1,
            bonus: 0.0,
            bonus_level: 1,
            deck,
            artifacts: HashMap::new(),
            pending: Vec::new(),
            since_last_collect: 0.0,
        }
    }

    // -- phase transitions ---------------------------------------------------

    /// `Menu -> Playing`.
    pub fn start(&mut self) -> bool {
        self.transition(Phase::Menu, Phase::Playing)
    }

    /// End the round: `Playing -> Shop` if the target was met (score and
    /// bonus state reset), `Playing -> GameOver` otherwise.
    pub fn end_round(&mut self) -> bool {
        if self.phase != Phase::Playing {
            warn!(phase = ?self.phase, "end_round ignored outside Playing");
            return false;
        }
        if self.score >= self.target_score {
            info!(score = self.score, target = self.target_score, "round cleared");
            self.phase = Phase::Shop;
            self.score = 0;
            self.bonus = 0.0;
            self.bonus_level = 1;
        } else {
            info!(score = self.score, target = self.target_score, "round lost");
            self.phase = Phase::GameOver;
        }
        true
    }

    /// `Shop -> Playing`: raise the ante and scale the target.
    pub fn next_round(&mut self) -> bool {
        if self.phase != Phase::Shop {
            warn!(phase = ?self.phase, "next_round ignored outside Shop");
            return false;
        }
        self.ante += 1;
        self.target_score = (self.target_score as f64 * TARGET_GROWTH).floor() as u64;
        self.phase = Phase::Playing;
        info!(ante = self.ante, target = self.target_score, "next round");
        true
    }

    /// Back to the initial menu snapshot from any phase.
    pub fn restart(&mut self) {
        info!("restarting run");
        *self = Self::new();
    }

    // -- collection ----------------------------------------------------------

    /// A coin reached the drop sensor.
    ///
    /// Credits cash and score, advances the bonus meter, and -- when the
    /// meter fills -- resets it, levels up, and defers a jackpot burst to
    /// the pending-effects queue.
    pub fn collect(&mut self, kind: CoinKind) {
        if self.phase != Phase::Playing {
            debug!(?kind, phase = ?self.phase, "collection outside Playing ignored");
            return;
        }
        self.cash += kind.value();
        self.score += self.scored_value(kind);
        self.since_last_collect = 0.0;

        self.bonus += BONUS_PER_COIN;
        if self.bonus >= BONUS_MAX {
            // Edge-triggered: reset and level up in the same transition.
            self.bonus = 0.0;
            self.bonus_level += 1;
            let count = self.jackpot_size();
            info!(level = self.bonus_level, count, "bonus meter filled, jackpot queued");
            self.pending.push(PendingEffect::JackpotBurst { count });
        }
    }

    /// Score credited for one collected coin of `kind`, after multipliers.
    pub fn scored_value(&self, kind: CoinKind) -> u64 {
        let mult = ARTIFACT_COST_GROWTH.powi(self.artifact_level(ArtifactId::Multiplier) as i32);
        let bonus_mult = 1.0 + 0.1 * (self.bonus_level as f64 - 1.0);
        (kind.score_base() as f64 * mult * bonus_mult).floor() as u64
    }

    /// Advance simulated time: after the grace window with no collection,
    /// the bonus meter drains linearly, clamped at zero.
    pub fn advance(&mut self, dt: f32) {
        if self.phase != Phase::Playing {
            return;
        }
        self.since_last_collect += dt;
        if self.since_last_collect > BONUS_GRACE_SECS && self.bonus > 0.0 {
            self.bonus = (self.bonus - BONUS_DECAY_PER_SEC * dt).max(0.0);
        }
    }

    /// Drain effects queued by the last state updates. Call immediately
    /// after the transition that produced them.
    pub fn take_effects(&mut self) -> Vec<PendingEffect> {
        std::mem::take(&mut self.pending)
    }

    // -- purchases & deck ----------------------------------------------------

    /// Buy one pack of `kind`. Rejected (no mutation) when the kind is not
    /// purchasable, funds are short, or the phase disallows shopping.
    pub fn buy_coins(&mut self, kind: CoinKind) -> bool {
        if !matches!(self.phase, Phase::Playing | Phase::Shop) {
            return false;
        }
        let Some(cost) = kind.pack_cost() else {
            debug!(?kind, "kind is not purchasable");
            return false;
        };
        if self.cash < cost {
            debug!(?kind, cost, cash = self.cash, "insufficient funds for pack");
            return false;
        }
        self.cash -= cost;
        *self.deck.entry(kind).or_insert(0) += PACK_SIZE;
        true
    }

    /// Buy (or level up) an artifact at `floor(base * 1.5^level)`.
    pub fn buy_artifact(&mut self, id: ArtifactId) -> bool {
        if !matches!(self.phase, Phase::Playing | Phase::Shop) {
            return false;
        }
        let cost = self.artifact_cost(id);
        if self.cash < cost {
            debug!(?id, cost, cash = self.cash, "insufficient funds for artifact");
            return false;
        }
        self.cash -= cost;
        let level = self.artifacts.entry(id).or_insert(0);
        *level += 1;
        info!(?id, level = *level, "artifact purchased");
        true
    }

    /// Current price of the next level of `id`.
    pub fn artifact_cost(&self, id: ArtifactId) -> u64 {
        let level = self.artifact_level(id);
        (id.base_cost() as f64 * ARTIFACT_COST_GROWTH.powi(level as i32)).floor() as u64
    }

    /// Owned level of `id` (0 = not owned).
    pub fn artifact_level(&self, id: ArtifactId) -> u32 {
        self.artifacts.get(&id).copied().unwrap_or(0)
    }

    /// Take one coin of `kind` out of the deck for dropping.
    pub fn take_deck_coin(&mut self, kind: CoinKind) -> bool {
        if self.phase != Phase::Playing {
            return false;
        }
        match self.deck.get_mut(&kind) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Unspent coins of `kind`.
    pub fn deck_count(&self, kind: CoinKind) -> u32 {
        self.deck.get(&kind).copied().unwrap_or(0)
    }

    // -- accessors -----------------------------------------------------------

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Score this round.
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Spendable cash.
    pub fn cash(&self) -> u64 {
        self.cash
    }

    /// Bonus meter value, always within `[0, 100]`.
    pub fn bonus(&self) -> f32 {
        self.bonus
    }

    /// Bonus level, starting at 1.
    pub fn bonus_level(&self) -> u32 {
        self.bonus_level
    }

    /// Round counter.
    pub fn ante(&self) -> u32 {
        self.ante
    }

    /// Current round target.
    pub fn target_score(&self) -> u64 {
        self.target_score
    }

    /// UI snapshot.
    pub fn view(&self) -> EconomyView {
        EconomyView {
            phase: self.phase,
            score: self.score,
            target_score: self.target_score,
            cash: self.cash,
            ante: self.ante,
            bonus: self.bonus,
            bonus_level: self.bonus_level,
        }
    }

    // -- internal helpers ----------------------------------------------------

    /// Burst size scales with bonus level and bed-width upgrades, capped.
    fn jackpot_size(&self) -> u32 {
        (2 + self.bonus_level + self.artifact_level(ArtifactId::BedWidth)).min(JACKPOT_CAP)
    }

    fn transition(&mut self, from: Phase, to: Phase) -> bool {
        if self.phase != from {
            warn!(phase = ?self.phase, ?from, ?to, "transition ignored");
            return false;
        }
        self.phase = to;
        true
    }
}

impl Default for Economy {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
