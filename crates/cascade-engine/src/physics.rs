//! rapier3d adapter: the physics collaborator behind the narrow interface
//! the core consumes.
//!
//! The [`PusherWorld`] owns the rapier simulation of the bed, walls, the
//! kinematic pusher, the collection-zone sensor, and one dynamic ball body
//! per coin. Identity is carried by a typed side-table from collider handle
//! to [`BodyTag`], attached at body-creation time -- identity is never
//! encoded in or parsed out of a name string.
//!
//! Each [`step`](PusherWorld::step) collects rapier's collision-started
//! events over a channel, maps them through the side-table, and returns
//! oriented [`Contact`]s (one per coin side of each pair, so the reducer's
//! tie-break sees both callbacks) plus the coins that entered the drop
//! sensor. Pairs are sorted by id before expansion so the contact stream is
//! deterministic regardless of channel delivery order.

use std::collections::HashMap;

use rapier3d::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::trace;

use cascade_core::coin::CoinId;
use cascade_core::reducer::{Contact, ContactBody};

// ---------------------------------------------------------------------------
// BedConfig
// ---------------------------------------------------------------------------

/// Geometry of the pusher bed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedConfig {
    /// Half-extent of the bed along x.
    pub half_width: f32,
    /// Half-extent of the bed along z. The drop edge is at `+half_depth`.
    pub half_depth: f32,
    /// Coin ball radius.
    pub coin_radius: f32,
    /// Pusher stroke speed along z, in m/s.
    pub pusher_speed: f32,
    /// Pusher stroke travel along z, in meters.
    pub pusher_travel: f32,
}

impl Default for BedConfig {
    fn default() -> Self {
        Self {
            half_width: 1.0,
            half_depth: 1.5,
            coin_radius: 0.12,
            pusher_speed: 0.4,
            pusher_travel: 0.5,
        }
    }
}

// ---------------------------------------------------------------------------
// BodyTag
// ---------------------------------------------------------------------------

/// What a collider belongs to. Attached at creation, looked up in O(1)
/// during collision handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyTag {
    Coin(CoinId),
    Pusher,
    Bed,
    Wall,
    DropSensor,
}

impl BodyTag {
    fn as_contact_body(self) -> Option<ContactBody> {
        match self {
            BodyTag::Coin(id) => Some(ContactBody::Coin(id)),
            BodyTag::Pusher => Some(ContactBody::Pusher),
            BodyTag::Bed => Some(ContactBody::Bed),
            BodyTag::Wall => Some(ContactBody::Wall),
            BodyTag::DropSensor => None,
        }
    }
}

/// Everything one physics step reported.
#[derive(Debug, Default)]
pub struct StepEvents {
    /// Oriented contact-begin notifications for the reducer.
    pub contacts: Vec<Contact>,
    /// Coins that entered the collection zone this step.
    pub collected: Vec<CoinId>,
}

// ---------------------------------------------------------------------------
// PusherWorld
// ---------------------------------------------------------------------------

/// Manages the rapier3d simulation and the handle side-tables.
pub struct PusherWorld {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    integration_params: IntegrationParameters,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    /// CoinId -> rapier body handle.
    coin_to_body: HashMap<CoinId, RigidBodyHandle>,
    /// Collider handle -> owner tag.
    collider_tags: HashMap<ColliderHandle, BodyTag>,
    pusher_body: RigidBodyHandle,
    /// Pusher stroke state: current z direction (+1 toward the drop edge).
    pusher_dir: f32,
    /// Pusher resting z (back of the bed).
    pusher_home_z: f32,
    config: BedConfig,
}

impl PusherWorld {
    /// Build the static scene: bed, three walls, the kinematic pusher, and
    /// the collection sensor past the drop edge.
    pub fn new(config: BedConfig) -> Self {
        let mut rigid_body_set = RigidBodySet::new();
        let mut collider_set = ColliderSet::new();
        let mut collider_tags = HashMap::new();

        let w = config.half_width;
        let d = config.half_depth;

        // Bed surface: top face at y = 0.
        let bed = rigid_body_set.insert(
            RigidBodyBuilder::fixed()
                .translation(vector![0.0, -0.1, 0.0])
                .build(),
        );
        let bed_col = collider_set.insert_with_parent(
            ColliderBuilder::cuboid(w, 0.1, d)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build(),
            bed,
            &mut rigid_body_set,
        );
        collider_tags.insert(bed_col, BodyTag::Bed);

        // Side walls and back wall.
        let walls = [
            (vector![-w - 0.05, 0.4, 0.0], (0.05, 0.5, d)),
            (vector![w + 0.05, 0.4, 0.0], (0.05, 0.5, d)),
            (vector![0.0, 0.4, -d - 0.05], (w, 0.5, 0.05)),
        ];
        for (pos, (hx, hy, hz)) in walls {
            let wall = rigid_body_set.insert(RigidBodyBuilder::fixed().translation(pos).build());
            let col = collider_set.insert_with_parent(
                ColliderBuilder::cuboid(hx, hy, hz)
                    .active_events(ActiveEvents::COLLISION_EVENTS)
                    .build(),
                wall,
                &mut rigid_body_set,
            );
            collider_tags.insert(col, BodyTag::Wall);
        }

        // Kinematic pusher at the back, stroking along +z.
        let pusher_home_z = -d + 0.2;
        let pusher_body = rigid_body_set.insert(
            RigidBodyBuilder::kinematic_velocity_based()
                .translation(vector![0.0, 0.15, pusher_home_z])
                .build(),
        );
        let pusher_col = collider_set.insert_with_parent(
            ColliderBuilder::cuboid(w, 0.15, 0.2)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build(),
            pusher_body,
            &mut rigid_body_set,
        );
        collider_tags.insert(pusher_col, BodyTag::Pusher);

        // Collection sensor: a volume past and below the drop edge.
        let sensor = rigid_body_set.insert(
            RigidBodyBuilder::fixed()
                .translation(vector![0.0, -0.6, d + 0.5])
                .build(),
        );
        let sensor_col = collider_set.insert_with_parent(
            ColliderBuilder::cuboid(w + 0.5, 0.4, 0.5)
                .sensor(true)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build(),
            sensor,
            &mut rigid_body_set,
        );
        collider_tags.insert(sensor_col, BodyTag::DropSensor);

        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, -9.81, 0.0],
            integration_params: IntegrationParameters::default(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set,
            collider_set,
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            coin_to_body: HashMap::new(),
            collider_tags,
            pusher_body,
            pusher_dir: 1.0,
            pusher_home_z,
            config,
        }
    }

    /// Register a coin as a dynamic ball body.
    ///
    /// `linear_damping` models how quickly the coin settles (raised by the
    /// damping upgrade). Registering an already-registered id is a no-op.
    pub fn register_coin(&mut self, id: CoinId, position: [f32; 3], linear_damping: f32) {
        if self.coin_to_body.contains_key(&id) {
            return;
        }
        let body = self.rigid_body_set.insert(
            RigidBodyBuilder::dynamic()
                .translation(vector![position[0], position[1], position[2]])
                .linear_damping(linear_damping)
                .build(),
        );
        let collider = self.collider_set.insert_with_parent(
            ColliderBuilder::ball(self.config.coin_radius)
                .restitution(0.2)
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build(),
            body,
            &mut self.rigid_body_set,
        );
        self.coin_to_body.insert(id, body);
        self.collider_tags.insert(collider, BodyTag::Coin(id));
    }

    /// Remove a coin's body and colliders. No-op for unknown ids.
    pub fn unregister_coin(&mut self, id: CoinId) {
        if let Some(body) = self.coin_to_body.remove(&id) {
            self.rigid_body_set.remove(
                body,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true, // remove attached colliders
            );
            self.collider_tags.retain(|_, tag| *tag != BodyTag::Coin(id));
        }
    }

    /// Advance the pusher stroke: constant speed along z, reversing at the
    /// ends of the travel range.
    pub fn advance_pusher(&mut self, _dt: f32) {
        if let Some(rb) = self.rigid_body_set.get_mut(self.pusher_body) {
            let z = rb.translation().z;
            if z >= self.pusher_home_z + self.config.pusher_travel {
                self.pusher_dir = -1.0;
            } else if z <= self.pusher_home_z {
                self.pusher_dir = 1.0;
            }
            let speed = self.config.pusher_speed * self.pusher_dir;
            rb.set_linvel(vector![0.0, 0.0, speed], true);
        }
    }

    /// Step the simulation, returning oriented contacts and sensor entries.
    pub fn step(&mut self, dt: f32) -> StepEvents {
        self.integration_params.dt = dt as Real;

        let (collision_send, collision_recv) =
            rapier3d::crossbeam::channel::unbounded::<CollisionEvent>();
        let (force_send, _force_recv) =
            rapier3d::crossbeam::channel::unbounded::<ContactForceEvent>();
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None, // query pipeline (queries go through the side-table scan)
            &(),  // physics hooks
            &event_handler,
        );

        // Collect collision-started pairs as tag pairs.
        let mut pairs: Vec<(BodyTag, BodyTag)> = Vec::new();
        while let Ok(event) = collision_recv.try_recv() {
            if let CollisionEvent::Started(h1, h2, _flags) = event {
                let tag_a = self.collider_tags.get(&h1).copied();
                let tag_b = self.collider_tags.get(&h2).copied();
                if let (Some(a), Some(b)) = (tag_a, tag_b) {
                    pairs.push((a, b));
                } else {
                    trace!("collision event for untagged collider dropped");
                }
            }
        }

        // Channel delivery order may vary; sort pairs for determinism.
        pairs.sort_by_key(|&(a, b)| (Self::tag_sort_key(a), Self::tag_sort_key(b)));

        let mut events = StepEvents::default();
        for (a, b) in pairs {
            // Sensor entries become collections, not contacts.
            if a == BodyTag::DropSensor || b == BodyTag::DropSensor {
                let other = if a == BodyTag::DropSensor { b } else { a };
                if let BodyTag::Coin(id) = other {
                    events.collected.push(id);
                }
                continue;
            }
            // Expand to one oriented contact per coin side.
            self.push_oriented(&mut events.contacts, a, b);
            self.push_oriented(&mut events.contacts, b, a);
        }
        events
    }

    /// Live coin positions within `radius` of `center`, sorted by id.
    pub fn query_nearby(&self, center: [f32; 3], radius: f32) -> Vec<(CoinId, [f32; 3])> {
        let mut hits: Vec<(CoinId, [f32; 3])> = Vec::new();
        for (&id, &body) in &self.coin_to_body {
            if let Some(rb) = self.rigid_body_set.get(body) {
                let t = rb.translation();
                let dx = t.x - center[0];
                let dy = t.y - center[1];
                let dz = t.z - center[2];
                if (dx * dx + dy * dy + dz * dz).sqrt() < radius {
                    hits.push((id, [t.x, t.y, t.z]));
                }
            }
        }
        hits.sort_by_key(|&(id, _)| id);
        hits
    }

    /// Apply an instantaneous impulse to a coin. No-op for unknown ids.
    pub fn apply_impulse(&mut self, id: CoinId, impulse: [f32; 3]) {
        if let Some(&body) = self.coin_to_body.get(&id) {
            if let Some(rb) = self.rigid_body_set.get_mut(body) {
                rb.apply_impulse(vector![impulse[0], impulse[1], impulse[2]], true);
            }
        }
    }

    /// Read back simulated coin transforms, sorted by id.
    pub fn read_positions(&self) -> Vec<(CoinId, [f32; 3], [f32; 3])> {
        let mut out: Vec<(CoinId, [f32; 3], [f32; 3])> = Vec::new();
        for (&id, &body) in &self.coin_to_body {
            if let Some(rb) = self.rigid_body_set.get(body) {
                let t = rb.translation();
                let (roll, pitch, yaw) = rb.rotation().euler_angles();
                out.push((id, [t.x, t.y, t.z], [roll, pitch, yaw]));
            }
        }
        out.sort_by_key(|&(id, _, _)| id);
        out
    }

    /// Whether a coin is registered.
    pub fn has_coin(&self, id: CoinId) -> bool {
        self.coin_to_body.contains_key(&id)
    }

    /// Number of registered coin bodies.
    pub fn coin_count(&self) -> usize {
        self.coin_to_body.len()
    }

    /// The bed geometry this world was built with.
    pub fn config(&self) -> &BedConfig {
        &self.config
    }

    // -- internal helpers ---------------------------------------------------

    fn push_oriented(&self, contacts: &mut Vec<Contact>, this: BodyTag, other: BodyTag) {
        let BodyTag::Coin(coin) = this else {
            return;
        };
        let Some(other_body) = other.as_contact_body() else {
            return;
        };
        let vel_self = self.tag_linvel(this);
        let vel_other = self.tag_linvel(other);
        let point = self
            .tag_translation(this)
            .zip(self.tag_translation(other))
            .map(|(a, b)| {
                // Midpoint approximation of the contact location.
                [
                    (a[0] + b[0]) * 0.5,
                    (a[1] + b[1]) * 0.5,
                    (a[2] + b[2]) * 0.5,
                ]
            });
        contacts.push(Contact {
            coin,
            other: other_body,
            relative_velocity: [
                vel_self[0] - vel_other[0],
                vel_self[1] - vel_other[1],
                vel_self[2] - vel_other[2],
            ],
            point,
        });
    }

    fn tag_body(&self, tag: BodyTag) -> Option<RigidBodyHandle> {
        match tag {
            BodyTag::Coin(id) => self.coin_to_body.get(&id).copied(),
            BodyTag::Pusher => Some(self.pusher_body),
            // Static scenery does not move; velocity and position lookups
            // fall back to zero / None below.
            BodyTag::Bed | BodyTag::Wall | BodyTag::DropSensor => None,
        }
    }

    fn tag_linvel(&self, tag: BodyTag) -> [f32; 3] {
        self.tag_body(tag)
            .and_then(|h| self.rigid_body_set.get(h))
            .map(|rb| {
                let v = rb.linvel();
                [v.x, v.y, v.z]
            })
            .unwrap_or([0.0; 3])
    }

    fn tag_translation(&self, tag: BodyTag) -> Option<[f32; 3]> {
        self.tag_body(tag)
            .and_then(|h| self.rigid_body_set.get(h))
            .map(|rb| {
                let t = rb.translation();
                [t.x, t.y, t.z]
            })
    }

    fn tag_sort_key(tag: BodyTag) -> (u8, u64) {
        match tag {
            BodyTag::Coin(id) => (0, id.to_raw()),
            BodyTag::Pusher => (1, 0),
            BodyTag::Bed => (2, 0),
            BodyTag::Wall => (3, 0),
            BodyTag::DropSensor => (4, 0),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
