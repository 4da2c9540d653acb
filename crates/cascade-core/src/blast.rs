//! Radial blast impulse resolution.
//!
//! A pure function of the detonation center, the blast parameters, and the
//! positions of nearby bodies. No hidden state: the caller queries the
//! physics collaborator for bodies within the radius and applies the
//! returned impulses.

use crate::coin::CoinId;

/// Default blast radius in meters.
pub const BLAST_RADIUS: f32 = 1.2;

/// Default impulse magnitude at the detonation center.
pub const BLAST_FORCE: f32 = 6.0;

/// Fixed upward bias added to the normalized direction's y component so the
/// blast lifts coins off the bed instead of only shoving them sideways.
pub const UPWARD_BIAS: f32 = 0.5;

/// Compute per-body impulses for a detonation.
///
/// For each body strictly inside `radius`: direction is the normalized
/// vector from `center` to the body with [`UPWARD_BIAS`] added to y, scaled
/// by `force * (1 - d/radius)` -- linear falloff reaching exactly zero at
/// the boundary. A body sitting exactly on the center is kicked straight up.
pub fn radial_impulses(
    center: [f32; 3],
    radius: f32,
    force: f32,
    bodies: &[(CoinId, [f32; 3])],
) -> Vec<(CoinId, [f32; 3])> {
    let mut impulses = Vec::new();
    for &(id, pos) in bodies {
        let delta = [pos[0] - center[0], pos[1] - center[1], pos[2] - center[2]];
        let dist = (delta[0] * delta[0] + delta[1] * delta[1] + delta[2] * delta[2]).sqrt();
        if dist >= radius {
            continue;
        }
        let mut dir = if dist == 0.0 {
            [0.0, 1.0, 0.0]
        } else {
            [delta[0] / dist, delta[1] / dist, delta[2] / dist]
        };
        dir[1] += UPWARD_BIAS;
        let scale = force * (1.0 - dist / radius);
        impulses.push((id, [dir[0] * scale, dir[1] * scale, dir[2] * scale]));
    }
    impulses
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn magnitude(v: [f32; 3]) -> f32 {
        (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
    }

    fn id(raw: u64) -> CoinId {
        CoinId::from_raw(raw)
    }

    // -- 1. Falloff -----------------------------------------------------------

    #[test]
    fn impulse_strictly_decreases_with_distance() {
        let center = [0.0; 3];
        let bodies = vec![
            (id(1), [0.2, 0.0, 0.0]),
            (id(2), [0.5, 0.0, 0.0]),
            (id(3), [0.9, 0.0, 0.0]),
        ];
        let impulses = radial_impulses(center, BLAST_RADIUS, BLAST_FORCE, &bodies);
        assert_eq!(impulses.len(), 3);
        let mags: Vec<f32> = impulses.iter().map(|&(_, v)| magnitude(v)).collect();
        assert!(mags[0] > mags[1] && mags[1] > mags[2]);
    }

    #[test]
    fn zero_outside_and_at_the_boundary() {
        let center = [0.0; 3];
        let bodies = vec![
            (id(1), [BLAST_RADIUS, 0.0, 0.0]),
            (id(2), [BLAST_RADIUS + 1.0, 0.0, 0.0]),
        ];
        let impulses = radial_impulses(center, BLAST_RADIUS, BLAST_FORCE, &bodies);
        assert!(impulses.is_empty());
    }

    // -- 2. Center guard ------------------------------------------------------

    #[test]
    fn body_at_center_is_kicked_straight_up() {
        let impulses = radial_impulses([1.0, 0.0, 1.0], BLAST_RADIUS, BLAST_FORCE, &[(
            id(7),
            [1.0, 0.0, 1.0],
        )]);
        assert_eq!(impulses.len(), 1);
        let (_, v) = impulses[0];
        assert_eq!(v[0], 0.0);
        assert_eq!(v[2], 0.0);
        assert!(v[1] > 0.0);
    }

    // -- 3. Upward bias --------------------------------------------------------

    #[test]
    fn blast_lifts_even_level_bodies() {
        let impulses =
            radial_impulses([0.0; 3], BLAST_RADIUS, BLAST_FORCE, &[(id(1), [0.6, 0.0, 0.0])]);
        let (_, v) = impulses[0];
        assert!(v[1] > 0.0, "level body should still be lifted");
        assert!(v[0] > 0.0, "and pushed outward");
    }

    // -- 4. Pure function ------------------------------------------------------

    #[test]
    fn identical_inputs_identical_outputs() {
        let bodies = vec![(id(1), [0.3, 0.1, -0.2]), (id(2), [-0.4, 0.0, 0.5])];
        let a = radial_impulses([0.0; 3], BLAST_RADIUS, BLAST_FORCE, &bodies);
        let b = radial_impulses([0.0; 3], BLAST_RADIUS, BLAST_FORCE, &bodies);
        assert_eq!(a, b);
    }
}
