//! Procedural cave graphs: chambers linked by radiating tunnels.
//!
//! Each system has one main chamber below the surface and 2 to 5 tunnels
//! leaving it at evenly spaced headings. Tunnels random-walk their heading a
//! little per step and end in a secondary chamber half the time.

use std::f64::consts::TAU;
use std::hash::{Hash, Hasher};

use glam::DVec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::height_field::HeightField;
use crate::seed::{det_cos, det_sin, hash_f64s};

use super::HydrologyParams;

/// Upper bound on systems per tile regardless of density.
const MAX_SYSTEMS_PER_TILE: usize = 16;
/// World units a tunnel advances per step.
const TUNNEL_STEP: f64 = 6.0;
/// Largest per-step heading change, in radians.
const HEADING_JITTER: f64 = 0.3;

/// A roughly spherical cavity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Chamber {
    /// World-space centre.
    pub center: DVec3,
    /// Horizontal radius; also the containment radius.
    pub radius: f64,
    /// Floor-to-ceiling height.
    pub height: f64,
}

/// One point of a tunnel centreline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TunnelWaypoint {
    /// World-space position.
    pub position: DVec3,
    /// Tunnel radius at this point.
    pub radius: f64,
}

/// An ordered tunnel centreline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tunnel {
    /// Waypoints from the main chamber outward.
    pub waypoints: Vec<TunnelWaypoint>,
}

impl Tunnel {
    /// Whether `point` lies within the interpolated radius of any segment.
    pub fn contains(&self, point: DVec3) -> bool {
        if let [only] = self.waypoints.as_slice() {
            return only.position.distance(point) <= only.radius;
        }
        self.waypoints.windows(2).any(|w| {
            let (a, b) = (w[0], w[1]);
            let ab = b.position - a.position;
            let len_sq = ab.length_squared();
            let t = if len_sq > 0.0 {
                ((point - a.position).dot(ab) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let closest = a.position + ab * t;
            let radius = a.radius + (b.radius - a.radius) * t;
            closest.distance(point) <= radius
        })
    }
}

/// Chambers and the tunnels linking them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaveSystem {
    /// Main chamber first, then secondary chambers.
    pub chambers: Vec<Chamber>,
    /// Tunnels radiating from the main chamber.
    pub tunnels: Vec<Tunnel>,
}

impl CaveSystem {
    /// Whether `point` lies inside any chamber or tunnel.
    pub fn contains(&self, point: DVec3) -> bool {
        self.chambers
            .iter()
            .any(|c| c.center.distance(point) <= c.radius)
            || self.tunnels.iter().any(|t| t.contains(point))
    }
}

impl Hash for CaveSystem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chambers.len().hash(state);
        for c in &self.chambers {
            hash_f64s(&[c.center.x, c.center.y, c.center.z, c.radius, c.height], state);
        }
        self.tunnels.len().hash(state);
        for t in &self.tunnels {
            t.waypoints.len().hash(state);
            for w in &t.waypoints {
                hash_f64s(&[w.position.x, w.position.y, w.position.z, w.radius], state);
            }
        }
    }
}

/// Number of systems for a tile: expected count from volume and density,
/// with the fractional part resolved by one random draw.
fn system_count(field: &HeightField, params: &HydrologyParams, rng: &mut ChaCha8Rng) -> usize {
    let size = field.tile_size();
    let expected = size * size * params.cave_depth * params.cave_density;
    if !expected.is_finite() || expected <= 0.0 {
        return 0;
    }
    let whole = expected.floor();
    let extra = usize::from(rng.random::<f64>() < expected - whole);
    (whole as usize + extra).min(MAX_SYSTEMS_PER_TILE)
}

/// Generate the cave systems under a tile.
pub fn generate_caves(
    field: &HeightField,
    params: &HydrologyParams,
    rng: &mut ChaCha8Rng,
) -> Vec<CaveSystem> {
    let count = system_count(field, params, rng);
    let last = field.resolution() - 1;
    let depth = params.cave_depth.max(12.0);

    (0..count)
        .map(|_| {
            let x = rng.random_range(0..=last);
            let z = rng.random_range(0..=last);
            let (wx, wz) = field.world_position(x, z);
            let y = field.get(x, z) - rng.random_range(10.0..depth);
            let main = Chamber {
                center: DVec3::new(wx, y, wz),
                radius: rng.random_range(6.0..14.0),
                height: rng.random_range(4.0..10.0),
            };

            let mut chambers = vec![main];
            let tunnel_count = rng.random_range(2..=5_usize);
            let offset = rng.random_range(0.0..TAU);
            let mut tunnels = Vec::with_capacity(tunnel_count);

            for i in 0..tunnel_count {
                let mut heading = offset + TAU * i as f64 / tunnel_count as f64;
                let mut position = main.center;
                let mut waypoints = Vec::with_capacity(params.tunnel_steps + 1);
                waypoints.push(TunnelWaypoint {
                    position,
                    radius: rng.random_range(2.0..3.5),
                });
                for _ in 0..params.tunnel_steps {
                    heading += rng.random_range(-HEADING_JITTER..=HEADING_JITTER);
                    let climb = rng.random_range(-1.5..=1.5);
                    position += DVec3::new(
                        det_cos(heading) * TUNNEL_STEP,
                        climb,
                        det_sin(heading) * TUNNEL_STEP,
                    );
                    waypoints.push(TunnelWaypoint {
                        position,
                        radius: rng.random_range(1.5..3.0),
                    });
                }
                if rng.random_bool(0.5) {
                    chambers.push(Chamber {
                        center: position,
                        radius: rng.random_range(4.0..8.0),
                        height: rng.random_range(3.0..6.0),
                    });
                }
                tunnels.push(Tunnel { waypoints });
            }

            CaveSystem { chambers, tunnels }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::TileCoordinate;
    use rand::SeedableRng;

    fn field() -> HeightField {
        HeightField::flat(TileCoordinate::new(0, 0), 65, 4.0, 0.0, 30.0)
    }

    fn dense() -> HydrologyParams {
        HydrologyParams {
            cave_density: 2.0e-6,
            ..Default::default()
        }
    }

    #[test]
    fn test_system_shape() {
        let caves = generate_caves(&field(), &dense(), &mut ChaCha8Rng::seed_from_u64(8));
        assert!(!caves.is_empty());
        for cave in &caves {
            assert!((2..=5).contains(&cave.tunnels.len()));
            assert!(cave.chambers.len() >= 1 && cave.chambers.len() <= 1 + cave.tunnels.len());
            for t in &cave.tunnels {
                assert_eq!(t.waypoints.len(), 13);
                assert_eq!(t.waypoints[0].position, cave.chambers[0].center);
            }
            assert!(cave.chambers[0].center.y < 30.0, "Main chamber lies underground");
        }
    }

    #[test]
    fn test_count_scales_with_density() {
        let none = HydrologyParams {
            cave_density: 0.0,
            ..Default::default()
        };
        assert!(generate_caves(&field(), &none, &mut ChaCha8Rng::seed_from_u64(1)).is_empty());
        // 256² * 64 * 2e-6 ≈ 8.4 systems
        let caves = generate_caves(&field(), &dense(), &mut ChaCha8Rng::seed_from_u64(1));
        assert!((8..=9).contains(&caves.len()), "Got {} systems", caves.len());
    }

    #[test]
    fn test_containment() {
        let cave = CaveSystem {
            chambers: vec![Chamber {
                center: DVec3::ZERO,
                radius: 5.0,
                height: 4.0,
            }],
            tunnels: vec![Tunnel {
                waypoints: vec![
                    TunnelWaypoint {
                        position: DVec3::ZERO,
                        radius: 2.0,
                    },
                    TunnelWaypoint {
                        position: DVec3::new(20.0, 0.0, 0.0),
                        radius: 1.0,
                    },
                ],
            }],
        };
        assert!(cave.contains(DVec3::new(0.0, 4.0, 0.0)), "Inside chamber");
        assert!(cave.contains(DVec3::new(10.0, 1.4, 0.0)), "Inside tunnel mid-radius 1.5");
        assert!(!cave.contains(DVec3::new(10.0, 1.6, 0.0)), "Just outside tunnel");
        assert!(cave.contains(DVec3::new(20.0, 0.9, 0.0)), "Tunnel end");
        assert!(!cave.contains(DVec3::new(40.0, 0.0, 0.0)));
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = generate_caves(&field(), &dense(), &mut ChaCha8Rng::seed_from_u64(42));
        let b = generate_caves(&field(), &dense(), &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
