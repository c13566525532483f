//! Feature and point-of-interest spawning.
//!
//! Three layers share one spacing rule: two features must be at least the
//! larger of their exclusion radii apart (the regular minimum distance, or
//! the special/unique radius). Specials and the unique feature are placed
//! first so that regular features keep clear of them.

use std::f64::consts::TAU;
use std::hash::{Hash, Hasher};

use glam::{DVec2, DVec3};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::biome::Biome;
use crate::coords::TileCoordinate;
use crate::height_field::HeightField;
use crate::metabolism::MetabolismSnapshot;
use crate::seed::{Salt, hash_f64s, lattice_hash, world_noise_seed};

use super::{PlacementParams, Provenance, RarityTier, WaterMask};

/// Kinds of feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    StoneCircle,
    AncientRuins,
    Shrine,
    Bridge,
    HealingSpring,
    HarmonyGarden,
    CrystalFormation,
    CorruptionRift,
    ShadowMonolith,
    Campfire,
    Watchtower,
    Shipwreck,
    /// Special: appears only under extreme harmony.
    CelestialSpire,
    /// Special: appears only under extreme disharmony.
    VoidNexus,
    /// The ultra-rare unique feature; see [`FeaturePlacement::name`].
    Landmark,
}

/// How a feature's spawn chance responds to world health.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HarmonyResponse {
    /// Unaffected.
    Neutral,
    /// Scales with harmony.
    Benevolent,
    /// Grows as harmony falls and dissonance rises.
    Corruption,
}

impl HarmonyResponse {
    fn factor(self, metabolism: MetabolismSnapshot) -> f64 {
        match self {
            HarmonyResponse::Neutral => 1.0,
            HarmonyResponse::Benevolent => metabolism.harmony,
            HarmonyResponse::Corruption => {
                ((2.0 - metabolism.harmony) + metabolism.dissonance).max(0.0)
            }
        }
    }
}

/// Spawn rules for one regular feature kind.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureDef {
    pub kind: FeatureKind,
    /// Spawn chance per tile at neutral harmony.
    pub base_rate: f64,
    pub response: HarmonyResponse,
    /// Biomes the feature may appear in. Empty means every land biome.
    pub biomes: &'static [Biome],
    /// Allowed elevation relative to sea level, `(min, max)`.
    pub height_range: (f64, f64),
    /// Steepest slope (rise over run) accepted.
    pub max_slope: f64,
    /// Site must be a dry cell with water within two cells.
    pub needs_water: bool,
}

impl FeatureDef {
    /// Whether this feature may spawn in `biome`.
    pub fn allowed_in(&self, biome: Biome) -> bool {
        if self.biomes.is_empty() {
            biome != Biome::Ocean
        } else {
            self.biomes.contains(&biome)
        }
    }

    /// Spawn probability under the given biome and metabolism.
    pub fn spawn_probability(&self, biome: Biome, metabolism: MetabolismSnapshot) -> f64 {
        let biome_factor = match biome {
            Biome::Corrupted => 0.5,
            Biome::Ethereal => 1.5,
            _ => 1.0,
        };
        (self.base_rate * self.response.factor(metabolism) * biome_factor).clamp(0.0, 1.0)
    }

    fn rarity(&self) -> RarityTier {
        if self.base_rate >= 0.2 {
            RarityTier::Common
        } else if self.base_rate >= 0.1 {
            RarityTier::Uncommon
        } else {
            RarityTier::Rare
        }
    }
}

macro_rules! feature {
    ($kind:ident, $rate:expr, $resp:ident, [$($b:ident),*], $lo:expr, $hi:expr, $slope:expr, $water:expr) => {
        FeatureDef {
            kind: FeatureKind::$kind,
            base_rate: $rate,
            response: HarmonyResponse::$resp,
            biomes: &[$(Biome::$b),*],
            height_range: ($lo, $hi),
            max_slope: $slope,
            needs_water: $water,
        }
    };
}

/// Regular features, in spawn order.
pub static FEATURE_TABLE: &[FeatureDef] = &[
    feature!(Shipwreck, 0.2, Neutral, [Ocean], -60.0, -2.0, 1.0, false),
    feature!(Bridge, 0.25, Neutral, [], -1.0, 20.0, 0.5, true),
    feature!(Campfire, 0.3, Neutral, [Plains, Forest, Taiga, Tundra, Desert], 1.0, 40.0, 0.2, false),
    feature!(StoneCircle, 0.15, Neutral, [], 1.0, 60.0, 0.3, false),
    feature!(AncientRuins, 0.1, Neutral, [Plains, Desert, Forest, Mountain, Tundra], 1.0, 80.0, 0.4, false),
    feature!(Watchtower, 0.12, Neutral, [Plains, Mountain, Forest], 10.0, 150.0, 0.4, false),
    feature!(CrystalFormation, 0.15, Neutral, [Crystal, Mountain, Tundra], 5.0, 200.0, 0.8, false),
    feature!(Shrine, 0.12, Benevolent, [], 1.0, 80.0, 0.3, false),
    feature!(HealingSpring, 0.1, Benevolent, [Forest, Plains, Ethereal, Swamp, Taiga], 0.0, 40.0, 0.3, false),
    feature!(HarmonyGarden, 0.08, Benevolent, [Plains, Forest, Ethereal], 1.0, 40.0, 0.2, false),
    feature!(CorruptionRift, 0.1, Corruption, [], 0.0, 100.0, 0.6, false),
    feature!(ShadowMonolith, 0.06, Corruption, [Corrupted, Desert, Volcanic, Mountain], 1.0, 150.0, 0.5, false),
];

/// Names the unique feature is drawn from.
pub static UNIQUE_FEATURE_NAMES: &[&str] = &[
    "The Singing Obelisk",
    "Tree of First Light",
    "The Hollow Crown",
    "Stillwater Mirror",
    "The Last Lighthouse",
    "Heart of the Chorus",
    "The Sundered Gate",
    "Orrery of Ages",
];

/// Which layer a feature came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureTier {
    Regular,
    Special,
    Unique,
}

/// One placed feature.
#[derive(Clone, Debug, PartialEq)]
pub struct FeaturePlacement {
    /// World-space anchor on the terrain surface.
    pub position: DVec3,
    pub kind: FeatureKind,
    /// Yaw in radians.
    pub rotation: f64,
    pub scale: f64,
    pub tier: FeatureTier,
    /// Proper name, set only for the unique feature.
    pub name: Option<&'static str>,
    pub provenance: Provenance,
}

impl FeaturePlacement {
    /// Distance another feature must keep from this one.
    pub fn exclusion_radius(&self, params: &PlacementParams) -> f64 {
        tier_radius(self.tier, params)
    }

    /// Horizontal distance to another feature.
    pub fn distance_to(&self, other: &FeaturePlacement) -> f64 {
        DVec2::new(self.position.x, self.position.z)
            .distance(DVec2::new(other.position.x, other.position.z))
    }
}

impl Hash for FeaturePlacement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.tier.hash(state);
        self.name.hash(state);
        hash_f64s(
            &[
                self.position.x,
                self.position.y,
                self.position.z,
                self.rotation,
                self.scale,
            ],
            state,
        );
    }
}

fn tier_radius(tier: FeatureTier, params: &PlacementParams) -> f64 {
    match tier {
        FeatureTier::Regular => params.feature_min_distance,
        FeatureTier::Special => params.special_exclusion_radius,
        FeatureTier::Unique => params.unique_exclusion_radius,
    }
}

/// Site constraints checked for a candidate cell.
struct SiteRule {
    height_range: (f64, f64),
    max_slope: f64,
    needs_water: bool,
}

/// Places features for tiles of one world.
pub struct FeaturePlacer {
    unique_seed: u64,
    params: PlacementParams,
}

impl FeaturePlacer {
    pub fn new(world_seed: u64, params: PlacementParams) -> Self {
        Self {
            unique_seed: world_noise_seed(world_seed, Salt::Unique),
            params,
        }
    }

    pub fn params(&self) -> &PlacementParams {
        &self.params
    }

    /// The unique feature name a tile is destined for, if its coordinate
    /// hash passes the rarity gate.
    pub fn unique_for(&self, coord: TileCoordinate) -> Option<&'static str> {
        let h = lattice_hash(self.unique_seed, coord.x as i64, coord.z as i64);
        let roll = (h >> 11) as f64 / (1u64 << 53) as f64;
        if roll < self.params.unique_rarity {
            Some(UNIQUE_FEATURE_NAMES[(h % UNIQUE_FEATURE_NAMES.len() as u64) as usize])
        } else {
            None
        }
    }

    /// Place every feature layer for a tile.
    pub fn place(
        &self,
        field: &HeightField,
        biome: Biome,
        metabolism: MetabolismSnapshot,
        water: &WaterMask,
        rng: &mut ChaCha8Rng,
    ) -> Vec<FeaturePlacement> {
        let mut placed = Vec::new();
        self.place_special(field, biome, metabolism, rng, &mut placed);
        self.place_unique(field, biome, metabolism, rng, &mut placed);
        self.place_regular(field, biome, metabolism, water, rng, &mut placed);
        placed
    }

    /// Harmony-gated special feature: one draw against `special_probability`
    /// when harmony is at either extreme.
    fn place_special(
        &self,
        field: &HeightField,
        biome: Biome,
        metabolism: MetabolismSnapshot,
        rng: &mut ChaCha8Rng,
        placed: &mut Vec<FeaturePlacement>,
    ) {
        let kind = if metabolism.harmony >= self.params.celestial_harmony {
            FeatureKind::CelestialSpire
        } else if metabolism.harmony <= self.params.void_harmony {
            FeatureKind::VoidNexus
        } else {
            return;
        };
        if !rng.random_bool(self.params.special_probability.clamp(0.0, 1.0)) {
            return;
        }
        let rule = SiteRule {
            height_range: (0.0, f64::INFINITY),
            max_slope: 0.5,
            needs_water: false,
        };
        let found = self.find_site(
            field,
            None,
            &rule,
            FeatureTier::Special,
            self.params.attempts_per_feature,
            rng,
            placed,
        );
        match found {
            Some(position) => placed.push(FeaturePlacement {
                position,
                kind,
                rotation: rng.random_range(0.0..TAU),
                scale: 1.5,
                tier: FeatureTier::Special,
                name: None,
                provenance: Provenance {
                    source_biome: biome,
                    harmony_at_spawn: metabolism.harmony,
                    rarity: RarityTier::Special,
                },
            }),
            None => trace!(?kind, "No open site for special feature"),
        }
    }

    /// Coordinate-gated unique feature in an open area.
    fn place_unique(
        &self,
        field: &HeightField,
        biome: Biome,
        metabolism: MetabolismSnapshot,
        rng: &mut ChaCha8Rng,
        placed: &mut Vec<FeaturePlacement>,
    ) {
        let Some(name) = self.unique_for(field.coord()) else {
            return;
        };
        let rule = SiteRule {
            height_range: (0.0, f64::INFINITY),
            max_slope: 0.4,
            needs_water: false,
        };
        let found = self.find_site(
            field,
            None,
            &rule,
            FeatureTier::Unique,
            self.params.attempts_per_feature * 4,
            rng,
            placed,
        );
        match found {
            Some(position) => placed.push(FeaturePlacement {
                position,
                kind: FeatureKind::Landmark,
                rotation: rng.random_range(0.0..TAU),
                scale: 2.0,
                tier: FeatureTier::Unique,
                name: Some(name),
                provenance: Provenance {
                    source_biome: biome,
                    harmony_at_spawn: metabolism.harmony,
                    rarity: RarityTier::Unique,
                },
            }),
            None => trace!(name, "No open area for unique feature"),
        }
    }

    fn place_regular(
        &self,
        field: &HeightField,
        biome: Biome,
        metabolism: MetabolismSnapshot,
        water: &WaterMask,
        rng: &mut ChaCha8Rng,
        placed: &mut Vec<FeaturePlacement>,
    ) {
        let mut regular = 0;
        for def in FEATURE_TABLE.iter().filter(|d| d.allowed_in(biome)) {
            if regular >= self.params.max_features_per_tile {
                trace!(cap = self.params.max_features_per_tile, "Feature cap reached");
                break;
            }
            let p = def.spawn_probability(biome, metabolism);
            if rng.random::<f64>() >= p {
                continue;
            }
            let rule = SiteRule {
                height_range: def.height_range,
                max_slope: def.max_slope,
                needs_water: def.needs_water,
            };
            let found = self.find_site(
                field,
                Some(water),
                &rule,
                FeatureTier::Regular,
                self.params.attempts_per_feature,
                rng,
                placed,
            );
            let Some(position) = found else {
                trace!(kind = ?def.kind, "Attempts exhausted, skipping feature");
                continue;
            };
            placed.push(FeaturePlacement {
                position,
                kind: def.kind,
                rotation: rng.random_range(0.0..TAU),
                scale: rng.random_range(0.8..1.2),
                tier: FeatureTier::Regular,
                name: None,
                provenance: Provenance {
                    source_biome: biome,
                    harmony_at_spawn: metabolism.harmony,
                    rarity: def.rarity(),
                },
            });
            regular += 1;
        }
    }

    /// Try up to `attempts` random interior cells against `rule` and the
    /// spacing rule; return the first valid world position.
    #[allow(clippy::too_many_arguments)]
    fn find_site(
        &self,
        field: &HeightField,
        water: Option<&WaterMask>,
        rule: &SiteRule,
        tier: FeatureTier,
        attempts: usize,
        rng: &mut ChaCha8Rng,
        placed: &[FeaturePlacement],
    ) -> Option<DVec3> {
        let last = field.resolution() - 1;
        let own_radius = tier_radius(tier, &self.params);

        for _ in 0..attempts {
            let x = rng.random_range(1..last);
            let z = rng.random_range(1..last);
            let elevation = field.get(x, z) - field.sea_level();
            if elevation < rule.height_range.0 || elevation > rule.height_range.1 {
                continue;
            }
            if field.slope_at(x, z) > rule.max_slope {
                continue;
            }
            if rule.needs_water && !water.is_some_and(|w| !w.is_wet(x, z) && w.near(x, z, 2)) {
                continue;
            }
            let (wx, wz) = field.world_position(x, z);
            let site = DVec2::new(wx, wz);
            let clear = placed.iter().all(|p| {
                let required = own_radius.max(p.exclusion_radius(&self.params));
                site.distance(DVec2::new(p.position.x, p.position.z)) >= required
            });
            if clear {
                return Some(DVec3::new(wx, field.get(x, z), wz));
            }
        }
        None
    }
}
