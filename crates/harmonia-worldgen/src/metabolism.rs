//! World metabolism: the global harmony/dissonance state that biases generation.
//!
//! [`WorldMetabolism`] is long-lived and owned by the simulation loop. Only
//! its `tick` and `apply_event` mutate it, so callers must serialize those.
//! Tile generation never sees it directly; it receives a
//! [`MetabolismSnapshot`] by value.

use std::hash::{Hash, Hasher};

use glam::DVec2;
use hashbrown::HashMap;

use crate::coords::TileCoordinate;
use crate::error::{WorldgenError, ensure_finite};

/// Lower bound of harmony.
pub const HARMONY_MIN: f64 = 0.1;
/// Upper bound of harmony.
pub const HARMONY_MAX: f64 = 2.0;
/// Lower bound of dissonance.
pub const DISSONANCE_MIN: f64 = 0.0;
/// Upper bound of dissonance.
pub const DISSONANCE_MAX: f64 = 2.0;

const HARMONY_SURGE: f64 = 1.8;
const DISSONANCE_SURGE: f64 = 1.5;
const INSTABILITY: f64 = 0.3;

/// Immutable harmony/dissonance values handed to the pipeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetabolismSnapshot {
    /// Harmony in `[0.1, 2.0]`.
    pub harmony: f64,
    /// Dissonance in `[0.0, 2.0]`.
    pub dissonance: f64,
}

impl MetabolismSnapshot {
    /// Build a snapshot, clamping both values into range.
    ///
    /// Non-finite inputs fall back to the neutral values.
    pub fn new(harmony: f64, dissonance: f64) -> Self {
        let harmony = if harmony.is_finite() { harmony } else { 1.0 };
        let dissonance = if dissonance.is_finite() { dissonance } else { 0.0 };
        Self {
            harmony: harmony.clamp(HARMONY_MIN, HARMONY_MAX),
            dissonance: dissonance.clamp(DISSONANCE_MIN, DISSONANCE_MAX),
        }
    }

    /// `harmony / (1 + dissonance)`.
    pub fn energy_flow(&self) -> f64 {
        self.harmony / (1.0 + self.dissonance)
    }

    /// `max(0.1, 1 - imbalance * 0.5)` with `imbalance = |harmony - 1| + dissonance`.
    pub fn stability_index(&self) -> f64 {
        let imbalance = (self.harmony - 1.0).abs() + self.dissonance;
        (1.0 - imbalance * 0.5).max(0.1)
    }

    /// Triggers whose thresholds these values currently exceed.
    pub fn triggers(&self) -> Vec<MetabolismTrigger> {
        MetabolismTrigger::ALL
            .into_iter()
            .filter(|t| t.is_active(self))
            .collect()
    }
}

impl Default for MetabolismSnapshot {
    fn default() -> Self {
        Self {
            harmony: 1.0,
            dissonance: 0.0,
        }
    }
}

impl Hash for MetabolismSnapshot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.harmony.to_bits().hash(state);
        self.dissonance.to_bits().hash(state);
    }
}

/// A threshold crossing an external collaborator may turn into a narrative event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetabolismTrigger {
    /// Harmony above 1.8.
    HarmonySurge,
    /// Dissonance above 1.5.
    DissonanceSurge,
    /// Stability index below 0.3.
    Instability,
}

impl MetabolismTrigger {
    /// Every trigger kind.
    pub const ALL: [MetabolismTrigger; 3] = [
        MetabolismTrigger::HarmonySurge,
        MetabolismTrigger::DissonanceSurge,
        MetabolismTrigger::Instability,
    ];

    fn is_active(self, s: &MetabolismSnapshot) -> bool {
        match self {
            MetabolismTrigger::HarmonySurge => s.harmony > HARMONY_SURGE,
            MetabolismTrigger::DissonanceSurge => s.dissonance > DISSONANCE_SURGE,
            MetabolismTrigger::Instability => s.stability_index() < INSTABILITY,
        }
    }
}

/// Rates of the metabolism model.
#[derive(Clone, Debug, PartialEq)]
pub struct MetabolismParams {
    /// Harmony at start-up.
    pub initial_harmony: f64,
    /// Dissonance at start-up.
    pub initial_dissonance: f64,
    /// Fraction of the distance to 1.0 harmony recovers per second.
    pub harmony_relax_rate: f64,
    /// Fraction of dissonance that decays per second.
    pub dissonance_decay_rate: f64,
    /// First-order filter rate of per-tile values, per second.
    pub grid_lag_rate: f64,
    /// Share of an event's delta applied to the global values.
    pub event_global_weight: f64,
    /// World-space edge length of a tile, for mapping events onto tiles.
    pub tile_size: f64,
    /// Largest accepted event radius in world units.
    pub max_event_radius: f64,
}

impl Default for MetabolismParams {
    fn default() -> Self {
        Self {
            initial_harmony: 1.0,
            initial_dissonance: 0.0,
            harmony_relax_rate: 0.01,
            dissonance_decay_rate: 0.02,
            grid_lag_rate: 0.1,
            event_global_weight: 0.2,
            tile_size: 256.0,
            max_event_radius: 4096.0,
        }
    }
}

/// Lagged per-tile copy of the global values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridMetabolism {
    /// Local harmony.
    pub harmony: f64,
    /// Local dissonance.
    pub dissonance: f64,
}

impl GridMetabolism {
    fn snapshot(&self) -> MetabolismSnapshot {
        MetabolismSnapshot::new(self.harmony, self.dissonance)
    }

    fn clamp(&mut self) {
        self.harmony = self.harmony.clamp(HARMONY_MIN, HARMONY_MAX);
        self.dissonance = self.dissonance.clamp(DISSONANCE_MIN, DISSONANCE_MAX);
    }
}

/// A localized harmony/dissonance change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetabolismEvent {
    /// World-space `(x, z)` centre.
    pub position: DVec2,
    /// Falloff radius in world units. Must be positive.
    pub radius: f64,
    /// Harmony change at the centre.
    pub harmony_delta: f64,
    /// Dissonance change at the centre.
    pub dissonance_delta: f64,
}

/// Global harmony/dissonance state plus lazily created per-tile grids.
#[derive(Clone, Debug)]
pub struct WorldMetabolism {
    harmony: f64,
    dissonance: f64,
    params: MetabolismParams,
    grids: HashMap<TileCoordinate, GridMetabolism>,
    reported: Vec<MetabolismTrigger>,
}

impl WorldMetabolism {
    /// Start from the configured initial values.
    ///
    /// # Errors
    ///
    /// [`WorldgenError::InvalidArgument`] if a rate is negative or non-finite,
    /// or the tile size is not positive.
    pub fn new(params: MetabolismParams) -> Result<Self, WorldgenError> {
        for (name, value) in [
            ("initial_harmony", params.initial_harmony),
            ("initial_dissonance", params.initial_dissonance),
            ("harmony_relax_rate", params.harmony_relax_rate),
            ("dissonance_decay_rate", params.dissonance_decay_rate),
            ("grid_lag_rate", params.grid_lag_rate),
            ("event_global_weight", params.event_global_weight),
            ("tile_size", params.tile_size),
            ("max_event_radius", params.max_event_radius),
        ] {
            ensure_finite(name, value)?;
            if value < 0.0 {
                return Err(WorldgenError::invalid(format!("{name} must not be negative")));
            }
        }
        if params.tile_size == 0.0 {
            return Err(WorldgenError::invalid("tile_size must be positive"));
        }

        let start = MetabolismSnapshot::new(params.initial_harmony, params.initial_dissonance);
        Ok(Self {
            harmony: start.harmony,
            dissonance: start.dissonance,
            params,
            grids: HashMap::new(),
            reported: start.triggers(),
        })
    }

    /// Current global values.
    pub fn snapshot(&self) -> MetabolismSnapshot {
        MetabolismSnapshot {
            harmony: self.harmony,
            dissonance: self.dissonance,
        }
    }

    /// Values for generating `coord`: the tile's grid if it has one, else global.
    pub fn snapshot_at(&self, coord: TileCoordinate) -> MetabolismSnapshot {
        self.grids
            .get(&coord)
            .map_or_else(|| self.snapshot(), GridMetabolism::snapshot)
    }

    /// Global harmony.
    pub fn harmony(&self) -> f64 {
        self.harmony
    }

    /// Global dissonance.
    pub fn dissonance(&self) -> f64 {
        self.dissonance
    }

    /// Global energy flow.
    pub fn energy_flow(&self) -> f64 {
        self.snapshot().energy_flow()
    }

    /// Global stability index.
    pub fn stability_index(&self) -> f64 {
        self.snapshot().stability_index()
    }

    /// The grid of `coord`, if it has been referenced.
    pub fn grid(&self, coord: TileCoordinate) -> Option<&GridMetabolism> {
        self.grids.get(&coord)
    }

    /// The grid of `coord`, created from the global values on first reference.
    pub fn grid_mut(&mut self, coord: TileCoordinate) -> &mut GridMetabolism {
        let (harmony, dissonance) = (self.harmony, self.dissonance);
        self.grids.entry(coord).or_insert(GridMetabolism {
            harmony,
            dissonance,
        })
    }

    /// Drop the grids of tiles for which `keep` returns false.
    ///
    /// Dropped tiles fall back to the global values until referenced again.
    pub fn retain_grids(&mut self, mut keep: impl FnMut(TileCoordinate) -> bool) -> usize {
        let before = self.grids.len();
        self.grids.retain(|coord, _| keep(*coord));
        before - self.grids.len()
    }

    /// Number of tiles with a grid.
    pub fn grid_count(&self) -> usize {
        self.grids.len()
    }

    /// Triggers whose thresholds the global values currently exceed.
    pub fn active_triggers(&self) -> Vec<MetabolismTrigger> {
        self.snapshot().triggers()
    }

    /// Advance the model by `dt` seconds.
    ///
    /// Harmony relaxes toward 1.0, dissonance decays toward 0.0 and every
    /// grid moves toward the new global values. Returns the triggers that
    /// became active since the previous tick.
    ///
    /// # Errors
    ///
    /// [`WorldgenError::InvalidArgument`] if `dt` is negative or non-finite;
    /// the state is left untouched.
    pub fn tick(&mut self, dt: f64) -> Result<Vec<MetabolismTrigger>, WorldgenError> {
        ensure_finite("dt", dt)?;
        if dt < 0.0 {
            return Err(WorldgenError::invalid(format!("dt must not be negative, got {dt}")));
        }

        self.harmony += (1.0 - self.harmony) * self.params.harmony_relax_rate * dt;
        self.dissonance -= self.dissonance * self.params.dissonance_decay_rate * dt;
        self.clamp();

        let alpha = (self.params.grid_lag_rate * dt).min(1.0);
        for grid in self.grids.values_mut() {
            grid.harmony += (self.harmony - grid.harmony) * alpha;
            grid.dissonance += (self.dissonance - grid.dissonance) * alpha;
            grid.clamp();
        }

        let active = self.active_triggers();
        let fired = active
            .iter()
            .copied()
            .filter(|t| !self.reported.contains(t))
            .collect();
        self.reported = active;
        Ok(fired)
    }

    /// Apply a localized change.
    ///
    /// Every tile whose centre lies within `radius` receives the deltas with
    /// linear falloff, creating its grid from the pre-event global values if
    /// needed. The global values then receive the deltas scaled by the event
    /// weight.
    ///
    /// # Errors
    ///
    /// [`WorldgenError::InvalidArgument`] for non-finite values, a
    /// non-positive radius or one above `max_event_radius`; the state is
    /// left untouched.
    pub fn apply_event(&mut self, event: &MetabolismEvent) -> Result<(), WorldgenError> {
        ensure_finite("position.x", event.position.x)?;
        ensure_finite("position.y", event.position.y)?;
        ensure_finite("radius", event.radius)?;
        ensure_finite("harmony_delta", event.harmony_delta)?;
        ensure_finite("dissonance_delta", event.dissonance_delta)?;
        if event.radius <= 0.0 {
            return Err(WorldgenError::invalid(format!(
                "event radius must be positive, got {}",
                event.radius
            )));
        }
        if event.radius > self.params.max_event_radius {
            return Err(WorldgenError::invalid(format!(
                "event radius {} exceeds the maximum of {}",
                event.radius, self.params.max_event_radius
            )));
        }

        let tile_size = self.params.tile_size;
        let min = TileCoordinate::containing(
            event.position.x - event.radius,
            event.position.y - event.radius,
            tile_size,
        );
        let max = TileCoordinate::containing(
            event.position.x + event.radius,
            event.position.y + event.radius,
            tile_size,
        );
        for z in min.z..=max.z {
            for x in min.x..=max.x {
                let coord = TileCoordinate::new(x, z);
                let (cx, cz) = coord.world_center(tile_size);
                let distance = event.position.distance(DVec2::new(cx, cz));
                if distance > event.radius {
                    continue;
                }
                let falloff = 1.0 - distance / event.radius;
                let grid = self.grid_mut(coord);
                grid.harmony += event.harmony_delta * falloff;
                grid.dissonance += event.dissonance_delta * falloff;
                grid.clamp();
            }
        }

        let weight = self.params.event_global_weight;
        self.harmony += event.harmony_delta * weight;
        self.dissonance += event.dissonance_delta * weight;
        self.clamp();
        Ok(())
    }

    fn clamp(&mut self) {
        self.harmony = self.harmony.clamp(HARMONY_MIN, HARMONY_MAX);
        self.dissonance = self.dissonance.clamp(DISSONANCE_MIN, DISSONANCE_MAX);
    }
}
