//! Tile debug visualization: 2D images of generated tiles.
//!
//! Provides [`DebugImage`] and renderers for the height field, the biome map
//! and an annotated overview (water, rivers, features). One pixel block per
//! height-field cell, row `z` drawn as image row `z`.

mod image;
mod renderers;

pub use self::image::DebugImage;
pub use renderers::{
    feature_color, height_to_color, render_biome_map, render_height_field, render_tile_overview,
};

use crate::biome::BiomeTable;
use crate::pipeline::TileBundle;

/// The images a tile can be exported as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DebugLayer {
    /// Elevation bands.
    Height,
    /// Primary biome colour shaded by elevation.
    Biome,
    /// Elevation with water, rivers and feature markers on top.
    Overview,
}

impl DebugLayer {
    pub const ALL: [DebugLayer; 3] = [DebugLayer::Height, DebugLayer::Biome, DebugLayer::Overview];

    /// Short lowercase name, used in exported file names.
    pub fn name(self) -> &'static str {
        match self {
            DebugLayer::Height => "height",
            DebugLayer::Biome => "biome",
            DebugLayer::Overview => "overview",
        }
    }

    /// Render this layer for a tile. `wet_threshold` is the hydrology
    /// wet-cell depth; `scale` is the pixel block size per cell.
    pub fn render(
        self,
        bundle: &TileBundle,
        biomes: &BiomeTable,
        wet_threshold: f64,
        scale: u32,
    ) -> DebugImage {
        match self {
            DebugLayer::Height => render_height_field(&bundle.height_field, scale),
            DebugLayer::Biome => render_biome_map(bundle, biomes, scale),
            DebugLayer::Overview => render_tile_overview(bundle, wet_threshold, scale),
        }
    }
}
