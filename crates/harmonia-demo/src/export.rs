//! PNG export of tile debug images.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use harmonia_worldgen::debug_viz::{DebugImage, DebugLayer};
use harmonia_worldgen::{BiomeTable, TileBundle};
use tracing::info;

/// Pixel block size per height-field cell in exported images.
pub const EXPORT_SCALE: u32 = 4;

/// Encode an RGBA debug image as an 8-bit PNG file.
pub fn write_png(image: &DebugImage, path: &Path) -> Result<(), png::EncodingError> {
    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), image.width, image.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&image.pixels)?;
    Ok(())
}

/// File name for one layer of a tile, e.g. `tile_0_-1_biome.png`.
pub fn file_name(bundle: &TileBundle, layer: DebugLayer) -> String {
    format!("tile_{}_{}_{}.png", bundle.coord.x, bundle.coord.z, layer.name())
}

/// Write every debug layer of a tile into `dir`, creating it if needed.
pub fn export_tile(
    bundle: &TileBundle,
    biomes: &BiomeTable,
    wet_threshold: f64,
    dir: &Path,
) -> Result<Vec<PathBuf>, png::EncodingError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(DebugLayer::ALL.len());
    for layer in DebugLayer::ALL {
        let image = layer.render(bundle, biomes, wet_threshold, EXPORT_SCALE);
        let path = dir.join(file_name(bundle, layer));
        write_png(&image, &path)?;
        info!(path = %path.display(), width = image.width, height = image.height, "Exported {}", layer.name());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use harmonia_worldgen::{
        MetabolismSnapshot, TileCoordinate, TileGenerator, TileRequest, WorldGenConfig,
    };

    #[test]
    fn test_png_signature_written() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("a.png");
        let mut image = DebugImage::new(3, 2);
        image.set_pixel(1, 1, [200, 10, 10, 255]);
        write_png(&image, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_export_writes_every_layer() {
        let temp_dir = tempfile::tempdir().unwrap();
        let generator = TileGenerator::new(WorldGenConfig {
            base_resolution: 17,
            ..Default::default()
        })
        .unwrap();
        let bundle = generator
            .generate(&TileRequest::new(
                1,
                TileCoordinate::new(0, -1),
                MetabolismSnapshot::default(),
            ))
            .unwrap();

        let written = export_tile(&bundle, generator.biome_table(), -1.0, temp_dir.path()).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written[1].ends_with("tile_0_-1_biome.png"));
        for path in written {
            assert!(path.exists(), "{} missing", path.display());
        }
    }
}
