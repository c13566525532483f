//! An RGBA raster used by the tile renderers.

use hashbrown::HashSet;

/// Row-major RGBA image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes.
    pub pixels: Vec<u8>,
}

impl DebugImage {
    /// Create a transparent black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize * self.width as usize + x as usize) * 4)
    }

    /// Write one pixel. Out-of-bounds writes are ignored so overlays can run
    /// off the edge.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if let Some(i) = self.offset(x, y) {
            self.pixels[i..i + 4].copy_from_slice(&rgba);
        }
    }

    /// Read one pixel, or `None` outside the image.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let i = self.offset(x, y)?;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    /// Fill the `size × size` block whose top-left pixel is `(x, y)`.
    pub fn fill_block(&mut self, x: u32, y: u32, size: u32, rgba: [u8; 4]) {
        for dy in 0..size {
            for dx in 0..size {
                self.set_pixel(x + dx, y + dy, rgba);
            }
        }
    }

    /// Alpha-blend `rgb` over the existing pixel with weight `alpha` in `[0, 1]`.
    pub fn blend_pixel(&mut self, x: u32, y: u32, rgb: [u8; 3], alpha: f64) {
        let Some(i) = self.offset(x, y) else {
            return;
        };
        let a = alpha.clamp(0.0, 1.0);
        for (c, &src) in rgb.iter().enumerate() {
            let dst = self.pixels[i + c] as f64;
            self.pixels[i + c] = (dst + (src as f64 - dst) * a).round() as u8;
        }
        self.pixels[i + 3] = 255;
    }

    /// Bresenham line between two pixel positions (may lie outside).
    pub fn draw_line(&mut self, from: (i64, i64), to: (i64, i64), rgba: [u8; 4]) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            if x >= 0 && y >= 0 && x <= u32::MAX as i64 && y <= u32::MAX as i64 {
                self.set_pixel(x as u32, y as u32, rgba);
            }
            if x == to.0 && y == to.1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Filled square marker of half-width `radius` centred on `(cx, cy)`.
    pub fn draw_marker(&mut self, cx: i64, cy: i64, radius: i64, rgba: [u8; 4]) {
        for y in cy - radius..=cy + radius {
            for x in cx - radius..=cx + radius {
                if x >= 0 && y >= 0 {
                    self.set_pixel(x as u32, y as u32, rgba);
                }
            }
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of distinct RGB colours, ignoring alpha.
    pub fn unique_color_count(&self) -> usize {
        self.pixels
            .chunks_exact(4)
            .map(|p| (p[0], p[1], p[2]))
            .collect::<HashSet<_>>()
            .len()
    }
}
