//! Ground grid material

use bytemuck::{Pod, Zeroable};
use urdf_core::HexColor;

/// Upper bound on lines drawn per axis direction on each side of the origin
const MAX_LINES_PER_SIDE: i32 = 1000;

/// Grid line vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GridVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Appearance of the ground grid
#[derive(Debug, Clone, PartialEq)]
pub struct GridMaterial {
    /// Plane fill colour
    pub main_color: HexColor,
    /// Line colour
    pub line_color: HexColor,
    /// Overall opacity
    pub opacity: f32,
    /// Opacity multiplier of minor lines
    pub minor_unit_visibility: f32,
    /// Minor lines per major line
    pub major_unit_frequency: f32,
    /// Distance between minor lines
    pub grid_ratio: f32,
}

impl Default for GridMaterial {
    fn default() -> Self {
        Self {
            main_color: HexColor::rgb(0x00, 0xFF, 0x00),
            line_color: HexColor::rgb(0x00, 0x11, 0x00),
            opacity: 0.8,
            minor_unit_visibility: 0.5,
            major_unit_frequency: 5.0,
            grid_ratio: 1.0,
        }
    }
}

impl GridMaterial {
    /// Line list covering `-extent..=extent` on the XY plane
    pub fn line_vertices(&self, extent: f32) -> Vec<GridVertex> {
        if !(self.grid_ratio > 0.0) || !(extent > 0.0) {
            return Vec::new();
        }

        let lines = ((extent / self.grid_ratio) as i32).min(MAX_LINES_PER_SIDE);
        let frequency = (self.major_unit_frequency.round() as i32).max(1);

        let [r, g, b] = self.line_color.to_rgb_f32();
        let major = [r, g, b, self.opacity];
        let minor = [r, g, b, self.opacity * self.minor_unit_visibility];

        let mut vertices = Vec::with_capacity((lines as usize * 2 + 1) * 4);
        for i in -lines..=lines {
            let offset = i as f32 * self.grid_ratio;
            let color = if i % frequency == 0 { major } else { minor };
            let vertex = |x: f32, y: f32| GridVertex {
                position: [x, y, 0.0],
                color,
            };

            // Parallel to X
            vertices.push(vertex(-extent, offset));
            vertices.push(vertex(extent, offset));
            // Parallel to Y
            vertices.push(vertex(offset, -extent));
            vertices.push(vertex(offset, extent));
        }
        vertices
    }
}
