//! Display configuration applied to the rendering context

use urdf_core::{ColorsPayload, DisplayConfig, DisplayError};

use crate::context::RenderingContext;

/// Applies `colors` pushes to a [`RenderingContext`] and reads them back
pub struct ConfigSync;

impl ConfigSync {
    /// Apply a configuration snapshot and allow frames to be drawn
    ///
    /// The grid's fill colour takes the minor (line) setting and its line
    /// colour takes the main setting.
    pub fn apply(ctx: &mut RenderingContext, config: &DisplayConfig) {
        ctx.camera.set_radius(config.camera_radius);
        ctx.clear_color = config.background_color.to_rgba_f32();

        ctx.grid.main_color = config.grid_minor_color;
        ctx.grid.line_color = config.grid_main_color;
        ctx.grid.minor_unit_visibility = config.grid_minor_opacity;
        ctx.grid.major_unit_frequency = config.grid_frequency;
        ctx.grid.grid_ratio = config.grid_ratio;

        ctx.debug_layer_visible = config.debug_ui;
        ctx.mark_ready();
    }

    /// Decode and apply a `colors` message; a bad payload changes nothing
    pub fn apply_payload(
        ctx: &mut RenderingContext,
        payload: &ColorsPayload,
    ) -> Result<(), DisplayError> {
        let config = payload.parse()?;
        Self::apply(ctx, &config);
        Ok(())
    }

    /// The configuration the context currently reflects
    pub fn snapshot(ctx: &RenderingContext) -> DisplayConfig {
        let to_byte = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
        let [r, g, b, a] = ctx.clear_color.map(to_byte);
        DisplayConfig {
            camera_radius: ctx.camera.radius,
            background_color: urdf_core::HexColor { r, g, b, a },
            grid_minor_color: ctx.grid.main_color,
            grid_main_color: ctx.grid.line_color,
            grid_minor_opacity: ctx.grid.minor_unit_visibility,
            grid_frequency: ctx.grid.major_unit_frequency,
            grid_ratio: ctx.grid.grid_ratio,
            debug_ui: ctx.debug_layer_visible,
        }
    }
}
