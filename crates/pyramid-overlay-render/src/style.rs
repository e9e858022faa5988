use pyramid_overlay_core::Color;
use serde::{Deserialize, Serialize};

/// Drawing parameters for the compositor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    /// Weight of the filled overlay when blending onto the frame.
    pub alpha: f32,
    pub line_color: Color,
    pub line_thickness: u32,
    pub text_color: Color,
    /// Baseline-left corner of the camera position readout.
    pub text_anchor: [i32; 2],
    /// Integer magnification of the 5x7 bitmap font.
    pub text_scale: u32,
    /// Draw the `XYZ: [...]` readout.
    pub show_camera_position: bool,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            alpha: 0.4,
            line_color: Color::new(50, 50, 50),
            line_thickness: 1,
            text_color: Color::new(0, 255, 0),
            text_anchor: [10, 25],
            text_scale: 2,
            show_camera_position: true,
        }
    }
}
