use image::{Rgb, RgbImage};
use nalgebra::{Point2, Point3};

#[cfg(feature = "tracing")]
use tracing::instrument;

use pyramid_overlay_core::{Color, Pose, Structure, UnitCubeMesh};

use crate::error::RenderError;
use crate::font::draw_text;
use crate::raster::{blend_into, draw_line, fill_polygon};
use crate::style::RenderStyle;

#[inline]
fn rgb(c: Color) -> Rgb<u8> {
    Rgb(c.to_array())
}

/// `XYZ: [x y z]` with three decimals.
pub fn format_camera_position(p: &Point3<f64>) -> String {
    format!("XYZ: [{:.3} {:.3} {:.3}]", p.x, p.y, p.z)
}

fn validate(
    points: usize,
    block_size: usize,
    blocks: usize,
    edges: &[(usize, usize)],
    faces: &[[usize; 4]],
    alpha: f32,
) -> Result<(), RenderError> {
    let expected = block_size * blocks;
    if points != expected {
        return Err(RenderError::PointCountMismatch {
            expected,
            got: points,
            blocks,
            block_size,
        });
    }
    if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
        return Err(RenderError::InvalidAlpha(alpha));
    }
    let bad_index = |kind: &'static str, index: usize| RenderError::InvalidIndex {
        kind,
        index,
        block_size,
    };
    for &(a, b) in edges {
        if let Some(&i) = [a, b].iter().find(|&&i| i >= block_size) {
            return Err(bad_index("edge", i));
        }
    }
    for face in faces {
        if let Some(&i) = face.iter().find(|&&i| i >= block_size) {
            return Err(bad_index("face", i));
        }
    }
    Ok(())
}

/// Composite translucent faces and opaque edges of every block onto `frame`.
///
/// `points_2d` holds `block_size` consecutive points per block, one block per
/// entry of `colors`. Faces are filled in the order given, block by block, on
/// a copy of the frame which is then blended back with `style.alpha`; edges
/// are drawn afterwards without blending. Draw order is the only occlusion.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(blocks = colors.len()))
)]
pub fn render(
    frame: &mut RgbImage,
    points_2d: &[Point2<i32>],
    block_size: usize,
    colors: &[Color],
    edges: &[(usize, usize)],
    faces: &[[usize; 4]],
    style: &RenderStyle,
) -> Result<(), RenderError> {
    validate(
        points_2d.len(),
        block_size,
        colors.len(),
        edges,
        faces,
        style.alpha,
    )?;

    let blocks = || points_2d.chunks_exact(block_size.max(1)).zip(colors);

    let mut overlay = frame.clone();
    for (block, &color) in blocks() {
        let fill = rgb(color);
        for face in faces {
            let polygon = face.map(|i| block[i]);
            fill_polygon(&mut overlay, &polygon, fill);
        }
    }
    blend_into(frame, &overlay, style.alpha)?;

    let line = rgb(style.line_color);
    for (block, _) in blocks() {
        for &(a, b) in edges {
            draw_line(frame, block[a], block[b], line, style.line_thickness);
        }
    }
    Ok(())
}

/// Draw the camera position readout for `pose` at the style's text anchor.
pub fn draw_camera_position(frame: &mut RgbImage, pose: &Pose, style: &RenderStyle) {
    let text = format_camera_position(&pose.camera_position());
    let [x, y] = style.text_anchor;
    draw_text(frame, &text, (x, y), rgb(style.text_color), style.text_scale);
}

/// Per-frame renderer for a fixed style and block mesh.
#[derive(Clone, Debug, Default)]
pub struct Compositor {
    style: RenderStyle,
    mesh: UnitCubeMesh,
}

impl Compositor {
    pub fn new(style: RenderStyle) -> Self {
        Self {
            style,
            mesh: UnitCubeMesh::CANONICAL,
        }
    }

    /// Replace the edge and face tables used for every block.
    pub fn with_mesh(mut self, mesh: UnitCubeMesh) -> Self {
        self.mesh = mesh;
        self
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    pub fn mesh(&self) -> &UnitCubeMesh {
        &self.mesh
    }

    /// Blend the structure's faces, draw its edges, then the position readout.
    ///
    /// `projected` must be the projection of `structure.points()` under `pose`.
    pub fn render_frame(
        &self,
        frame: &mut RgbImage,
        structure: &Structure,
        projected: &[Point2<i32>],
        pose: &Pose,
    ) -> Result<(), RenderError> {
        render(
            frame,
            projected,
            structure.block_size(),
            &structure.colors(),
            self.mesh.edges,
            self.mesh.faces,
            &self.style,
        )?;
        if self.style.show_camera_position {
            draw_camera_position(frame, pose, &self.style);
        }
        log::trace!(
            "rendered {} blocks onto {}x{} frame",
            structure.len(),
            frame.width(),
            frame.height()
        );
        Ok(())
    }
}
