//! Stepped pyramid generator.
//!
//! Layer `k` (0 = base) is a `(base_size - k) x (base_size - k)` square of
//! unit cubes, centered over the layer below and one unit above it. Raw
//! layer heights are `z_k = -(base_size - 1 - k)`, so the top layer spans
//! `z in [0, 1]` and the base is the layer with the most negative z.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::color::{default_palette, Color};
use crate::mesh::{CUBE_VERTEX_COUNT, CUBE_VERTICES};

/// Structure generator validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
}

/// One cube of the structure.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Layer index, 0 at the base.
    pub layer: usize,
    /// Minimum corner in cube units, before cell-size scaling.
    pub origin: Point3<f64>,
    pub color: Color,
}

/// Immutable pyramid of blocks plus the flat point set fed to the projector.
///
/// Block `i` owns points `8 * i .. 8 * i + 8`, in the vertex order of
/// [`crate::mesh::CUBE_VERTICES`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    base_size: usize,
    cell_size: f64,
    blocks: Vec<Block>,
    points: Vec<Point3<f64>>,
}

impl Structure {
    pub fn base_size(&self) -> usize {
        self.base_size
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of layers (equal to the base size).
    pub fn layer_count(&self) -> usize {
        self.base_size
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Flat scaled points, 8 per block, in generation order.
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Scaled corner points of one block.
    pub fn block_points(&self, index: usize) -> Option<&[Point3<f64>]> {
        let start = index.checked_mul(CUBE_VERTEX_COUNT)?;
        self.points.get(start..start.checked_add(CUBE_VERTEX_COUNT)?)
    }

    /// Per-block colors, aligned with [`Structure::blocks`].
    pub fn colors(&self) -> Vec<Color> {
        self.blocks.iter().map(|b| b.color).collect()
    }

    /// Points per block; always the cube vertex count.
    pub fn block_size(&self) -> usize {
        CUBE_VERTEX_COUNT
    }
}

/// Total block count of a pyramid with the given base size.
pub fn block_count(base_size: usize) -> usize {
    (1..=base_size).map(|s| s * s).sum()
}

/// Build a stepped pyramid of unit cubes.
///
/// Output is a pure function of the arguments.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(palette), fields(palette_len = palette.len()))
)]
pub fn generate(
    base_size: usize,
    cell_size: f64,
    palette: &[Color],
) -> Result<Structure, StructureError> {
    if base_size < 1 {
        return Err(StructureError::InvalidParameter {
            name: "base_size",
            reason: "must be >= 1",
        });
    }
    if !cell_size.is_finite() || cell_size <= 0.0 {
        return Err(StructureError::InvalidParameter {
            name: "cell_size",
            reason: "must be finite and > 0",
        });
    }
    if palette.is_empty() {
        return Err(StructureError::InvalidParameter {
            name: "palette",
            reason: "must contain at least one color",
        });
    }

    let total = block_count(base_size);
    let mut blocks = Vec::with_capacity(total);
    let mut points = Vec::with_capacity(total * CUBE_VERTEX_COUNT);

    for layer in 0..base_size {
        let side = base_size - layer;
        let offset = (base_size - side) as f64 / 2.0;
        let z = layer as f64 - (base_size - 1) as f64;
        let color = palette[layer % palette.len()];

        for y in 0..side {
            for x in 0..side {
                let origin = Point3::new(x as f64 + offset, y as f64 + offset, z);
                for v in CUBE_VERTICES.iter() {
                    points.push(Point3::new(
                        (origin.x + v[0]) * cell_size,
                        (origin.y + v[1]) * cell_size,
                        (origin.z + v[2]) * cell_size,
                    ));
                }
                blocks.push(Block {
                    layer,
                    origin,
                    color,
                });
            }
        }
    }

    log::debug!(
        "generated pyramid base_size={} blocks={} points={}",
        base_size,
        blocks.len(),
        points.len()
    );

    Ok(Structure {
        base_size,
        cell_size,
        blocks,
        points,
    })
}

fn default_base_size() -> usize {
    5
}

fn default_cell_size() -> f64 {
    0.03
}

/// Serializable generator inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PyramidParams {
    pub base_size: usize,
    /// Cube edge length in world units; usually the board cell size.
    pub cell_size: f64,
    pub palette: Vec<Color>,
}

impl Default for PyramidParams {
    fn default() -> Self {
        Self {
            base_size: default_base_size(),
            cell_size: default_cell_size(),
            palette: default_palette(),
        }
    }
}

impl PyramidParams {
    pub fn generate(&self) -> Result<Structure, StructureError> {
        generate(self.base_size, self.cell_size, &self.palette)
    }
}
