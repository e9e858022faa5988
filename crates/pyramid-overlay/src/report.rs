//! Serializable dump of a generated structure.

use std::{fs, path::Path};

use pyramid_overlay_core::{Color, Structure};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockReport {
    pub index: usize,
    pub layer: usize,
    /// Minimum corner in cube units.
    pub origin: [f64; 3],
    pub color: Color,
    /// The 8 scaled cube vertices, in mesh vertex order.
    pub points: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureReport {
    pub base_size: usize,
    pub cell_size: f64,
    pub layer_count: usize,
    pub block_count: usize,
    pub blocks: Vec<BlockReport>,
}

impl StructureReport {
    pub fn from_structure(structure: &Structure) -> Self {
        let blocks = structure
            .blocks()
            .iter()
            .enumerate()
            .map(|(index, block)| BlockReport {
                index,
                layer: block.layer,
                origin: [block.origin.x, block.origin.y, block.origin.z],
                color: block.color,
                points: structure
                    .block_points(index)
                    .unwrap_or_default()
                    .iter()
                    .map(|p| [p.x, p.y, p.z])
                    .collect(),
            })
            .collect();

        Self {
            base_size: structure.base_size(),
            cell_size: structure.cell_size(),
            layer_count: structure.layer_count(),
            block_count: structure.len(),
            blocks,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), crate::Error> {
        fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}
