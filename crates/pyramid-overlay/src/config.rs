//! JSON configuration for the overlay pipeline.

use std::{fs, path::Path};

use pyramid_overlay_core::{CameraIntrinsics, PyramidParams, Structure, StructureError};
use pyramid_overlay_pose::{BoardLayout, PlanarPnp, PlanarPnpParams};
use pyramid_overlay_render::{Compositor, RenderStyle};
use serde::{Deserialize, Serialize};

/// Upper bound on `style.line_thickness`; each line step stamps a disk of
/// this diameter.
pub const MAX_LINE_THICKNESS: u32 = 64;
/// Upper bound on `style.text_scale`.
pub const MAX_TEXT_SCALE: u32 = 32;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Structure(#[from] StructureError),
    #[error("invalid camera intrinsics: {0:?}")]
    InvalidCamera(CameraIntrinsics),
    #[error("invalid board layout: {cols}x{rows} corners, cell size {cell_size}")]
    InvalidBoard { cols: u32, rows: u32, cell_size: f64 },
    #[error("invalid render style: {reason}")]
    InvalidStyle { reason: &'static str },
}

/// Everything the pipeline needs, loaded once at startup.
///
/// Every section may be omitted; missing sections take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub camera: CameraIntrinsics,
    pub board: BoardLayout,
    pub pyramid: PyramidParams,
    pub style: RenderStyle,
    pub pose: PlanarPnpParams,
}

impl OverlayConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn build_camera(&self) -> Result<CameraIntrinsics, ConfigError> {
        if !self.camera.is_valid() {
            return Err(ConfigError::InvalidCamera(self.camera));
        }
        Ok(self.camera)
    }

    pub fn build_board(&self) -> Result<BoardLayout, ConfigError> {
        let b = self.board;
        if !b.is_valid() {
            return Err(ConfigError::InvalidBoard {
                cols: b.cols,
                rows: b.rows,
                cell_size: b.cell_size,
            });
        }
        Ok(b)
    }

    /// Generate the pyramid described by the `pyramid` section.
    pub fn build_structure(&self) -> Result<Structure, ConfigError> {
        Ok(self.pyramid.generate()?)
    }

    pub fn build_estimator(&self) -> PlanarPnp {
        PlanarPnp::new(self.pose.clone())
    }

    pub fn build_compositor(&self) -> Result<Compositor, ConfigError> {
        let alpha = self.style.alpha;
        if !alpha.is_finite() || !(0.0..=1.0).contains(&alpha) {
            return Err(ConfigError::InvalidStyle {
                reason: "alpha must be within [0, 1]",
            });
        }
        if !(1..=MAX_LINE_THICKNESS).contains(&self.style.line_thickness) {
            return Err(ConfigError::InvalidStyle {
                reason: "line_thickness must be within [1, 64]",
            });
        }
        if self.style.text_scale > MAX_TEXT_SCALE {
            return Err(ConfigError::InvalidStyle {
                reason: "text_scale must be at most 32",
            });
        }
        Ok(Compositor::new(self.style.clone()))
    }
}
