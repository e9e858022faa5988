//! Core geometry for overlaying a stepped block pyramid on a planar board.
//!
//! This crate is purely geometric. It does *not* depend on any image type or
//! pose solver: it defines the unit cube mesh, generates the pyramid, models
//! the camera and projects board-frame points into pixels.
//!
//! ```
//! use nalgebra::{Rotation3, Vector3};
//! use pyramid_overlay_core::{generate, project, CameraIntrinsics, Color, Pose};
//!
//! let structure = generate(3, 0.03, &[Color::new(255, 0, 0)]).unwrap();
//! let pose = Pose::new(Rotation3::identity(), Vector3::new(0.0, 0.0, 0.5));
//! let px = project(structure.points(), &pose, &CameraIntrinsics::default()).unwrap();
//! assert_eq!(px.len(), structure.points().len());
//! ```

mod camera;
mod color;
mod homography;
mod logger;
mod mesh;
mod project;
mod structure;

pub use camera::{CameraIntrinsics, Distortion, Pose};
pub use color::{default_palette, Color, DEFAULT_PALETTE};
pub use homography::{estimate_homography, homography_from_4pt, Homography};
pub use mesh::{UnitCubeMesh, CUBE_EDGES, CUBE_FACES, CUBE_VERTEX_COUNT, CUBE_VERTICES};
pub use project::{project, project_point_f64, to_pixel_i32, ProjectionError};
pub use structure::{block_count, generate, Block, PyramidParams, Structure, StructureError};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
