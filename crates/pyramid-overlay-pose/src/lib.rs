//! Board pose recovery for the overlay pipeline.
//!
//! - [`BoardLayout`] turns labeled corner detections into ordered 3-D/2-D
//!   correspondences.
//! - [`PoseEstimator`] is the seam the pipeline talks to; [`PlanarPnp`] is
//!   the planar perspective-n-point implementation (homography
//!   decomposition followed by Levenberg-Marquardt refinement).
//!
//! A failed solve is always [`PoseError::PoseNotFound`]; callers treat it as
//! "skip this frame".

mod board;
mod error;
mod estimator;
mod refine;

pub use board::{BoardLayout, Correspondences, DetectedCorner, Detection};
pub use error::{PoseError, PoseFailure};
pub use estimator::{PlanarPnp, PlanarPnpParams, PoseEstimator, PoseSolution};
