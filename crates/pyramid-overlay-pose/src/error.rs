/// Why a pose could not be recovered for a frame.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum PoseFailure {
    #[error("need at least {needed} correspondences, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("{objects} object points but {images} image points")]
    LengthMismatch { objects: usize, images: usize },
    #[error("object points are not on the z = 0 board plane")]
    NonPlanar,
    #[error("invalid camera intrinsics")]
    InvalidIntrinsics,
    #[error("homography estimation failed")]
    HomographyFailed,
    #[error("homography does not decompose into a rigid pose")]
    Degenerate,
    #[error("refined pose is not finite")]
    NonFinite,
    #[error("reprojection rms {rms_px:.3}px exceeds {max_px:.3}px")]
    ResidualTooLarge { rms_px: f64, max_px: f64 },
}

/// Errors returned by pose estimators. Never fatal for the frame loop.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum PoseError {
    #[error("pose not found: {reason}")]
    PoseNotFound { reason: PoseFailure },
}

impl From<PoseFailure> for PoseError {
    fn from(reason: PoseFailure) -> Self {
        PoseError::PoseNotFound { reason }
    }
}
