use nalgebra::{Matrix3, Point2, Point3, Rotation3};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use pyramid_overlay_core::{estimate_homography, CameraIntrinsics, Pose};

use crate::error::{PoseError, PoseFailure};
use crate::refine::refine_pose;

/// Recovers the board-to-camera pose from ordered 3-D/2-D correspondences.
pub trait PoseEstimator {
    fn estimate(
        &self,
        object_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        intrinsics: &CameraIntrinsics,
    ) -> Result<Pose, PoseError>;
}

/// Parameters for [`PlanarPnp`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanarPnpParams {
    /// Levenberg-Marquardt iteration cap.
    pub max_iterations: usize,
    /// Minimal number of correspondences (at least 4).
    pub min_points: usize,
    /// Reject solutions whose RMS reprojection error exceeds this (pixels).
    ///
    /// `None` disables the check.
    pub max_rms_px: Option<f64>,
    /// Tolerance on `|z|` for object points to count as on the board plane.
    pub planarity_tolerance: f64,
}

impl Default for PlanarPnpParams {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            min_points: 4,
            max_rms_px: None,
            planarity_tolerance: 1e-9,
        }
    }
}

/// Successful solve with quality information.
#[derive(Clone, Copy, Debug)]
pub struct PoseSolution {
    pub pose: Pose,
    pub rms_px: f64,
    pub iterations: usize,
}

/// Pose from a planar target: homography decomposition, then
/// Levenberg-Marquardt refinement on pixel reprojection error.
#[derive(Clone, Debug, Default)]
pub struct PlanarPnp {
    params: PlanarPnpParams,
}

impl PlanarPnp {
    pub fn new(params: PlanarPnpParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PlanarPnpParams {
        &self.params
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(n = object_points.len()))
    )]
    pub fn solve(
        &self,
        object_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        intrinsics: &CameraIntrinsics,
    ) -> Result<PoseSolution, PoseError> {
        if object_points.len() != image_points.len() {
            return Err(PoseFailure::LengthMismatch {
                objects: object_points.len(),
                images: image_points.len(),
            }
            .into());
        }
        let needed = self.params.min_points.max(4);
        if object_points.len() < needed {
            return Err(PoseFailure::TooFewPoints {
                needed,
                got: object_points.len(),
            }
            .into());
        }
        if !intrinsics.is_valid() {
            return Err(PoseFailure::InvalidIntrinsics.into());
        }
        let tol = self.params.planarity_tolerance;
        if object_points.iter().any(|p| p.z.abs() > tol) {
            return Err(PoseFailure::NonPlanar.into());
        }

        let plane: Vec<Point2<f64>> = object_points.iter().map(|p| p.xy()).collect();
        if is_collinear(&plane) {
            return Err(PoseFailure::Degenerate.into());
        }
        let normalized: Vec<Point2<f64>> = image_points
            .iter()
            .map(|&q| intrinsics.undistort_point(q))
            .collect();

        let h = estimate_homography(&plane, &normalized).ok_or(PoseFailure::HomographyFailed)?;
        let initial = decompose_planar_homography(&h.h).ok_or(PoseFailure::Degenerate)?;

        let refined = refine_pose(
            &initial,
            object_points,
            image_points,
            intrinsics,
            self.params.max_iterations,
        );
        if !refined.pose.is_finite() || !refined.rms_px.is_finite() {
            return Err(PoseFailure::NonFinite.into());
        }
        if let Some(max_px) = self.params.max_rms_px {
            if refined.rms_px > max_px {
                return Err(PoseFailure::ResidualTooLarge {
                    rms_px: refined.rms_px,
                    max_px,
                }
                .into());
            }
        }

        log::trace!(
            "pose solved n={} rms_px={:.4} iterations={}",
            object_points.len(),
            refined.rms_px,
            refined.iterations
        );

        Ok(PoseSolution {
            pose: refined.pose,
            rms_px: refined.rms_px,
            iterations: refined.iterations,
        })
    }
}

impl PoseEstimator for PlanarPnp {
    fn estimate(
        &self,
        object_points: &[Point3<f64>],
        image_points: &[Point2<f64>],
        intrinsics: &CameraIntrinsics,
    ) -> Result<Pose, PoseError> {
        self.solve(object_points, image_points, intrinsics)
            .map(|s| s.pose)
    }
}

/// True if the points span (numerically) less than two dimensions.
fn is_collinear(pts: &[Point2<f64>]) -> bool {
    let n = pts.len() as f64;
    let (sx, sy) = pts
        .iter()
        .fold((0.0, 0.0), |(ax, ay), p| (ax + p.x, ay + p.y));
    let (mx, my) = (sx / n, sy / n);
    let (mut a, mut b, mut c) = (0.0, 0.0, 0.0);
    for p in pts {
        let (dx, dy) = (p.x - mx, p.y - my);
        a += dx * dx;
        b += dx * dy;
        c += dy * dy;
    }
    let half_trace = 0.5 * (a + c);
    let disc = (0.25 * (a - c) * (a - c) + b * b).sqrt();
    let (l_min, l_max) = (half_trace - disc, half_trace + disc);
    l_max <= 0.0 || l_min <= 1e-9 * l_max
}

/// Split `H ~ [r1 r2 t]` (board plane to normalized image plane) into a pose
/// with the board in front of the camera.
fn decompose_planar_homography(h: &Matrix3<f64>) -> Option<Pose> {
    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();

    let norm = 0.5 * (h1.norm() + h2.norm());
    if !norm.is_finite() || norm < 1e-12 {
        return None;
    }
    let mut lambda = 1.0 / norm;
    if h3.z * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1 = h1 * lambda;
    let r2 = h2 * lambda;
    let r3 = r1.cross(&r2);
    let t = h3 * lambda;

    let approx_r = Matrix3::from_columns(&[r1, r2, r3]);
    let svd = approx_r.svd(true, true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let mut u_fixed = u;
        u_fixed.column_mut(2).neg_mut();
        r = u_fixed * v_t;
    }

    let pose = Pose::new(Rotation3::from_matrix_unchecked(r), t);
    pose.is_finite().then_some(pose)
}
