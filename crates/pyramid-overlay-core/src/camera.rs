//! Pinhole camera with Brown-Conrady distortion, and the board-to-camera pose.
//!
//! Conventions follow OpenCV: pixel origin top-left with y down, camera z
//! looking forward, distortion coefficients ordered `k1, k2, p1, p2, k3`.

use nalgebra::{Point2, Point3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Radial (`k1, k2, k3`) and tangential (`p1, p2`) distortion coefficients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl Distortion {
    pub const NONE: Distortion = Distortion {
        k1: 0.0,
        k2: 0.0,
        p1: 0.0,
        p2: 0.0,
        k3: 0.0,
    };

    /// Build from OpenCV-ordered coefficients `[k1, k2, p1, p2, k3]`.
    pub fn from_opencv(c: [f64; 5]) -> Self {
        Self {
            k1: c[0],
            k2: c[1],
            p1: c[2],
            p2: c[3],
            k3: c[4],
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }

    /// Distort a point on the normalized image plane.
    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let (x, y) = (p.x, p.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
        let xd = x * radial + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        Point2::new(xd, yd)
    }

    /// Fixed-point inverse of [`Distortion::apply`].
    pub fn remove(&self, pd: Point2<f64>) -> Point2<f64> {
        if self.is_none() {
            return pd;
        }
        let mut x = pd.x;
        let mut y = pd.y;
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let radial = 1.0 + r2 * (self.k1 + r2 * (self.k2 + r2 * self.k3));
            if radial.abs() < 1e-12 {
                break;
            }
            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            x = (pd.x - dx) / radial;
            y = (pd.y - dy) / radial;
        }
        Point2::new(x, y)
    }
}

const UNDISTORT_ITERATIONS: usize = 20;

/// Camera intrinsics; constructed once at startup and treated as immutable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    #[serde(default)]
    pub distortion: Distortion,
}

impl Default for CameraIntrinsics {
    /// Calibration of the 1280x720 capture the default configuration targets.
    fn default() -> Self {
        Self {
            fx: 590.465_128_18,
            fy: 590.389_157_26,
            cx: 641.589_861_21,
            cy: 365.106_768_19,
            distortion: Distortion::from_opencv([
                0.003_040_39,
                -0.007_359_64,
                0.000_194_95,
                0.000_680_62,
                0.001_162_75,
            ]),
        }
    }
}

impl CameraIntrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            distortion: Distortion::NONE,
        }
    }

    pub fn with_distortion(mut self, distortion: Distortion) -> Self {
        self.distortion = distortion;
        self
    }

    /// Focal lengths must be finite and non-zero; the principal point finite.
    pub fn is_valid(&self) -> bool {
        let d = &self.distortion;
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.fx.abs() > f64::EPSILON
            && self.fy.abs() > f64::EPSILON
            && self.cx.is_finite()
            && self.cy.is_finite()
            && [d.k1, d.k2, d.p1, d.p2, d.k3].iter().all(|c| c.is_finite())
    }

    /// Map a normalized (distorted) image-plane point to pixels.
    #[inline]
    pub fn to_pixel(&self, p: Point2<f64>) -> Point2<f64> {
        Point2::new(self.fx * p.x + self.cx, self.fy * p.y + self.cy)
    }

    /// Pixel to normalized, undistorted image-plane coordinates.
    pub fn undistort_point(&self, px: Point2<f64>) -> Point2<f64> {
        let pd = Point2::new((px.x - self.cx) / self.fx, (px.y - self.cy) / self.fy);
        self.distortion.remove(pd)
    }
}

/// Rigid board-to-camera transform: `X_cam = R * X_board + t`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub rotation: Rotation3<f64>,
    pub translation: Vector3<f64>,
}

impl Pose {
    pub fn new(rotation: Rotation3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Self {
        Self::new(Rotation3::identity(), Vector3::zeros())
    }

    /// Build from a Rodrigues rotation vector (axis * angle) and translation.
    pub fn from_rvec_tvec(rvec: Vector3<f64>, tvec: Vector3<f64>) -> Self {
        Self::new(Rotation3::new(rvec), tvec)
    }

    /// Rodrigues rotation vector of this pose.
    pub fn rvec(&self) -> Vector3<f64> {
        self.rotation.scaled_axis()
    }

    /// Transform a board point into the camera frame.
    #[inline]
    pub fn transform_point(&self, p: &Point3<f64>) -> Point3<f64> {
        self.rotation * *p + self.translation
    }

    /// Camera center in board coordinates: `-R^T t`.
    pub fn camera_position(&self) -> Point3<f64> {
        Point3::from(-(self.rotation.transpose() * self.translation))
    }

    pub fn is_finite(&self) -> bool {
        self.rotation.matrix().iter().all(|v| v.is_finite())
            && self.translation.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn camera_position_of_identity_rotation() {
        let pose = Pose::new(Rotation3::identity(), Vector3::new(1.0, 2.0, 3.0));
        let p = pose.camera_position();
        assert_eq!(p, Point3::new(-1.0, -2.0, -3.0));
    }

    #[test]
    fn camera_position_maps_to_camera_origin() {
        let pose = Pose::from_rvec_tvec(
            Vector3::new(0.3, -0.2, 0.1),
            Vector3::new(0.1, 0.05, 0.6),
        );
        let c = pose.camera_position();
        let in_cam = pose.transform_point(&c);
        assert_relative_eq!(in_cam.coords.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn rvec_round_trips() {
        let rvec = Vector3::new(0.2, 0.4, -0.3);
        let pose = Pose::from_rvec_tvec(rvec, Vector3::zeros());
        assert_relative_eq!(pose.rvec(), rvec, epsilon = 1e-12);
    }

    #[test]
    fn undistort_inverts_distortion() {
        let cam = CameraIntrinsics::default();
        for &(x, y) in &[(0.0, 0.0), (0.2, -0.1), (-0.4, 0.3), (0.6, 0.45)] {
            let p = Point2::new(x, y);
            let px = cam.to_pixel(cam.distortion.apply(p));
            let back = cam.undistort_point(px);
            assert_relative_eq!(back.x, x, epsilon = 1e-9);
            assert_relative_eq!(back.y, y, epsilon = 1e-9);
        }
    }

    #[test]
    fn validity_rejects_zero_focal_length() {
        assert!(CameraIntrinsics::default().is_valid());
        assert!(!CameraIntrinsics::new(0.0, 500.0, 320.0, 240.0).is_valid());
        assert!(!CameraIntrinsics::new(500.0, 500.0, f64::NAN, 240.0).is_valid());
    }
}
