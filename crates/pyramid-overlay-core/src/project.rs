use nalgebra::{Point2, Point3};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::camera::{CameraIntrinsics, Pose};

/// Errors produced by the projector.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("cannot project an empty point set")]
    EmptyInput,
}

/// Depth magnitude below which the perspective divide uses a signed epsilon.
const MIN_DEPTH: f64 = 1e-9;

/// Project one board point to sub-pixel image coordinates.
///
/// Points behind the camera are still projected; callers clip.
#[inline]
pub fn project_point_f64(
    p: &Point3<f64>,
    pose: &Pose,
    intrinsics: &CameraIntrinsics,
) -> Point2<f64> {
    let pc = pose.transform_point(p);
    let z = if pc.z.abs() < MIN_DEPTH {
        MIN_DEPTH.copysign(pc.z)
    } else {
        pc.z
    };
    let normalized = Point2::new(pc.x / z, pc.y / z);
    intrinsics.to_pixel(intrinsics.distortion.apply(normalized))
}

/// Round to the nearest pixel; out-of-range values saturate and NaN maps to 0.
#[inline]
pub fn to_pixel_i32(p: Point2<f64>) -> Point2<i32> {
    Point2::new(p.x.round() as i32, p.y.round() as i32)
}

/// Project points into integer pixel coordinates, one output per input in
/// the same order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(points, pose, intrinsics), fields(n = points.len()))
)]
pub fn project(
    points: &[Point3<f64>],
    pose: &Pose,
    intrinsics: &CameraIntrinsics,
) -> Result<Vec<Point2<i32>>, ProjectionError> {
    if points.is_empty() {
        return Err(ProjectionError::EmptyInput);
    }
    Ok(points
        .iter()
        .map(|p| to_pixel_i32(project_point_f64(p, pose, intrinsics)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Distortion;
    use approx::assert_relative_eq;
    use nalgebra::{Rotation3, Vector3};

    fn simple_camera() -> CameraIntrinsics {
        CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0)
    }

    #[test]
    fn empty_input_fails() {
        let err = project(&[], &Pose::identity(), &simple_camera()).unwrap_err();
        assert_eq!(err, ProjectionError::EmptyInput);
    }

    #[test]
    fn pinhole_without_distortion() {
        let pose = Pose::new(Rotation3::identity(), Vector3::new(0.0, 0.0, 2.0));
        let out = project(
            &[Point3::new(0.0, 0.0, 0.0), Point3::new(0.2, -0.4, 0.0)],
            &pose,
            &simple_camera(),
        )
        .expect("project");
        assert_eq!(out, vec![Point2::new(320, 240), Point2::new(370, 140)]);
    }

    #[test]
    fn preserves_order_and_cardinality() {
        let pose = Pose::from_rvec_tvec(
            Vector3::new(0.1, 0.2, 0.05),
            Vector3::new(0.0, 0.0, 1.0),
        );
        let pts: Vec<Point3<f64>> = (0..37)
            .map(|i| Point3::new(i as f64 * 0.01, (i % 5) as f64 * 0.02, 0.0))
            .collect();
        let cam = CameraIntrinsics::default();
        let out = project(&pts, &pose, &cam).expect("project");
        assert_eq!(out.len(), pts.len());
        for (p, q) in pts.iter().zip(out.iter()) {
            assert_eq!(*q, to_pixel_i32(project_point_f64(p, &pose, &cam)));
        }
    }

    #[test]
    fn distortion_moves_off_axis_points_only() {
        let pose = Pose::new(Rotation3::identity(), Vector3::new(0.0, 0.0, 1.0));
        let plain = simple_camera();
        let distorted =
            plain.with_distortion(Distortion::from_opencv([0.1, 0.0, 0.0, 0.0, 0.0]));
        let center = Point3::new(0.0, 0.0, 0.0);
        let off = Point3::new(0.5, 0.0, 0.0);
        assert_eq!(
            project_point_f64(&center, &pose, &plain),
            project_point_f64(&center, &pose, &distorted)
        );
        let a = project_point_f64(&off, &pose, &plain);
        let b = project_point_f64(&off, &pose, &distorted);
        // x' = 0.5 * (1 + 0.1 * 0.25)
        assert_relative_eq!(b.x - 320.0, 500.0 * 0.5125, epsilon = 1e-9);
        assert!(b.x > a.x);
    }

    #[test]
    fn degenerate_depth_is_finite() {
        let pose = Pose::identity();
        let p = project_point_f64(&Point3::new(1.0, 0.0, 0.0), &pose, &simple_camera());
        assert!(p.x.is_finite());
        let px = to_pixel_i32(p);
        assert_eq!(px.x, i32::MAX);
    }
}
