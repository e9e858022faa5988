//! Levenberg-Marquardt refinement of a pose on pixel reprojection error.

use nalgebra::{DMatrix, DVector, Point2, Point3, Vector3, Vector6};
use pyramid_overlay_core::{project_point_f64, CameraIntrinsics, Pose};

const JACOBIAN_STEP: f64 = 1e-7;
const MIN_STEP_NORM: f64 = 1e-12;
const INITIAL_DAMPING: f64 = 1e-3;

/// Outcome of a refinement run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Refined {
    pub pose: Pose,
    pub rms_px: f64,
    pub iterations: usize,
}

fn pose_from_params(x: &Vector6<f64>) -> Pose {
    Pose::from_rvec_tvec(
        Vector3::new(x[0], x[1], x[2]),
        Vector3::new(x[3], x[4], x[5]),
    )
}

fn residuals(
    x: &Vector6<f64>,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    intrinsics: &CameraIntrinsics,
) -> DVector<f64> {
    let pose = pose_from_params(x);
    let mut r = DVector::<f64>::zeros(2 * object.len());
    for (k, (p, q)) in object.iter().zip(image.iter()).enumerate() {
        let proj = project_point_f64(p, &pose, intrinsics);
        r[2 * k] = proj.x - q.x;
        r[2 * k + 1] = proj.y - q.y;
    }
    r
}

fn jacobian(
    x: &Vector6<f64>,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    intrinsics: &CameraIntrinsics,
) -> DMatrix<f64> {
    let mut j = DMatrix::<f64>::zeros(2 * object.len(), 6);
    for c in 0..6 {
        let mut xp = *x;
        let mut xm = *x;
        xp[c] += JACOBIAN_STEP;
        xm[c] -= JACOBIAN_STEP;
        let d = (residuals(&xp, object, image, intrinsics)
            - residuals(&xm, object, image, intrinsics))
            / (2.0 * JACOBIAN_STEP);
        j.set_column(c, &d);
    }
    j
}

/// Minimize the squared reprojection error starting from `initial`.
pub(crate) fn refine_pose(
    initial: &Pose,
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    intrinsics: &CameraIntrinsics,
    max_iterations: usize,
) -> Refined {
    let rvec = initial.rvec();
    let mut x = Vector6::new(
        rvec.x,
        rvec.y,
        rvec.z,
        initial.translation.x,
        initial.translation.y,
        initial.translation.z,
    );
    let mut r = residuals(&x, object, image, intrinsics);
    let mut cost = r.norm_squared();
    let mut damping = INITIAL_DAMPING;
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        let j = jacobian(&x, object, image, intrinsics);
        let jt = j.transpose();
        let jtj = &jt * &j;
        let g = &jt * &r;

        let mut a = jtj.clone();
        for d in 0..6 {
            a[(d, d)] += damping * jtj[(d, d)].max(1e-12);
        }
        let Some(step) = a.lu().solve(&(-&g)) else {
            break;
        };
        let step = Vector6::from_iterator(step.iter().copied());

        let candidate = x + step;
        let r_new = residuals(&candidate, object, image, intrinsics);
        let cost_new = r_new.norm_squared();

        if cost_new.is_finite() && cost_new < cost {
            let improvement = cost - cost_new;
            x = candidate;
            r = r_new;
            cost = cost_new;
            damping = (damping / 10.0).max(1e-12);
            if step.norm() < MIN_STEP_NORM || improvement < 1e-14 * cost.max(1e-30) {
                break;
            }
        } else {
            damping *= 10.0;
            if damping > 1e12 {
                break;
            }
        }
    }

    let n = object.len().max(1) as f64;
    Refined {
        pose: pose_from_params(&x),
        rms_px: (cost / n).sqrt(),
        iterations,
    }
}
