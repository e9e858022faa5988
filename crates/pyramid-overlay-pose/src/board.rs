//! Checkerboard geometry and detection-to-board correspondences.

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

/// Planar checkerboard fiducial.
///
/// `cols`/`rows` are **inner corner counts**. The board frame has x along
/// columns, y along rows and z = 0 on the board plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardLayout {
    pub cols: u32,
    pub rows: u32,
    pub cell_size: f64,
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self {
            cols: 8,
            rows: 6,
            cell_size: 0.03,
        }
    }
}

impl BoardLayout {
    pub fn is_valid(&self) -> bool {
        self.cols >= 2 && self.rows >= 2 && self.cell_size.is_finite() && self.cell_size > 0.0
    }

    pub fn corner_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Board-frame position of inner corner `(i, j)`, or `None` if outside
    /// the pattern.
    pub fn object_point(&self, i: i32, j: i32) -> Option<Point3<f64>> {
        let i_ok = u32::try_from(i).is_ok_and(|i| i < self.cols);
        let j_ok = u32::try_from(j).is_ok_and(|j| j < self.rows);
        if !(i_ok && j_ok) {
            return None;
        }
        Some(Point3::new(
            i as f64 * self.cell_size,
            j as f64 * self.cell_size,
            0.0,
        ))
    }

    /// All inner corners, row-major (`j` outer, `i` inner).
    pub fn object_points(&self) -> Vec<Point3<f64>> {
        (0..self.rows as i32)
            .flat_map(|j| (0..self.cols as i32).filter_map(move |i| self.object_point(i, j)))
            .collect()
    }

    /// Pair detected corners with board points.
    ///
    /// Corners carrying grid coordinates are matched by label; those without
    /// one, outside the pattern, or repeating an already-seen grid cell are
    /// dropped. A detection with no labels at all that lists exactly
    /// [`corner_count`](Self::corner_count) corners is taken as the full
    /// pattern in row-major order and paired positionally.
    pub fn correspondences(&self, corners: &[DetectedCorner]) -> Correspondences {
        if corners.len() == self.corner_count() && corners.iter().all(|c| c.grid.is_none()) {
            return Correspondences {
                object_points: self.object_points(),
                image_points: corners
                    .iter()
                    .map(|c| Point2::new(c.x as f64, c.y as f64))
                    .collect(),
            };
        }

        let mut seen = vec![false; self.corner_count()];
        let mut out = Correspondences::default();
        for c in corners {
            let Some([i, j]) = c.grid else {
                continue;
            };
            let Some(obj) = self.object_point(i, j) else {
                log::debug!("ignoring corner outside board at grid ({i}, {j})");
                continue;
            };
            let idx = j as usize * self.cols as usize + i as usize;
            if std::mem::replace(&mut seen[idx], true) {
                log::debug!("ignoring duplicate corner at grid ({i}, {j})");
                continue;
            }
            out.object_points.push(obj);
            out.image_points.push(Point2::new(c.x as f64, c.y as f64));
        }
        out
    }
}

/// Matched 3-D board points and 2-D image points, in the same order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Correspondences {
    pub object_points: Vec<Point3<f64>>,
    pub image_points: Vec<Point2<f64>>,
}

impl Correspondences {
    pub fn len(&self) -> usize {
        self.object_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_points.is_empty()
    }
}

/// One detected corner as written by chessboard detectors.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedCorner {
    pub x: f32,
    pub y: f32,
    /// Inner-corner grid coordinates `(i, j)` on the board.
    #[serde(default)]
    pub grid: Option<[i32; 2]>,
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

/// Detection report for one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(default)]
    pub kind: Option<String>,
    pub corners: Vec<DetectedCorner>,
}
