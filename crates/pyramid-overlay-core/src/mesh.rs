//! Index-based unit cube mesh shared by every block of a structure.
//!
//! Vertex order is fixed: the bottom ring `(0,0,0) (1,0,0) (1,1,0) (0,1,0)`
//! followed by the top ring with `z = 1`. Edge and face tables index into
//! that order, so they stay valid for any translated or scaled copy.

/// Number of vertices per cube.
pub const CUBE_VERTEX_COUNT: usize = 8;

/// Canonical unit cube vertex offsets.
pub const CUBE_VERTICES: [[f64; 3]; CUBE_VERTEX_COUNT] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 1.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 1.0],
    [1.0, 1.0, 1.0],
    [0.0, 1.0, 1.0],
];

/// The 12 cube edges: bottom ring, top ring, verticals.
pub const CUBE_EDGES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// The 6 cube faces in draw order: bottom, top, then the four sides.
///
/// There is no depth sorting downstream, so this order is the only occlusion
/// heuristic the compositor has.
pub const CUBE_FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

/// Borrowed view over the cube tables, handed to the compositor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitCubeMesh {
    pub vertices: &'static [[f64; 3]; CUBE_VERTEX_COUNT],
    pub edges: &'static [(usize, usize)],
    pub faces: &'static [[usize; 4]],
}

impl UnitCubeMesh {
    pub const CANONICAL: UnitCubeMesh = UnitCubeMesh {
        vertices: &CUBE_VERTICES,
        edges: &CUBE_EDGES,
        faces: &CUBE_FACES,
    };

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

impl Default for UnitCubeMesh {
    fn default() -> Self {
        Self::CANONICAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_have_unit_length() {
        for &(a, b) in CUBE_EDGES.iter() {
            let pa = CUBE_VERTICES[a];
            let pb = CUBE_VERTICES[b];
            let d2: f64 = (0..3).map(|k| (pa[k] - pb[k]).powi(2)).sum();
            assert_eq!(d2, 1.0, "edge ({a}, {b}) is not a cube edge");
        }
    }

    #[test]
    fn faces_are_planar_quads_of_edges() {
        for face in CUBE_FACES.iter() {
            for k in 0..4 {
                let a = face[k];
                let b = face[(k + 1) % 4];
                let is_edge = CUBE_EDGES
                    .iter()
                    .any(|&(u, v)| (u, v) == (a, b) || (v, u) == (a, b));
                assert!(is_edge, "face {face:?} side ({a}, {b}) is not an edge");
            }
        }
    }

    #[test]
    fn bottom_and_top_are_drawn_first() {
        assert!(CUBE_FACES[0].iter().all(|&i| CUBE_VERTICES[i][2] == 0.0));
        assert!(CUBE_FACES[1].iter().all(|&i| CUBE_VERTICES[i][2] == 1.0));
    }

    #[test]
    fn every_vertex_has_three_edges() {
        for v in 0..CUBE_VERTEX_COUNT {
            let degree = CUBE_EDGES.iter().filter(|&&(a, b)| a == v || b == v).count();
            assert_eq!(degree, 3);
        }
    }
}
