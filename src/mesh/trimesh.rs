//! Indexed triangle mesh with optional per-vertex UVs.

use std::collections::HashSet;

use nalgebra::{Point2, Point3};

use super::uv::UVMap;
use crate::error::{Result, UvError};

/// An indexed triangle mesh.
///
/// Triangles are the only connectivity. Every index is checked against the
/// vertex count on construction, and UVs, when present, always hold exactly
/// one coordinate per vertex. Meshes handed to the rest of the crate are
/// never mutated; engines return new meshes instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    positions: Vec<Point3<f64>>,
    triangles: Vec<[usize; 3]>,
    uvs: Option<UVMap>,
}

impl Mesh {
    /// Build a mesh from vertex positions and triangle indices.
    ///
    /// Triangles with repeated indices are accepted; they are degenerate and
    /// the metrics skip them.
    ///
    /// # Example
    /// ```
    /// use uvwrap::mesh::Mesh;
    /// use nalgebra::Point3;
    ///
    /// let mesh = Mesh::new(
    ///     vec![
    ///         Point3::new(0.0, 0.0, 0.0),
    ///         Point3::new(1.0, 0.0, 0.0),
    ///         Point3::new(0.5, 1.0, 0.0),
    ///     ],
    ///     vec![[0, 1, 2]],
    /// )
    /// .unwrap();
    /// assert_eq!(mesh.num_triangles(), 1);
    /// ```
    pub fn new(positions: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> Result<Self> {
        validate_indices(&triangles, positions.len())?;
        Ok(Self {
            positions,
            triangles,
            uvs: None,
        })
    }

    /// Attach UV coordinates, replacing any existing ones.
    pub fn with_uvs(mut self, uvs: impl Into<UVMap>) -> Result<Self> {
        let uvs = uvs.into();
        if uvs.len() != self.positions.len() {
            return Err(UvError::UvCountMismatch {
                expected: self.positions.len(),
                found: uvs.len(),
            });
        }
        self.uvs = Some(uvs);
        Ok(self)
    }

    /// Drop the UV coordinates.
    pub fn without_uvs(mut self) -> Self {
        self.uvs = None;
        self
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Vertex positions.
    #[inline]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// Triangle vertex indices.
    #[inline]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// UV coordinates, if any.
    #[inline]
    pub fn uvs(&self) -> Option<&UVMap> {
        self.uvs.as_ref()
    }

    /// UV coordinates as a slice, or [`UvError::MissingUvs`].
    pub fn require_uvs(&self) -> Result<&[Point2<f64>]> {
        self.uvs
            .as_ref()
            .map(UVMap::as_slice)
            .ok_or(UvError::MissingUvs)
    }

    /// Whether the mesh carries UV coordinates.
    #[inline]
    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// The three corner positions of a triangle.
    #[inline]
    pub fn triangle_positions(&self, face: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangles[face];
        [self.positions[a], self.positions[b], self.positions[c]]
    }

    /// Unique undirected edges, each as `[lo, hi]`, sorted.
    pub fn unique_edges(&self) -> Vec<[usize; 2]> {
        let mut seen: HashSet<[usize; 2]> = HashSet::with_capacity(self.triangles.len() * 3 / 2);
        for tri in &self.triangles {
            for i in 0..3 {
                let (a, b) = (tri[i], tri[(i + 1) % 3]);
                if a != b {
                    seen.insert([a.min(b), a.max(b)]);
                }
            }
        }
        let mut edges: Vec<_> = seen.into_iter().collect();
        edges.sort_unstable();
        edges
    }

    /// Axis-aligned bounding box of the vertex positions.
    ///
    /// Returns `None` if the mesh has no vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.positions.first()?;
        let mut min = first;
        let mut max = first;
        for p in &self.positions {
            min = min.inf(p);
            max = max.sup(p);
        }
        Some((min, max))
    }
}

fn validate_indices(triangles: &[[usize; 3]], num_vertices: usize) -> Result<()> {
    for (face, tri) in triangles.iter().enumerate() {
        if let Some(&vertex) = tri.iter().find(|&&v| v >= num_vertices) {
            return Err(UvError::InvalidVertexIndex { face, vertex });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{unit_cube, unit_square};

    #[test]
    fn test_rejects_out_of_range_index() {
        let positions = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        let err = Mesh::new(positions, vec![[0, 1, 2]]).unwrap_err();
        match err {
            UvError::InvalidVertexIndex { face, vertex } => {
                assert_eq!(face, 0);
                assert_eq!(vertex, 2);
            }
            e => panic!("Expected InvalidVertexIndex, got {:?}", e),
        }
    }

    #[test]
    fn test_accepts_empty_and_degenerate_triangles() {
        let positions = vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)];
        assert!(Mesh::new(positions.clone(), Vec::new()).is_ok());
        assert!(Mesh::new(positions, vec![[0, 1, 1]]).is_ok());
    }

    #[test]
    fn test_uv_count_must_match() {
        let mesh = unit_square();
        let err = mesh.clone().with_uvs(UVMap::zeros(3)).unwrap_err();
        assert!(matches!(
            err,
            UvError::UvCountMismatch {
                expected: 4,
                found: 3
            }
        ));
        assert!(mesh.with_uvs(UVMap::zeros(4)).unwrap().has_uvs());
    }

    #[test]
    fn test_unique_edges_cube() {
        let cube = unit_cube();
        assert_eq!(cube.num_vertices(), 8);
        assert_eq!(cube.num_triangles(), 12);
        // 12 box edges plus one diagonal per face
        assert_eq!(cube.unique_edges().len(), 18);
    }

    #[test]
    fn test_bounding_box() {
        let (min, max) = unit_cube().bounding_box().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_require_uvs() {
        let mesh = unit_square().without_uvs();
        assert!(matches!(mesh.require_uvs(), Err(UvError::MissingUvs)));
    }
}
