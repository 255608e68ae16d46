//! Quality metrics for UV mappings.
//!
//! Three scores compare a UV mapping against the 3D surface it came from:
//!
//! - [`compute_stretch`]: worst ratio of the singular values of the per-triangle
//!   Jacobian. 1.0 means every triangle is mapped by a similarity.
//! - [`compute_coverage`]: fraction of the unit square covered by UV triangles,
//!   measured by rasterization.
//! - [`compute_angle_distortion`]: worst difference (radians) between a 3D corner
//!   angle and the matching UV corner angle.
//!
//! Triangles that are degenerate in UV space are skipped. A mapping in which
//! every triangle is skipped gets the neutral value (stretch 1.0, angle 0.0).
//!
//! All functions are pure and can run concurrently on independent inputs.
//!
//! # Example
//!
//! ```
//! use uvwrap::algo::metrics::{compute_angle_distortion, compute_stretch};
//! use uvwrap::mesh::Mesh;
//! use nalgebra::{Point2, Point3};
//!
//! let mesh = Mesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(2.0, 0.0, 0.0),
//!         Point3::new(0.0, 2.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap();
//! let uvs = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)];
//!
//! // Uniform scaling distorts neither shape nor angles
//! assert!((compute_stretch(&mesh, &uvs).unwrap() - 1.0).abs() < 1e-9);
//! assert!(compute_angle_distortion(&mesh, &uvs).unwrap() < 1e-9);
//! ```

use nalgebra::{Matrix2, Matrix3x2, Point2, Point3, SVector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, UvError};
use crate::mesh::Mesh;

/// Stretch reported for a triangle whose Jacobian has rank one.
///
/// The true value is unbounded. This is an arbitrary upper bound; callers
/// should only rely on it being far above any real stretch value.
pub const STRETCH_SENTINEL: f64 = 1e6;

/// Default rasterization resolution for [`compute_coverage`].
pub const DEFAULT_COVERAGE_RESOLUTION: usize = 1024;

const EPSILON: f64 = 1e-9;

/// The three quality scores of one UV mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Maximum per-triangle stretch, >= 1.0.
    pub stretch: f64,
    /// Covered fraction of the unit square, in [0, 1].
    pub coverage: f64,
    /// Maximum corner-angle difference in radians, >= 0.
    pub angle_distortion: f64,
    /// Island count as reported by the engine.
    pub num_islands: usize,
}

/// Compute all three metrics for `mesh` under `uvs`.
///
/// `num_islands` is not computed here; it is passed through from the engine.
pub fn evaluate(
    mesh: &Mesh,
    uvs: &[Point2<f64>],
    num_islands: usize,
    coverage_resolution: usize,
) -> Result<MetricResult> {
    Ok(MetricResult {
        stretch: compute_stretch(mesh, uvs)?,
        coverage: compute_coverage(uvs, mesh.triangles(), coverage_resolution)?,
        angle_distortion: compute_angle_distortion(mesh, uvs)?,
        num_islands,
    })
}

/// Stretch of a single triangle, or `None` if it is degenerate in UV space.
///
/// The Jacobian `J = [dp1 | dp2] · [duv1 | duv2]⁻¹` maps UV deltas to 3D deltas.
/// Its singular values are the square roots of the eigenvalues of `JᵀJ`,
/// taken in closed form so they come out ordered.
pub fn triangle_stretch(p: [Point3<f64>; 3], uv: [Point2<f64>; 3]) -> Option<f64> {
    let s = Matrix2::from_columns(&[uv[1] - uv[0], uv[2] - uv[0]]);
    if s.determinant().abs() < EPSILON {
        return None;
    }
    let s_inv = s.try_inverse()?;
    let q = Matrix3x2::from_columns(&[p[1] - p[0], p[2] - p[0]]);
    let j = q * s_inv;

    let g = j.transpose() * j;
    let (a, b, c) = (g[(0, 0)], g[(0, 1)], g[(1, 1)]);
    let mean = 0.5 * (a + c);
    let radius = (0.25 * (a - c) * (a - c) + b * b).sqrt();
    let sigma_max = (mean + radius).max(0.0).sqrt();
    let sigma_min = (mean - radius).max(0.0).sqrt();

    let stretch = if sigma_min > EPSILON {
        sigma_max / sigma_min
    } else if sigma_max <= EPSILON {
        1.0
    } else {
        STRETCH_SENTINEL
    };
    Some(stretch)
}

/// Per-triangle stretch values for every triangle that is not degenerate in UV space.
pub fn triangle_stretches(mesh: &Mesh, uvs: &[Point2<f64>]) -> Result<Vec<f64>> {
    check_uv_count(mesh, uvs)?;
    Ok(mesh
        .triangles()
        .iter()
        .enumerate()
        .filter_map(|(f, t)| {
            triangle_stretch(mesh.triangle_positions(f), [uvs[t[0]], uvs[t[1]], uvs[t[2]]])
        })
        .collect())
}

/// Maximum stretch over all triangles.
///
/// Returns 1.0 when every triangle is degenerate in UV space.
///
/// # Errors
///
/// [`UvError::UvCountMismatch`] if `uvs` does not have one entry per vertex.
pub fn compute_stretch(mesh: &Mesh, uvs: &[Point2<f64>]) -> Result<f64> {
    Ok(triangle_stretches(mesh, uvs)?
        .into_iter()
        .fold(1.0, f64::max))
}

/// Fraction of the unit square covered by the UV triangles.
///
/// Rasterizes every triangle into a `resolution` x `resolution` occupancy grid
/// over `[0, 1]²`, testing pixel centers with barycentric coordinates.
/// Anything outside the unit square is clipped. Cost grows with
/// `resolution²` per triangle bounding box.
///
/// # Errors
///
/// - [`UvError::InvalidParameter`] if `resolution` is 0
/// - [`UvError::InvalidVertexIndex`] if a triangle indexes past `uvs`
pub fn compute_coverage(
    uvs: &[Point2<f64>],
    triangles: &[[usize; 3]],
    resolution: usize,
) -> Result<f64> {
    if resolution == 0 {
        return Err(UvError::invalid_param("resolution", resolution, "must be > 0"));
    }

    let mut grid = vec![false; resolution * resolution];
    let scale = resolution as f64;

    for (face, tri) in triangles.iter().enumerate() {
        if let Some(&vertex) = tri.iter().find(|&&v| v >= uvs.len()) {
            return Err(UvError::InvalidVertexIndex { face, vertex });
        }
        let t0 = uvs[tri[0]].coords * scale;
        let t1 = uvs[tri[1]].coords * scale;
        let t2 = uvs[tri[2]].coords * scale;

        let e0 = t1 - t0;
        let e1 = t2 - t0;
        let d00 = e0.dot(&e0);
        let d01 = e0.dot(&e1);
        let d11 = e1.dot(&e1);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() < EPSILON {
            continue;
        }
        let inv_denom = 1.0 / denom;

        let min_x = t0.x.min(t1.x).min(t2.x).floor().max(0.0) as usize;
        let max_x = t0.x.max(t1.x).max(t2.x).ceil().min(scale) as usize;
        let min_y = t0.y.min(t1.y).min(t2.y).floor().max(0.0) as usize;
        let max_y = t0.y.max(t1.y).max(t2.y).ceil().min(scale) as usize;

        for y in min_y..max_y {
            let row = &mut grid[y * resolution..(y + 1) * resolution];
            for (x, cell) in row.iter_mut().enumerate().take(max_x).skip(min_x) {
                if *cell {
                    continue;
                }
                let p = SVector::<f64, 2>::new(x as f64 + 0.5, y as f64 + 0.5) - t0;
                let d20 = p.dot(&e0);
                let d21 = p.dot(&e1);
                let v = (d11 * d20 - d01 * d21) * inv_denom;
                let w = (d00 * d21 - d01 * d20) * inv_denom;
                let u = 1.0 - v - w;
                if u >= 0.0 && v >= 0.0 && w >= 0.0 {
                    *cell = true;
                }
            }
        }
    }

    let covered = grid.iter().filter(|&&c| c).count();
    Ok(covered as f64 / (resolution * resolution) as f64)
}

/// Maximum difference between a 3D corner angle and its UV counterpart, in radians.
///
/// Corners adjacent to a zero-length edge count as angle 0. Returns 0.0 for
/// a mesh without triangles.
///
/// # Errors
///
/// [`UvError::UvCountMismatch`] if `uvs` does not have one entry per vertex.
pub fn compute_angle_distortion(mesh: &Mesh, uvs: &[Point2<f64>]) -> Result<f64> {
    check_uv_count(mesh, uvs)?;

    let mut max_distortion = 0.0_f64;
    for (f, t) in mesh.triangles().iter().enumerate() {
        let [p0, p1, p2] = mesh.triangle_positions(f);
        let angles_3d = corner_angles([p0.coords, p1.coords, p2.coords]);
        let angles_uv = corner_angles([uvs[t[0]].coords, uvs[t[1]].coords, uvs[t[2]].coords]);

        for (a3, a2) in angles_3d.iter().zip(&angles_uv) {
            max_distortion = max_distortion.max((a3 - a2).abs());
        }
    }
    Ok(max_distortion)
}

/// Interior angles at each corner of a triangle in any dimension.
fn corner_angles<const D: usize>(corners: [SVector<f64, D>; 3]) -> [f64; 3] {
    std::array::from_fn(|i| {
        let a = corners[i];
        let b = corners[(i + 1) % 3];
        let c = corners[(i + 2) % 3];
        angle_between(&(b - a), &(c - a))
    })
}

fn angle_between<const D: usize>(u: &SVector<f64, D>, v: &SVector<f64, D>) -> f64 {
    let nu = u.norm();
    let nv = v.norm();
    if nu < EPSILON || nv < EPSILON {
        return 0.0;
    }
    (u.dot(v) / (nu * nv)).clamp(-1.0, 1.0).acos()
}

fn check_uv_count(mesh: &Mesh, uvs: &[Point2<f64>]) -> Result<()> {
    if uvs.len() != mesh.num_vertices() {
        return Err(UvError::UvCountMismatch {
            expected: mesh.num_vertices(),
            found: uvs.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{grid, unit_cube, unit_square};
    use nalgebra::{Rotation3, Unit, Vector3};
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn single_triangle(p: [Point3<f64>; 3]) -> Mesh {
        Mesh::new(p.to_vec(), vec![[0, 1, 2]]).unwrap()
    }

    fn reference_uvs() -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.3, 0.8),
        ]
    }

    /// Embed the reference UV triangle in 3D with rotation, scale, and offset.
    fn similar_triangle(scale: f64) -> Mesh {
        let axis = Unit::new_normalize(Vector3::new(1.0, 2.0, 0.5));
        let rotation = Rotation3::from_axis_angle(&axis, 0.7);
        let offset = Vector3::new(3.0, -1.0, 2.0);
        let p: Vec<_> = reference_uvs()
            .iter()
            .map(|uv| rotation * Point3::new(uv.x * scale, uv.y * scale, 0.0) + offset)
            .collect();
        single_triangle([p[0], p[1], p[2]])
    }

    #[test]
    fn test_stretch_is_one_for_similarity() {
        for scale in [0.01, 1.0, 7.5] {
            let mesh = similar_triangle(scale);
            let stretch = compute_stretch(&mesh, &reference_uvs()).unwrap();
            assert!((stretch - 1.0).abs() < 1e-6, "scale {}: stretch {}", scale, stretch);
        }
    }

    #[test]
    fn test_stretch_anisotropic_scale() {
        let mesh = grid(2);
        let uvs: Vec<_> = mesh
            .positions()
            .iter()
            .map(|p| Point2::new(2.0 * p.x, p.y))
            .collect();

        let stretch = compute_stretch(&mesh, &uvs).unwrap();
        assert!((stretch - 2.0).abs() < 1e-9);

        // Shrinking instead of stretching gives the same ratio
        let uvs: Vec<_> = mesh
            .positions()
            .iter()
            .map(|p| Point2::new(0.5 * p.x, p.y))
            .collect();
        let stretch = compute_stretch(&mesh, &uvs).unwrap();
        assert!((stretch - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_stretch_all_degenerate_is_neutral() {
        let mesh = grid(2);
        let uvs = vec![Point2::new(0.5, 0.5); mesh.num_vertices()];
        assert_eq!(compute_stretch(&mesh, &uvs).unwrap(), 1.0);
        assert!(triangle_stretches(&mesh, &uvs).unwrap().is_empty());
    }

    #[test]
    fn test_stretch_collapsed_surface() {
        // Collinear in 3D: the Jacobian has rank one
        let collinear = single_triangle([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ]);
        let stretch = compute_stretch(&collinear, &reference_uvs()).unwrap();
        assert_eq!(stretch, STRETCH_SENTINEL);

        // Collapsed to a point: rank zero, harmless
        let point = single_triangle([Point3::new(1.0, 1.0, 1.0); 3]);
        assert_eq!(compute_stretch(&point, &reference_uvs()).unwrap(), 1.0);
    }

    #[test]
    fn test_stretch_uv_count_mismatch() {
        let mesh = grid(1);
        let err = compute_stretch(&mesh, &reference_uvs()).unwrap_err();
        assert!(matches!(
            err,
            UvError::UvCountMismatch {
                expected: 4,
                found: 3
            }
        ));
    }

    #[test]
    fn test_coverage_full_square() {
        let square = unit_square();
        let uvs = square.require_uvs().unwrap();
        for resolution in [256, 512] {
            let coverage = compute_coverage(uvs, square.triangles(), resolution).unwrap();
            assert!(coverage > 0.99 && coverage <= 1.0, "coverage {}", coverage);
        }
    }

    #[test]
    fn test_coverage_half_square() {
        let uvs = reference_uvs();
        let uvs = [uvs[0], uvs[1], Point2::new(1.0, 1.0)];
        let coverage = compute_coverage(&uvs, &[[0, 1, 2]], 256).unwrap();
        assert!((coverage - 0.5).abs() < 0.01, "coverage {}", coverage);
    }

    #[test]
    fn test_coverage_overlap_and_outside() {
        let square = unit_square();
        let uvs = square.require_uvs().unwrap();

        // Same triangles twice still cover the square once
        let doubled: Vec<_> = square.triangles().iter().chain(square.triangles()).copied().collect();
        let coverage = compute_coverage(uvs, &doubled, 128).unwrap();
        assert!(coverage <= 1.0);

        let shifted: Vec<_> = uvs.iter().map(|uv| Point2::new(uv.x + 2.0, uv.y - 3.0)).collect();
        assert_eq!(compute_coverage(&shifted, square.triangles(), 128).unwrap(), 0.0);

        // Partly outside: only the inside part counts
        let straddling: Vec<_> = uvs.iter().map(|uv| Point2::new(uv.x + 0.5, uv.y)).collect();
        let coverage = compute_coverage(&straddling, square.triangles(), 256).unwrap();
        assert!((coverage - 0.5).abs() < 0.01, "coverage {}", coverage);
    }

    #[test]
    fn test_coverage_skips_degenerate_and_validates() {
        let uvs = vec![Point2::new(0.2, 0.2); 3];
        assert_eq!(compute_coverage(&uvs, &[[0, 1, 2]], 64).unwrap(), 0.0);

        assert!(matches!(
            compute_coverage(&uvs, &[[0, 1, 2]], 0),
            Err(UvError::InvalidParameter { .. })
        ));
        assert!(matches!(
            compute_coverage(&uvs, &[[0, 1, 3]], 64),
            Err(UvError::InvalidVertexIndex { face: 0, vertex: 3 })
        ));
    }

    #[test]
    fn test_angle_distortion_zero_for_similarity() {
        let mesh = similar_triangle(4.0);
        let distortion = compute_angle_distortion(&mesh, &reference_uvs()).unwrap();
        assert!(distortion < 1e-6, "distortion {}", distortion);
    }

    #[test]
    fn test_angle_distortion_detects_shear() {
        let mesh = unit_square();
        let sheared: Vec<_> = mesh
            .positions()
            .iter()
            .map(|p| Point2::new(p.x + 0.5 * p.y, p.y))
            .collect();

        let distortion = compute_angle_distortion(&mesh, &sheared).unwrap();
        assert!(distortion > 0.1);
    }

    #[test]
    fn test_angle_distortion_degenerate_edges() {
        // Right isoceles triangle collapsed to a point in UV space
        let mesh = single_triangle([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]);
        let uvs = vec![Point2::new(0.5, 0.5); 3];
        let distortion = compute_angle_distortion(&mesh, &uvs).unwrap();
        assert!((distortion - FRAC_PI_2).abs() < 1e-9);

        // And the other corners contribute their full angle
        let angles = corner_angles([
            mesh.positions()[0].coords,
            mesh.positions()[1].coords,
            mesh.positions()[2].coords,
        ]);
        assert!((angles[1] - FRAC_PI_4).abs() < 1e-9);
    }

    #[test]
    fn test_angle_distortion_no_triangles() {
        let mesh = Mesh::new(vec![Point3::origin()], Vec::new()).unwrap();
        let uvs = vec![Point2::origin()];
        assert_eq!(compute_angle_distortion(&mesh, &uvs).unwrap(), 0.0);
        assert_eq!(compute_stretch(&mesh, &uvs).unwrap(), 1.0);
    }

    #[test]
    fn test_evaluate_cube_fixture() {
        let cube = unit_cube();
        let result = evaluate(&cube, cube.require_uvs().unwrap(), 1, 256).unwrap();

        assert!(result.stretch >= 1.0 && result.stretch <= 2.0);
        assert!(result.coverage > 0.0 && result.coverage <= 1.0);
        assert!(result.angle_distortion >= 0.0);
        assert_eq!(result.num_islands, 1);
    }
}
