//! Planar projection engine.

use nalgebra::Point2;

use super::{UnwrapEngine, UnwrapOutput, UnwrapParameters, UnwrapStats};
use crate::algo::metrics::{compute_coverage, triangle_stretches};
use crate::error::{Result, UvError};
use crate::mesh::{Mesh, UVMap};

/// Engine status for a mesh without triangles.
pub const EMPTY_MESH_CODE: i32 = 1;

/// Engine status for parameters that fail validation.
pub const INVALID_PARAMS_CODE: i32 = 2;

/// Resolution used for the coverage figure in [`UnwrapStats`].
const STATS_COVERAGE_RESOLUTION: usize = 256;

/// Projects the mesh onto the plane of its two largest bounding-box extents.
///
/// There is no seam cutting, so `angle_threshold` and `min_island_faces`
/// have no effect. Islands are the connected triangle components. With
/// `pack_islands` the projection is fitted into
/// `[island_margin, 1 - island_margin]²`, otherwise into `[0, 1]²`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionEngine;

impl UnwrapEngine for ProjectionEngine {
    fn name(&self) -> &str {
        "projection"
    }

    fn unwrap(&self, mesh: &Mesh, params: &UnwrapParameters) -> Result<UnwrapOutput> {
        params
            .validate()
            .map_err(|e| UvError::engine(INVALID_PARAMS_CODE, e.to_string()))?;

        if mesh.num_triangles() == 0 {
            return Err(UvError::engine(EMPTY_MESH_CODE, "mesh has no triangles"));
        }

        let (min, max) = mesh
            .bounding_box()
            .ok_or_else(|| UvError::engine(EMPTY_MESH_CODE, "mesh has no vertices"))?;
        let extent = max - min;

        // Stable sort keeps x before y before z on ties
        let mut axes = [0usize, 1, 2];
        axes.sort_by(|&a, &b| extent[b].total_cmp(&extent[a]));
        let (u_axis, v_axis) = (axes[0], axes[1]);

        let mut uvs = UVMap::new(
            mesh.positions()
                .iter()
                .map(|p| Point2::new(p[u_axis], p[v_axis]))
                .collect(),
        );
        if params.pack_islands {
            uvs.fit_into_margin(params.island_margin);
        } else {
            uvs.normalize();
        }

        let stretches = triangle_stretches(mesh, uvs.as_slice())?;
        let (avg_stretch, max_stretch) = if stretches.is_empty() {
            (1.0, 1.0)
        } else {
            let sum: f64 = stretches.iter().sum();
            let max = stretches.iter().copied().fold(1.0, f64::max);
            (sum / stretches.len() as f64, max)
        };

        let coverage = compute_coverage(uvs.as_slice(), mesh.triangles(), STATS_COVERAGE_RESOLUTION)?;

        let stats = UnwrapStats {
            num_islands: count_islands(mesh),
            avg_stretch,
            max_stretch,
            coverage,
        };

        log::debug!(
            "{}: {} vertices, {} islands, axes ({}, {})",
            self.name(),
            mesh.num_vertices(),
            stats.num_islands,
            u_axis,
            v_axis
        );

        Ok(UnwrapOutput {
            mesh: mesh.clone().with_uvs(uvs)?,
            stats,
        })
    }
}

/// Count connected triangle components (triangles sharing a vertex are connected).
fn count_islands(mesh: &Mesh) -> usize {
    let mut parent: Vec<usize> = (0..mesh.num_vertices()).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for t in mesh.triangles() {
        let r0 = find(&mut parent, t[0]);
        for &v in &t[1..] {
            let r = find(&mut parent, v);
            if r != r0 {
                parent[r] = r0;
            }
        }
    }

    let mut roots: Vec<usize> = mesh
        .triangles()
        .iter()
        .map(|t| find(&mut parent, t[0]))
        .collect();
    roots.sort_unstable();
    roots.dedup();
    roots.len()
}
