//! Single-shot unwrap and score.
//!
//! [`unwrap_and_score`] is the path taken by interactive callers that re-run
//! the unwrap each time a parameter changes. With a [`ResultCache`] attached,
//! repeated requests for the same geometry and parameters skip the engine.

use crate::algo::metrics::{evaluate, MetricResult};
use crate::cache::{GeometrySignature, ResultCache};
use crate::engine::{UnwrapEngine, UnwrapParameters};
use crate::error::Result;
use crate::mesh::Mesh;

/// An unwrapped mesh with its scores.
#[derive(Debug, Clone)]
pub struct ScoredUnwrap {
    /// Copy of the input mesh with UVs attached.
    pub mesh: Mesh,
    pub metrics: MetricResult,
    /// Whether the result came from the cache.
    pub cached: bool,
}

/// Unwrap `mesh` with `engine` and compute all three metrics.
///
/// On a cache hit the engine is not called. On a miss the fresh result is
/// stored before returning.
///
/// # Errors
///
/// Engine failures and metric validation errors are returned unchanged.
pub fn unwrap_and_score<E: UnwrapEngine + ?Sized>(
    engine: &E,
    mesh: &Mesh,
    params: &UnwrapParameters,
    cache: Option<&ResultCache>,
    coverage_resolution: usize,
) -> Result<ScoredUnwrap> {
    let signature = cache.map(|_| GeometrySignature::from_mesh(mesh));

    if let (Some(cache), Some(signature)) = (cache, signature.as_ref()) {
        if let Some(hit) = cache.get(signature, params) {
            return Ok(ScoredUnwrap {
                mesh: mesh.clone().with_uvs(hit.uvs)?,
                metrics: hit.metrics,
                cached: true,
            });
        }
    }

    let output = engine.unwrap(mesh, params)?;
    let uvs = output.mesh.require_uvs()?;
    let metrics = evaluate(&output.mesh, uvs, output.stats.num_islands, coverage_resolution)?;

    if let (Some(cache), Some(signature)) = (cache, signature.as_ref()) {
        if let Some(uv_map) = output.mesh.uvs() {
            cache.put(signature, params, uv_map.clone(), metrics);
        }
    }

    Ok(ScoredUnwrap {
        mesh: output.mesh,
        metrics,
        cached: false,
    })
}
