//! The unwrap engine contract.
//!
//! The parameterization algorithm itself lives outside this crate. Everything
//! here talks to it through [`UnwrapEngine`]: a mesh and an
//! [`UnwrapParameters`] value go in, a mesh with UVs and summary
//! [`UnwrapStats`] come out, or an [`UvError::EngineFailure`] with the
//! engine's status code.
//!
//! [`ProjectionEngine`] is a small built-in implementation, good enough for
//! the CLI and for tests.
//!
//! # Example
//!
//! ```
//! use uvwrap::engine::{ProjectionEngine, UnwrapEngine, UnwrapParameters};
//! use uvwrap::mesh::Mesh;
//! use nalgebra::Point3;
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
//!
//! let output = ProjectionEngine.unwrap(&mesh, &UnwrapParameters::default()).unwrap();
//! assert!(output.mesh.has_uvs());
//! assert_eq!(output.stats.num_islands, 1);
//! ```

mod projection;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UvError};
use crate::mesh::Mesh;

pub use projection::{ProjectionEngine, EMPTY_MESH_CODE, INVALID_PARAMS_CODE};

/// Parameters passed to the unwrap engine.
///
/// This value is also part of the result-cache fingerprint, so every field
/// matters for cache identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnwrapParameters {
    /// Dihedral angle (degrees) above which an edge becomes a seam candidate.
    pub angle_threshold: f64,

    /// Islands with fewer faces than this are merged into neighbours.
    pub min_island_faces: usize,

    /// Whether to pack islands into the unit square.
    pub pack_islands: bool,

    /// Gap left around packed islands, in UV units.
    pub island_margin: f64,
}

impl Default for UnwrapParameters {
    fn default() -> Self {
        Self {
            angle_threshold: 30.0,
            min_island_faces: 10,
            pack_islands: true,
            island_margin: 0.02,
        }
    }
}

impl UnwrapParameters {
    /// Set the seam angle threshold in degrees.
    pub fn with_angle_threshold(mut self, degrees: f64) -> Self {
        self.angle_threshold = degrees;
        self
    }

    /// Set the minimum island size in faces.
    pub fn with_min_island_faces(mut self, faces: usize) -> Self {
        self.min_island_faces = faces;
        self
    }

    /// Enable or disable island packing.
    pub fn with_pack_islands(mut self, pack: bool) -> Self {
        self.pack_islands = pack;
        self
    }

    /// Set the island margin.
    pub fn with_island_margin(mut self, margin: f64) -> Self {
        self.island_margin = margin;
        self
    }

    /// Check that every field is in range.
    pub fn validate(&self) -> Result<()> {
        if !self.angle_threshold.is_finite() {
            return Err(UvError::invalid_param(
                "angle_threshold",
                self.angle_threshold,
                "must be finite",
            ));
        }
        if !self.island_margin.is_finite() || self.island_margin < 0.0 {
            return Err(UvError::invalid_param(
                "island_margin",
                self.island_margin,
                "must be a finite value >= 0",
            ));
        }
        Ok(())
    }
}

/// Summary statistics reported by the engine alongside the UVs.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UnwrapStats {
    /// Number of UV islands produced.
    pub num_islands: usize,
    /// Mean per-triangle stretch.
    pub avg_stretch: f64,
    /// Largest per-triangle stretch.
    pub max_stretch: f64,
    /// Fraction of the unit square covered.
    pub coverage: f64,
}

/// What a successful unwrap returns.
#[derive(Debug, Clone)]
pub struct UnwrapOutput {
    /// Copy of the input mesh with UVs attached.
    pub mesh: Mesh,
    /// Engine-side statistics.
    pub stats: UnwrapStats,
}

/// An external UV unwrapping engine.
///
/// Implementations must be callable from several worker threads at once;
/// the batch scheduler shares one engine across its pool.
pub trait UnwrapEngine: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str {
        "engine"
    }

    /// Unwrap `mesh` with `params`.
    ///
    /// Must not modify the input. Non-success statuses are reported as
    /// [`UvError::EngineFailure`].
    fn unwrap(&self, mesh: &Mesh, params: &UnwrapParameters) -> Result<UnwrapOutput>;
}

impl<T: UnwrapEngine + ?Sized> UnwrapEngine for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn unwrap(&self, mesh: &Mesh, params: &UnwrapParameters) -> Result<UnwrapOutput> {
        (**self).unwrap(mesh, params)
    }
}

impl<T: UnwrapEngine + ?Sized> UnwrapEngine for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn unwrap(&self, mesh: &Mesh, params: &UnwrapParameters) -> Result<UnwrapOutput> {
        (**self).unwrap(mesh, params)
    }
}

impl<T: UnwrapEngine + ?Sized> UnwrapEngine for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn unwrap(&self, mesh: &Mesh, params: &UnwrapParameters) -> Result<UnwrapOutput> {
        (**self).unwrap(mesh, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let p = UnwrapParameters::default();
        assert_eq!(p.angle_threshold, 30.0);
        assert_eq!(p.min_island_faces, 10);
        assert!(p.pack_islands);
        assert_eq!(p.island_margin, 0.02);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_margin() {
        let p = UnwrapParameters::default().with_island_margin(-0.1);
        assert!(matches!(
            p.validate(),
            Err(UvError::InvalidParameter {
                name: "island_margin",
                ..
            })
        ));

        let p = UnwrapParameters::default().with_angle_threshold(f64::NAN);
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_parameters_as_flat_record() {
        let p = UnwrapParameters::default()
            .with_angle_threshold(40.0)
            .with_min_island_faces(20);
        let json = serde_json::to_value(p).unwrap();

        assert_eq!(json["angle_threshold"], 40.0);
        assert_eq!(json["min_island_faces"], 20);
        assert_eq!(json["pack_islands"], true);

        // Missing keys fall back to defaults
        let partial: UnwrapParameters =
            serde_json::from_str(r#"{"angle_threshold": 50.0}"#).unwrap();
        assert_eq!(partial.angle_threshold, 50.0);
        assert_eq!(partial.min_island_faces, 10);
    }
}
