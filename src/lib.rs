//! # uvwrap
//!
//! Quality scoring, parameter search, and batch processing for UV unwrapping.
//!
//! The unwrap algorithm itself sits behind the [`engine::UnwrapEngine`]
//! trait. This crate supplies everything around it:
//!
//! - **Metrics**: stretch, coverage, and angle distortion of any UV mapping
//! - **Optimizer**: grid search over engine parameters for the best score
//! - **Batch**: concurrent unwrap + score + save over many files with progress
//!   reporting and per-file failure isolation
//! - **Cache**: time-bounded memoization keyed by geometry and parameters
//! - **I/O**: OBJ, STL, and PLY loading and saving
//!
//! ## Quick Start
//!
//! ```no_run
//! use uvwrap::prelude::*;
//!
//! let mesh = uvwrap::io::load("model.obj").unwrap();
//! let params = UnwrapParameters::default().with_angle_threshold(40.0);
//!
//! let scored = unwrap_and_score(&ProjectionEngine, &mesh, &params, None, 1024).unwrap();
//! println!("stretch: {:.3}", scored.metrics.stretch);
//! println!("coverage: {:.1}%", scored.metrics.coverage * 100.0);
//!
//! uvwrap::io::save(&scored.mesh, "model_unwrapped.obj").unwrap();
//! ```
//!
//! ## Scoring Existing UVs
//!
//! ```
//! use uvwrap::prelude::*;
//! use nalgebra::{Point2, Point3};
//!
//! let mesh = Mesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(1.0, 1.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2], [0, 2, 3]],
//! )
//! .unwrap();
//! let uvs: Vec<_> = mesh.positions().iter().map(|p| Point2::new(p.x, p.y)).collect();
//!
//! let metrics = evaluate(&mesh, &uvs, 1, 256).unwrap();
//! assert!((metrics.stretch - 1.0).abs() < 1e-9);
//! assert!(metrics.coverage > 0.99);
//! ```

#![warn(clippy::all)]

pub mod algo;
pub mod batch;
pub mod cache;
pub mod engine;
pub mod error;
pub mod io;
pub mod mesh;

#[cfg(test)]
mod test_utils;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use uvwrap::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::metrics::{
        compute_angle_distortion, compute_coverage, compute_stretch, evaluate, MetricResult,
    };
    pub use crate::algo::optimize::{optimize, OptimizeOptions, ParameterGrid, TargetMetric};
    pub use crate::algo::pipeline::{unwrap_and_score, ScoredUnwrap};
    pub use crate::algo::progress::Progress;
    pub use crate::batch::{BatchOptions, BatchReport, BatchScheduler};
    pub use crate::cache::{GeometrySignature, ResultCache};
    pub use crate::engine::{ProjectionEngine, UnwrapEngine, UnwrapParameters};
    pub use crate::error::{Result, UvError};
    pub use crate::io::{FileIo, MeshIo};
    pub use crate::mesh::{Mesh, UVMap};
}

// Re-export nalgebra types for convenience
pub use nalgebra;
