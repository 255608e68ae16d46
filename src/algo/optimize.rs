//! Grid search over unwrap parameters.
//!
//! The optimizer runs the engine once per point of a [`ParameterGrid`],
//! scores each result with one metric, and keeps the best. Candidates that
//! fail (engine error, metric error, or panic) are recorded and skipped; they
//! never abort the search.
//!
//! # Example
//!
//! ```
//! use uvwrap::algo::optimize::{optimize, OptimizeOptions, TargetMetric};
//! use uvwrap::engine::ProjectionEngine;
//! use uvwrap::mesh::Mesh;
//! use nalgebra::Point3;
//!
//! let mesh = Mesh::new(
//!     vec![
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 1.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap();
//!
//! let options = OptimizeOptions::default().with_coverage_resolution(128);
//! let result = optimize(&ProjectionEngine, &mesh, TargetMetric::Stretch, &options).unwrap();
//! assert!(result.best_params.is_some());
//! assert!((result.best_score - 1.0).abs() < 1e-9);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algo::metrics::{
    compute_angle_distortion, compute_coverage, compute_stretch, DEFAULT_COVERAGE_RESOLUTION,
};
use crate::algo::progress::Progress;
use crate::engine::{UnwrapEngine, UnwrapParameters};
use crate::error::{panic_message, Result, UvError};
use crate::io::MeshIo;
use crate::mesh::Mesh;

/// The metric a search optimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMetric {
    /// Minimize maximum stretch.
    Stretch,
    /// Maximize covered fraction of the unit square.
    Coverage,
    /// Minimize maximum angle distortion.
    AngleDistortion,
}

impl TargetMetric {
    pub const ALL: [TargetMetric; 3] = [
        TargetMetric::Stretch,
        TargetMetric::Coverage,
        TargetMetric::AngleDistortion,
    ];

    /// Whether larger scores are better.
    pub fn maximize(self) -> bool {
        matches!(self, TargetMetric::Coverage)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TargetMetric::Stretch => "stretch",
            TargetMetric::Coverage => "coverage",
            TargetMetric::AngleDistortion => "angle_distortion",
        }
    }

    /// Score reported when no candidate succeeded.
    pub fn worst_score(self) -> f64 {
        if self.maximize() {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        }
    }

    /// Strict comparison: equal scores are not an improvement.
    pub fn is_better(self, score: f64, than: f64) -> bool {
        if self.maximize() {
            score > than
        } else {
            score < than
        }
    }

    /// Compute this metric for an unwrapped mesh.
    pub fn score(self, mesh: &Mesh, coverage_resolution: usize) -> Result<f64> {
        let uvs = mesh.require_uvs()?;
        match self {
            TargetMetric::Stretch => compute_stretch(mesh, uvs),
            TargetMetric::Coverage => compute_coverage(uvs, mesh.triangles(), coverage_resolution),
            TargetMetric::AngleDistortion => compute_angle_distortion(mesh, uvs),
        }
    }
}

impl fmt::Display for TargetMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetMetric {
    type Err = UvError;

    fn from_str(s: &str) -> Result<Self> {
        TargetMetric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UvError::UnknownMetric(s.to_string()))
    }
}

/// The lattice of parameters to search.
///
/// Every combination of `angle_thresholds` x `min_island_faces` is tried,
/// angles in the outer loop, with packing enabled and a fixed margin.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGrid {
    pub angle_thresholds: Vec<f64>,
    pub min_island_faces: Vec<usize>,
    pub island_margin: f64,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            angle_thresholds: vec![20.0, 30.0, 40.0, 50.0],
            min_island_faces: vec![5, 10, 20, 50],
            island_margin: UnwrapParameters::default().island_margin,
        }
    }
}

impl ParameterGrid {
    /// Every grid point in search order.
    pub fn candidates(&self) -> Vec<UnwrapParameters> {
        self.angle_thresholds
            .iter()
            .flat_map(|&angle| {
                self.min_island_faces.iter().map(move |&faces| UnwrapParameters {
                    angle_threshold: angle,
                    min_island_faces: faces,
                    pack_islands: true,
                    island_margin: self.island_margin,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.angle_thresholds.len() * self.min_island_faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Options for [`optimize`].
#[derive(Debug, Clone)]
pub struct OptimizeOptions {
    pub grid: ParameterGrid,
    /// Resolution passed to [`compute_coverage`].
    pub coverage_resolution: usize,
    /// Evaluate candidates on the rayon pool. The winner is the same either way.
    pub parallel: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            grid: ParameterGrid::default(),
            coverage_resolution: DEFAULT_COVERAGE_RESOLUTION,
            parallel: true,
        }
    }
}

impl OptimizeOptions {
    pub fn with_grid(mut self, grid: ParameterGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_coverage_resolution(mut self, resolution: usize) -> Self {
        self.coverage_resolution = resolution;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// One evaluated grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub params: UnwrapParameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a parameter search.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationResult {
    pub target: TargetMetric,
    /// `None` when every candidate failed.
    pub best_params: Option<UnwrapParameters>,
    /// Best score, or [`TargetMetric::worst_score`] when every candidate failed.
    pub best_score: f64,
    /// Every candidate in grid order.
    pub candidates: Vec<Candidate>,
}

impl OptimizationResult {
    pub fn num_failed(&self) -> usize {
        self.candidates.iter().filter(|c| c.error.is_some()).count()
    }
}

/// Search the parameter grid for the best `target` score on `mesh`.
pub fn optimize<E: UnwrapEngine + ?Sized>(
    engine: &E,
    mesh: &Mesh,
    target: TargetMetric,
    options: &OptimizeOptions,
) -> Result<OptimizationResult> {
    optimize_with_progress(engine, mesh, target, options, &Progress::none())
}

/// [`optimize`] with a progress callback invoked once per evaluated candidate.
///
/// # Errors
///
/// [`UvError::InvalidParameter`] if `coverage_resolution` is 0. Per-candidate
/// failures are not errors; they are recorded in
/// [`OptimizationResult::candidates`].
pub fn optimize_with_progress<E: UnwrapEngine + ?Sized>(
    engine: &E,
    mesh: &Mesh,
    target: TargetMetric,
    options: &OptimizeOptions,
    progress: &Progress,
) -> Result<OptimizationResult> {
    if options.coverage_resolution == 0 {
        return Err(UvError::invalid_param(
            "coverage_resolution",
            options.coverage_resolution,
            "must be > 0",
        ));
    }

    let grid = options.grid.candidates();
    let total = grid.len();
    let completed = AtomicUsize::new(0);
    log::debug!("Optimizing {} over {} parameter combinations", target, total);

    let run = |params: &UnwrapParameters| -> Candidate {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            engine
                .unwrap(mesh, params)
                .and_then(|output| target.score(&output.mesh, options.coverage_resolution))
        }))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            Err(UvError::engine(-1, format!("panic: {}", message)))
        });

        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        progress.report(
            done,
            total,
            &format!(
                "angle={} min_faces={}",
                params.angle_threshold, params.min_island_faces
            ),
        );

        match outcome {
            Ok(score) => {
                log::debug!(
                    "angle={} min_faces={}: {}={:.4}",
                    params.angle_threshold,
                    params.min_island_faces,
                    target,
                    score
                );
                Candidate {
                    params: *params,
                    score: Some(score),
                    error: None,
                }
            }
            Err(e) => {
                log::warn!(
                    "angle={} min_faces={} failed: {}",
                    params.angle_threshold,
                    params.min_island_faces,
                    e
                );
                Candidate {
                    params: *params,
                    score: None,
                    error: Some(e.to_string()),
                }
            }
        }
    };

    // Collect preserves grid order in both modes
    let candidates: Vec<Candidate> = if options.parallel {
        grid.par_iter().map(run).collect()
    } else {
        grid.iter().map(run).collect()
    };

    let mut best_params = None;
    let mut best_score = target.worst_score();
    for candidate in &candidates {
        if let Some(score) = candidate.score {
            if target.is_better(score, best_score) {
                best_score = score;
                best_params = Some(candidate.params);
            }
        }
    }

    Ok(OptimizationResult {
        target,
        best_params,
        best_score,
        candidates,
    })
}

/// Load `path` once through `io`, then run [`optimize_with_progress`].
///
/// # Errors
///
/// A load failure is returned as-is; there is nothing to search without a mesh.
pub fn optimize_file<E, I>(
    engine: &E,
    io: &I,
    path: &Path,
    target: TargetMetric,
    options: &OptimizeOptions,
    progress: &Progress,
) -> Result<OptimizationResult>
where
    E: UnwrapEngine + ?Sized,
    I: MeshIo + ?Sized,
{
    let mesh = io.load(path)?;
    log::info!(
        "Loaded {} ({} vertices, {} triangles)",
        path.display(),
        mesh.num_vertices(),
        mesh.num_triangles()
    );
    optimize_with_progress(engine, &mesh, target, options, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ProjectionEngine, UnwrapOutput, UnwrapStats};
    use crate::io::FileIo;
    use crate::mesh::UVMap;
    use crate::test_utils::grid;
    use nalgebra::Point2;
    use std::sync::Mutex;

    /// Squashes v by `angle_threshold / 50`, so stretch is `50 / angle` and
    /// coverage is roughly `angle / 50`. Fails for `min_island_faces` in `fail_on`.
    struct SquashEngine {
        fail_on: Vec<usize>,
    }

    impl UnwrapEngine for SquashEngine {
        fn unwrap(&self, mesh: &Mesh, params: &UnwrapParameters) -> Result<UnwrapOutput> {
            if self.fail_on.contains(&params.min_island_faces) {
                return Err(UvError::engine(7, "refused"));
            }
            let (min, max) = mesh.bounding_box().ok_or(UvError::MissingUvs)?;
            let size = (max - min).x;
            let squash = params.angle_threshold / 50.0;
            let uvs: Vec<_> = mesh
                .positions()
                .iter()
                .map(|p| Point2::new((p.x - min.x) / size, (p.y - min.y) / size * squash))
                .collect();
            Ok(UnwrapOutput {
                mesh: mesh.clone().with_uvs(UVMap::new(uvs))?,
                stats: UnwrapStats::default(),
            })
        }
    }

    /// Panics on `min_island_faces == 20`, otherwise behaves like [`SquashEngine`].
    struct FlakyEngine;

    impl UnwrapEngine for FlakyEngine {
        fn unwrap(&self, mesh: &Mesh, params: &UnwrapParameters) -> Result<UnwrapOutput> {
            if params.min_island_faces == 20 {
                panic!("solver blew up");
            }
            SquashEngine { fail_on: vec![] }.unwrap(mesh, params)
        }
    }

    /// Counts loads and delegates to [`FileIo`].
    #[derive(Default)]
    struct CountingIo {
        loads: AtomicUsize,
    }

    impl MeshIo for CountingIo {
        fn load(&self, path: &Path) -> Result<Mesh> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            FileIo.load(path)
        }

        fn save(&self, mesh: &Mesh, path: &Path) -> Result<()> {
            FileIo.save(mesh, path)
        }
    }

    fn options() -> OptimizeOptions {
        OptimizeOptions::default().with_coverage_resolution(128)
    }

    #[test]
    fn test_target_metric_parsing() {
        assert_eq!("stretch".parse::<TargetMetric>().unwrap(), TargetMetric::Stretch);
        assert_eq!("coverage".parse::<TargetMetric>().unwrap(), TargetMetric::Coverage);
        assert_eq!(
            "angle_distortion".parse::<TargetMetric>().unwrap(),
            TargetMetric::AngleDistortion
        );
        assert!(matches!(
            "area".parse::<TargetMetric>(),
            Err(UvError::UnknownMetric(name)) if name == "area"
        ));
        assert!(TargetMetric::Coverage.maximize());
        assert!(!TargetMetric::Stretch.maximize());
    }

    #[test]
    fn test_default_grid() {
        let grid = ParameterGrid::default();
        let candidates = grid.candidates();
        assert_eq!(candidates.len(), 16);
        assert_eq!(grid.len(), 16);
        assert_eq!(candidates[0].angle_threshold, 20.0);
        assert_eq!(candidates[1].min_island_faces, 10);
        assert!(candidates.iter().all(|p| p.pack_islands && p.island_margin == 0.02));
    }

    #[test]
    fn test_minimizes_stretch() {
        let engine = SquashEngine { fail_on: vec![] };
        let result = optimize(&engine, &grid(2), TargetMetric::Stretch, &options()).unwrap();

        let best = result.best_params.unwrap();
        assert_eq!(best.angle_threshold, 50.0);
        // All min_island_faces values tie; the first one wins
        assert_eq!(best.min_island_faces, 5);
        assert!((result.best_score - 1.0).abs() < 1e-9);

        for c in &result.candidates {
            assert!(result.best_score <= c.score.unwrap());
        }
    }

    #[test]
    fn test_maximizes_coverage() {
        let engine = SquashEngine { fail_on: vec![] };
        let result = optimize(&engine, &grid(2), TargetMetric::Coverage, &options()).unwrap();

        assert_eq!(result.best_params.unwrap().angle_threshold, 50.0);
        for c in &result.candidates {
            assert!(result.best_score >= c.score.unwrap());
        }
    }

    #[test]
    fn test_failed_candidates_are_skipped() {
        let engine = SquashEngine {
            fail_on: vec![5, 20],
        };
        let result = optimize(&engine, &grid(2), TargetMetric::Stretch, &options()).unwrap();

        assert_eq!(result.num_failed(), 8);
        let best = result.best_params.unwrap();
        assert_eq!(best.angle_threshold, 50.0);
        assert_eq!(best.min_island_faces, 10);
        assert!(result.candidates[0].error.as_deref().unwrap().contains("refused"));
    }

    #[test]
    fn test_all_candidates_fail() {
        let engine = SquashEngine {
            fail_on: vec![5, 10, 20, 50],
        };
        let stretch = optimize(&engine, &grid(1), TargetMetric::Stretch, &options()).unwrap();
        assert!(stretch.best_params.is_none());
        assert_eq!(stretch.best_score, f64::INFINITY);

        let coverage = optimize(&engine, &grid(1), TargetMetric::Coverage, &options()).unwrap();
        assert!(coverage.best_params.is_none());
        assert_eq!(coverage.best_score, f64::NEG_INFINITY);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let engine = SquashEngine { fail_on: vec![10] };
        let mesh = grid(3);
        for target in TargetMetric::ALL {
            let par = optimize(&engine, &mesh, target, &options().with_parallel(true)).unwrap();
            let seq = optimize(&engine, &mesh, target, &options().with_parallel(false)).unwrap();
            assert_eq!(par.best_params, seq.best_params);
            assert_eq!(par.candidates, seq.candidates);
        }
    }

    #[test]
    fn test_progress_once_per_candidate() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let progress = Progress::new(move |current, total, _| {
            sink.lock().unwrap().push((current, total));
        });

        let engine = SquashEngine { fail_on: vec![50] };
        optimize_with_progress(&engine, &grid(1), TargetMetric::Stretch, &options(), &progress)
            .unwrap();

        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        let expected: Vec<_> = (1..=16).map(|i| (i, 16)).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_rejects_zero_resolution() {
        let result = optimize(
            &ProjectionEngine,
            &grid(1),
            TargetMetric::Coverage,
            &OptimizeOptions::default().with_coverage_resolution(0),
        );
        assert!(matches!(result, Err(UvError::InvalidParameter { .. })));
    }

    #[test]
    fn test_panicking_candidates_are_skipped() {
        for parallel in [true, false] {
            let result = optimize(
                &FlakyEngine,
                &grid(2),
                TargetMetric::Stretch,
                &options().with_parallel(parallel),
            )
            .unwrap();

            assert_eq!(result.candidates.len(), 16);
            assert_eq!(result.num_failed(), 4);
            let failed = result.candidates.iter().find(|c| c.error.is_some()).unwrap();
            assert_eq!(failed.params.min_island_faces, 20);
            assert!(failed.error.as_deref().unwrap().contains("solver blew up"));
            assert_eq!(result.best_params.unwrap().angle_threshold, 50.0);
        }
    }

    #[test]
    fn test_optimize_file_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.obj");
        FileIo.save(&grid(2), &path).unwrap();

        let io = CountingIo::default();
        let result = optimize_file(
            &ProjectionEngine,
            &io,
            &path,
            TargetMetric::AngleDistortion,
            &options(),
            &Progress::none(),
        )
        .unwrap();
        assert_eq!(result.candidates.len(), 16);
        assert_eq!(io.loads.load(Ordering::SeqCst), 1);
        assert!(result.best_score < 1e-9);

        let missing = optimize_file(
            &ProjectionEngine,
            &io,
            &dir.path().join("missing.obj"),
            TargetMetric::Stretch,
            &options(),
            &Progress::none(),
        );
        assert!(missing.is_err());
        assert_eq!(io.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_result_serializes() {
        let engine = SquashEngine { fail_on: vec![5] };
        let result = optimize(&engine, &grid(1), TargetMetric::Stretch, &options()).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["target"], "stretch");
        assert_eq!(json["best_params"]["angle_threshold"], 50.0);
        assert!(json["candidates"][0]["error"].is_string());
        assert!(json["candidates"][1].get("error").is_none());
    }
}
