//! Concurrent batch processing of mesh files.
//!
//! [`BatchScheduler::process_batch`] runs one independent unit of work per
//! input file on a fixed-size rayon pool. Each unit loads the mesh, unwraps
//! it, computes the three metrics, and saves the result into the output
//! directory. Units finish in any order. A failing unit (I/O error, engine
//! error, metric error, or panic) becomes a failure record and does not
//! affect the others.
//!
//! Progress is reported once per finished unit, in completion order, from
//! the calling thread.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use uvwrap::algo::progress::Progress;
//! use uvwrap::batch::{BatchOptions, BatchScheduler};
//! use uvwrap::engine::{ProjectionEngine, UnwrapParameters};
//! use uvwrap::io::FileIo;
//!
//! let scheduler = BatchScheduler::new(ProjectionEngine, FileIo)
//!     .with_options(BatchOptions::default().with_num_threads(4));
//! let inputs = vec![PathBuf::from("a.obj"), PathBuf::from("b.obj")];
//! let progress = Progress::new(|done, total, file| eprintln!("[{}/{}] {}", done, total, file));
//!
//! let report = scheduler
//!     .process_batch(&inputs, "out".as_ref(), &UnwrapParameters::default(), &progress)
//!     .unwrap();
//! println!("{}", report.to_json().unwrap());
//! ```

use std::collections::HashSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::algo::metrics::{MetricResult, DEFAULT_COVERAGE_RESOLUTION};
use crate::algo::pipeline::unwrap_and_score;
use crate::algo::progress::Progress;
use crate::cache::ResultCache;
use crate::engine::{UnwrapEngine, UnwrapParameters};
use crate::error::{panic_message, Result, UvError};
use crate::io::MeshIo;

/// Options for [`BatchScheduler`].
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Worker count. `None` uses the host's available parallelism.
    pub num_threads: Option<usize>,
    /// Resolution passed to the coverage metric.
    pub coverage_resolution: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            num_threads: None,
            coverage_resolution: DEFAULT_COVERAGE_RESOLUTION,
        }
    }
}

impl BatchOptions {
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    pub fn with_coverage_resolution(mut self, resolution: usize) -> Self {
        self.coverage_resolution = resolution;
        self
    }

    /// The worker count that will actually be used.
    pub fn resolved_threads(&self) -> usize {
        self.num_threads
            .filter(|&n| n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }
}

/// Outcome of one input file.
///
/// Successful records carry counts and metrics; failed records carry an
/// error message and a time of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertices: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triangles: Option<usize>,
    /// Seconds spent on this file.
    pub time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub success: bool,
}

impl BatchItemResult {
    pub fn success(
        file: impl Into<String>,
        vertices: usize,
        triangles: usize,
        time: f64,
        metrics: MetricResult,
    ) -> Self {
        Self {
            file: file.into(),
            vertices: Some(vertices),
            triangles: Some(triangles),
            time,
            metrics: Some(metrics),
            error: None,
            success: true,
        }
    }

    pub fn failure(file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            vertices: None,
            triangles: None,
            time: 0.0,
            metrics: None,
            error: Some(error.into()),
            success: false,
        }
    }
}

/// Aggregate statistics for a batch.
///
/// Averages are taken over successful files only and are zero when no file
/// succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Wall-clock seconds for the whole batch.
    pub total_time: f64,
    /// Mean seconds per successful file.
    pub avg_time: f64,
    pub avg_stretch: f64,
    pub avg_coverage: f64,
    pub avg_angle_distortion: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[BatchItemResult], total_time: f64) -> Self {
        let successes: Vec<(f64, &MetricResult)> = results
            .iter()
            .filter(|r| r.success)
            .filter_map(|r| r.metrics.as_ref().map(|m| (r.time, m)))
            .collect();

        let mut summary = Self {
            total: results.len(),
            successful: successes.len(),
            failed: results.len() - successes.len(),
            total_time,
            ..Self::default()
        };

        if !successes.is_empty() {
            let n = successes.len() as f64;
            summary.avg_time = successes.iter().map(|(t, _)| t).sum::<f64>() / n;
            summary.avg_stretch = successes.iter().map(|(_, m)| m.stretch).sum::<f64>() / n;
            summary.avg_coverage = successes.iter().map(|(_, m)| m.coverage).sum::<f64>() / n;
            summary.avg_angle_distortion =
                successes.iter().map(|(_, m)| m.angle_distortion).sum::<f64>() / n;
        }
        summary
    }
}

/// Everything a batch run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    /// Per-file results in completion order.
    pub files: Vec<BatchItemResult>,
}

impl BatchReport {
    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as JSON to `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Runs unwrap + score + save over many files in parallel.
pub struct BatchScheduler<'c, E, I> {
    engine: E,
    io: I,
    options: BatchOptions,
    cache: Option<&'c ResultCache>,
}

impl<'c, E: UnwrapEngine, I: MeshIo> BatchScheduler<'c, E, I> {
    pub fn new(engine: E, io: I) -> Self {
        Self {
            engine,
            io,
            options: BatchOptions::default(),
            cache: None,
        }
    }

    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Share `cache` across all units of every batch this scheduler runs.
    pub fn with_cache(mut self, cache: &'c ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Process every file in `inputs`, saving results into `output_dir`.
    ///
    /// Outputs keep the input's file name. When two inputs share a file name,
    /// the first one in `inputs` is processed and each later one becomes a
    /// failure record, so no output is overwritten. `progress` is called
    /// exactly once per input with `(completed, total, file_name)`.
    ///
    /// # Errors
    ///
    /// Only top-level problems are errors:
    /// - [`UvError::NoInputs`] if `inputs` is empty
    /// - [`UvError::OutputDestination`] if `output_dir` cannot be created
    /// - [`UvError::WorkerPool`] if the thread pool cannot be started
    ///
    /// Per-file failures are reported in [`BatchReport::files`].
    pub fn process_batch(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        params: &UnwrapParameters,
        progress: &Progress,
    ) -> Result<BatchReport> {
        if inputs.is_empty() {
            return Err(UvError::NoInputs);
        }
        fs::create_dir_all(output_dir).map_err(|source| UvError::OutputDestination {
            path: output_dir.to_path_buf(),
            source,
        })?;

        let num_threads = self.options.resolved_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("uvwrap-batch-{}", i))
            .build()?;

        let total = inputs.len();
        log::info!(
            "Processing {} files with {} threads using {}",
            total,
            num_threads,
            self.engine.name()
        );

        let start = Instant::now();
        let mut files = Vec::with_capacity(total);
        let (tx, rx) = mpsc::channel::<BatchItemResult>();

        let mut claimed = HashSet::with_capacity(total);
        pool.in_place_scope(|scope| {
            for input in inputs {
                let tx = tx.clone();
                let file = display_name(input);
                if !claimed.insert(file.clone()) {
                    log::warn!("Skipping {}: output name already taken", input.display());
                    let _ = tx.send(BatchItemResult::failure(
                        &file,
                        format!("Error processing {}: output name collides with an earlier input", file),
                    ));
                    continue;
                }
                scope.spawn(move |_| {
                    let _ = tx.send(self.run_unit(input, output_dir, params));
                });
            }
            drop(tx);

            for item in rx.iter() {
                progress.report(files.len() + 1, total, &item.file);
                files.push(item);
            }
        });

        let summary = BatchSummary::from_results(&files, start.elapsed().as_secs_f64());
        log::info!(
            "Batch finished: {}/{} succeeded in {:.2}s",
            summary.successful,
            summary.total,
            summary.total_time
        );

        Ok(BatchReport { summary, files })
    }

    /// One unit of work. Never fails; errors and panics become failure records.
    fn run_unit(&self, input: &Path, output_dir: &Path, params: &UnwrapParameters) -> BatchItemResult {
        let file = display_name(input);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.process_single(input, &file, output_dir, params)
        }));

        match outcome {
            Ok(Ok(item)) => {
                log::debug!("{}: done in {:.3}s", file, item.time);
                item
            }
            Ok(Err(e)) => {
                log::warn!("Error processing {}: {}", file, e);
                BatchItemResult::failure(&file, format!("Error processing {}: {}", file, e))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::warn!("Worker panicked on {}: {}", file, message);
                BatchItemResult::failure(&file, format!("Panic processing {}: {}", file, message))
            }
        }
    }

    fn process_single(
        &self,
        input: &Path,
        file: &str,
        output_dir: &Path,
        params: &UnwrapParameters,
    ) -> Result<BatchItemResult> {
        let t0 = Instant::now();
        let mesh = self.io.load(input)?;
        let scored = unwrap_and_score(
            &self.engine,
            &mesh,
            params,
            self.cache,
            self.options.coverage_resolution,
        )?;
        self.io.save(&scored.mesh, &output_dir.join(file))?;

        Ok(BatchItemResult::success(
            file,
            mesh.num_vertices(),
            mesh.num_triangles(),
            t0.elapsed().as_secs_f64(),
            scored.metrics,
        ))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}
