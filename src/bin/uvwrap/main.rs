//! uvwrap CLI - UV unwrapping and quality analysis tool.
//!
//! Usage: uvwrap <COMMAND> [OPTIONS] <INPUT> [OUTPUT]
//!
//! Run `uvwrap --help` for available commands.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};

use uvwrap::algo::metrics::{self, DEFAULT_COVERAGE_RESOLUTION};
use uvwrap::algo::optimize::{optimize_file, OptimizeOptions, TargetMetric};
use uvwrap::algo::pipeline::unwrap_and_score;
use uvwrap::algo::Progress;
use uvwrap::batch::{BatchOptions, BatchScheduler};
use uvwrap::cache::ResultCache;
use uvwrap::engine::{ProjectionEngine, UnwrapEngine, UnwrapParameters};
use uvwrap::io::{self, FileIo, Format};

#[derive(Parser)]
#[command(name = "uvwrap")]
#[command(author, version, about = "UV unwrapping tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unwrap a single mesh
    Unwrap {
        /// Input mesh file
        input: PathBuf,

        /// Output mesh file
        output: PathBuf,

        /// Angle threshold in degrees
        #[arg(long, default_value = "30.0")]
        angle_threshold: f64,

        /// Minimum island size in faces
        #[arg(long, default_value = "10")]
        min_island: usize,

        /// Disable island packing
        #[arg(long)]
        no_pack: bool,

        /// Island margin
        #[arg(long, default_value = "0.02")]
        margin: f64,

        /// Read parameters from a JSON file (overrides the flags above)
        #[arg(long)]
        params: Option<PathBuf>,

        /// Coverage rasterization resolution
        #[arg(long, default_value_t = DEFAULT_COVERAGE_RESOLUTION)]
        resolution: usize,
    },

    /// Unwrap every mesh in a directory
    Batch {
        /// Input directory
        input_dir: PathBuf,

        /// Output directory
        output_dir: PathBuf,

        /// Number of worker threads (default: CPU count)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Angle threshold in degrees
        #[arg(long, default_value = "30.0")]
        angle_threshold: f64,

        /// Save the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Coverage rasterization resolution
        #[arg(long, default_value_t = DEFAULT_COVERAGE_RESOLUTION)]
        resolution: usize,
    },

    /// Search for the best unwrap parameters
    Optimize {
        /// Input mesh file
        input: PathBuf,

        /// Metric to optimize: stretch, coverage, or angle_distortion
        #[arg(short, long, default_value = "stretch")]
        metric: String,

        /// Unwrap with the best parameters and save to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the best parameters as JSON
        #[arg(long)]
        save_params: Option<PathBuf>,

        /// Coverage rasterization resolution
        #[arg(long, default_value_t = DEFAULT_COVERAGE_RESOLUTION)]
        resolution: usize,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Report the quality of the UVs stored in a mesh
    Analyze {
        /// Input mesh file with UVs
        input: PathBuf,

        /// Coverage rasterization resolution
        #[arg(long, default_value_t = DEFAULT_COVERAGE_RESOLUTION)]
        resolution: usize,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Unwrap {
            input,
            output,
            angle_threshold,
            min_island,
            no_pack,
            margin,
            params,
            resolution,
        } => {
            let params = match params {
                Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
                None => UnwrapParameters {
                    angle_threshold,
                    min_island_faces: min_island,
                    pack_islands: !no_pack,
                    island_margin: margin,
                },
            };
            cmd_unwrap(&input, &output, &params, resolution)?;
        }

        Commands::Batch {
            input_dir,
            output_dir,
            threads,
            angle_threshold,
            report,
            resolution,
        } => {
            cmd_batch(&input_dir, &output_dir, threads, angle_threshold, report.as_deref(), resolution)?;
        }

        Commands::Optimize {
            input,
            metric,
            output,
            save_params,
            resolution,
            sequential,
        } => {
            let target: TargetMetric = metric.parse()?;
            cmd_optimize(&input, target, output.as_deref(), save_params.as_deref(), resolution, sequential)?;
        }

        Commands::Analyze { input, resolution } => {
            cmd_analyze(&input, resolution)?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on stderr.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Completion order is arbitrary across workers; never move backwards
        let percent = max_percent.fetch_max(raw_percent, Ordering::Relaxed).max(raw_percent);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        eprint!("\r[{}{}] {:3}% ({}/{}) {:<32}", bar, space, percent, current, total, message);
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn cmd_unwrap(
    input: &Path,
    output: &Path,
    params: &UnwrapParameters,
    resolution: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;
    println!(
        "Unwrapping: {} ({} vertices, {} triangles)",
        input.display(),
        mesh.num_vertices(),
        mesh.num_triangles()
    );

    let start = Instant::now();
    let scored = unwrap_and_score(
        &ProjectionEngine,
        &mesh,
        params,
        Some(ResultCache::global()),
        resolution,
    )?;
    io::save(&scored.mesh, output)?;
    let elapsed = start.elapsed();

    let m = scored.metrics;
    println!("Completed in {:.2?}", elapsed);
    println!("  Islands:          {}", m.num_islands);
    println!("  Stretch:          {:.4}", m.stretch);
    println!("  Coverage:         {:.2}%", m.coverage * 100.0);
    println!("  Angle distortion: {:.2}°", m.angle_distortion.to_degrees());
    println!("Saved: {}", output.display());

    Ok(())
}

fn cmd_batch(
    input_dir: &Path,
    output_dir: &Path,
    threads: Option<usize>,
    angle_threshold: f64,
    report_path: Option<&Path>,
    resolution: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input_dir.is_dir() {
        return Err(format!("input directory '{}' not found", input_dir.display()).into());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(input_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && Format::from_path(p).is_some())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(format!("no mesh files found in {}", input_dir.display()).into());
    }

    let mut options = BatchOptions::default().with_coverage_resolution(resolution);
    if let Some(n) = threads {
        options = options.with_num_threads(n);
    }
    println!(
        "Found {} files, using {} threads",
        files.len(),
        options.resolved_threads()
    );

    let params = UnwrapParameters::default().with_angle_threshold(angle_threshold);
    let scheduler = BatchScheduler::new(ProjectionEngine, FileIo).with_options(options);
    let report = scheduler.process_batch(&files, output_dir, &params, &create_progress())?;

    let s = &report.summary;
    println!("Total:            {}", s.total);
    println!("Successful:       {}", s.successful);
    println!("Failed:           {}", s.failed);
    println!("Wall time:        {:.2}s", s.total_time);
    println!("Avg time:         {:.3}s", s.avg_time);
    println!("Avg stretch:      {:.4}", s.avg_stretch);
    println!("Avg coverage:     {:.2}%", s.avg_coverage * 100.0);
    println!("Avg angle dist.:  {:.2}°", s.avg_angle_distortion.to_degrees());

    for failure in report.files.iter().filter(|f| !f.success) {
        if let Some(error) = &failure.error {
            println!("  {}", error);
        }
    }

    if let Some(path) = report_path {
        report.write_json(path)?;
        println!("Report saved: {}", path.display());
    }

    Ok(())
}

fn cmd_optimize(
    input: &Path,
    target: TargetMetric,
    output: Option<&Path>,
    save_params: Option<&Path>,
    resolution: usize,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = OptimizeOptions::default()
        .with_coverage_resolution(resolution)
        .with_parallel(!sequential);
    let mode = if sequential { "sequential" } else { "parallel" };
    println!(
        "Optimizing {} for {} ({} combinations, {})...",
        input.display(),
        target,
        options.grid.len(),
        mode
    );

    let engine = ProjectionEngine;
    let start = Instant::now();
    let result = optimize_file(&engine, &FileIo, input, target, &options, &create_progress())?;
    let elapsed = start.elapsed();

    println!("{:<10} {:<10} | {}", "angle", "min_faces", target);
    for c in &result.candidates {
        let marker = if Some(c.params) == result.best_params { " *" } else { "" };
        match (c.score, &c.error) {
            (Some(score), _) => println!(
                "{:<10} {:<10} | {:.4}{}",
                c.params.angle_threshold, c.params.min_island_faces, score, marker
            ),
            (None, Some(error)) => println!(
                "{:<10} {:<10} | FAILED: {}",
                c.params.angle_threshold, c.params.min_island_faces, error
            ),
            (None, None) => {}
        }
    }

    let Some(best) = result.best_params else {
        return Err(format!("every parameter combination failed ({:.2?})", elapsed).into());
    };
    println!("Best {}: {:.4} ({:.2?})", target, result.best_score, elapsed);
    println!("{}", serde_json::to_string_pretty(&best)?);

    if let Some(path) = save_params {
        fs::write(path, serde_json::to_string_pretty(&best)?)?;
        println!("Parameters saved: {}", path.display());
    }

    if let Some(path) = output {
        let mesh = io::load(input)?;
        let unwrapped = engine.unwrap(&mesh, &best)?;
        io::save(&unwrapped.mesh, path)?;
        println!("Saved: {}", path.display());
    }

    Ok(())
}

fn cmd_analyze(input: &Path, resolution: usize) -> Result<(), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;
    let uvs = mesh.require_uvs()?;

    let stretch = metrics::compute_stretch(&mesh, uvs)?;
    let coverage = metrics::compute_coverage(uvs, mesh.triangles(), resolution)?;
    let angle = metrics::compute_angle_distortion(&mesh, uvs)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Triangles: {}", mesh.num_triangles());
    println!("Stretch (>= 1.0):   {:.4}", stretch);
    println!("Coverage (0-1):     {:.2}%", coverage * 100.0);
    println!("Angle distortion:   {:.2}°", angle.to_degrees());

    let assessment = if stretch < 1.2 && angle < 5.0_f64.to_radians() {
        "Excellent (low distortion)"
    } else if stretch < 2.0 {
        "Acceptable (moderate distortion)"
    } else {
        "Poor (high distortion)"
    };
    println!("Assessment: {}", assessment);

    Ok(())
}
