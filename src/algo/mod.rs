//! Scoring and search algorithms.
//!
//! - **Metrics**: stretch, coverage, angle distortion
//! - **Pipeline**: single-shot unwrap and score, with optional caching
//! - **Optimize**: grid search over unwrap parameters
//! - **Progress**: callbacks for long-running operations

pub mod metrics;
pub mod optimize;
pub mod pipeline;
pub mod progress;

pub use progress::{Progress, ProgressEvent};
