//! Training module for WGAN
//!
//! This module provides:
//! - Training loop with critic clipping and the n_critic update schedule
//! - Wasserstein loss functions
//! - Training metrics
//! - Single-hyperparameter sweeps

mod losses;
mod metrics;
mod sweep;
mod trainer;

pub use losses::{critic_loss, generator_loss};
pub use metrics::{StepRecord, TrainingMetrics};
pub use sweep::{run_sweep, SweepParam};
pub use trainer::{run, train_step, Trainer, TrainingRun, SAMPLE_COUNT, SAMPLE_GRID_ROW};
