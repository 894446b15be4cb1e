//! Training metrics for monitoring WGAN progress
//!
//! Keeps every per-batch step record plus per-epoch loss means.

use std::path::PathBuf;

/// Outcome of one batch
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Epoch index, from 0
    pub epoch: usize,
    /// Batch index within the epoch, from 0
    pub batch: usize,
    /// Critic loss after this batch's critic step
    pub critic_loss: f64,
    /// Generator loss, present only on generator-update batches
    pub generator_loss: Option<f64>,
}

impl StepRecord {
    /// Whether the generator was updated on this batch
    pub fn updated_generator(&self) -> bool {
        self.generator_loss.is_some()
    }
}

/// Metrics collected during training
#[derive(Debug, Clone, Default)]
pub struct TrainingMetrics {
    /// Every batch, in order
    pub steps: Vec<StepRecord>,
    /// Mean critic loss per epoch
    pub critic_losses: Vec<f64>,
    /// Mean generator loss per epoch, over generator-update batches only
    pub generator_losses: Vec<f64>,
    /// Sample grids written, one per epoch
    pub samples: Vec<PathBuf>,
}

impl TrainingMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one batch
    pub fn record_step(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    /// Close an epoch: average the losses of its recorded steps
    pub fn finish_epoch(&mut self, epoch: usize) {
        let epoch_steps: Vec<_> = self.steps.iter().filter(|s| s.epoch == epoch).collect();

        let critic: Vec<f64> = epoch_steps.iter().map(|s| s.critic_loss).collect();
        let generator: Vec<f64> = epoch_steps.iter().filter_map(|s| s.generator_loss).collect();

        self.critic_losses.push(mean(&critic));
        self.generator_losses.push(mean(&generator));
    }

    /// Record a written sample grid
    pub fn record_sample(&mut self, path: PathBuf) {
        self.samples.push(path);
    }

    /// Get number of completed epochs
    pub fn num_epochs(&self) -> usize {
        self.critic_losses.len()
    }

    /// Total batches processed
    pub fn num_steps(&self) -> usize {
        self.steps.len()
    }

    /// Number of generator optimizer steps taken
    pub fn generator_updates(&self) -> usize {
        self.steps.iter().filter(|s| s.updated_generator()).count()
    }

    /// Get latest epoch mean critic loss
    pub fn latest_critic_loss(&self) -> Option<f64> {
        self.critic_losses.last().copied()
    }

    /// Get latest epoch mean generator loss
    pub fn latest_generator_loss(&self) -> Option<f64> {
        self.generator_losses.last().copied()
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
