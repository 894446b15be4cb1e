//! Training loop implementation for WGAN
//!
//! The critic is updated on every batch and clipped right after its
//! optimizer step; the generator is updated on every `n_critic`-th batch.

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use tch::{Device, Tensor};
use tracing::{debug, error, info, warn};

use super::losses::{critic_loss, generator_loss};
use super::metrics::{StepRecord, TrainingMetrics};
use crate::data::{DataLoader, ImageDataset};
use crate::error::{Result, WganError};
use crate::model::{supports_single_image_batches, Wgan, WganOptimizers};
use crate::utils::{save_image_grid, WganConfig};

/// Images in the end-of-epoch sample grid
pub const SAMPLE_COUNT: i64 = 25;

/// Tiles per row in the sample grid
pub const SAMPLE_GRID_ROW: usize = 5;

/// WGAN Trainer
pub struct Trainer {
    config: WganConfig,
    device: Device,
    metrics: TrainingMetrics,
}

impl Trainer {
    /// Create a new trainer
    pub fn new(config: WganConfig, device: Device) -> Self {
        Self {
            config,
            device,
            metrics: TrainingMetrics::new(),
        }
    }

    /// Train the WGAN model
    ///
    /// # Arguments
    ///
    /// * `model` - WGAN model to train
    /// * `data_loader` - DataLoader providing real image batches
    ///
    /// # Returns
    ///
    /// Training metrics, or the first error hit. A non-finite loss stops the
    /// run, since every later update would be meaningless.
    pub fn train(&mut self, model: &Wgan, data_loader: &mut DataLoader) -> Result<&TrainingMetrics> {
        let mut optimizers = model.optimizers(self.config.learning_rate)?;

        let epochs = self.config.epochs;
        let n_critic = self.config.critic_steps_per_gen_step;
        let num_batches = data_loader.num_batches();

        std::fs::create_dir_all(self.config.run_dir())?;

        info!(
            "Starting training for {} epochs, {} batches per epoch on {:?}",
            epochs, num_batches, self.device
        );

        for epoch in 0..epochs {
            let pb = progress_bar(num_batches as u64);

            for (batch, real) in data_loader.iter().enumerate() {
                let (c_loss, g_loss) = train_step(
                    model,
                    &mut optimizers,
                    &real,
                    batch,
                    n_critic,
                    self.config.clip_value,
                );

                let g_finite = g_loss.map(f64::is_finite).unwrap_or(true);
                if !c_loss.is_finite() || !g_finite {
                    pb.abandon();
                    error!(
                        "Non-finite loss at epoch {}, batch {}: D loss {}, G loss {:?}",
                        epoch, batch, c_loss, g_loss
                    );
                    return Err(WganError::NonFiniteLoss {
                        epoch,
                        batch,
                        critic_loss: c_loss,
                        generator_loss: g_loss,
                    });
                }

                if let Some(g) = g_loss {
                    pb.suspend(|| {
                        info!(
                            "[Epoch {}/{}] [Batch {}/{}] [D loss: {:.6}] [G loss: {:.6}]",
                            epoch, epochs, batch, num_batches, c_loss, g
                        )
                    });
                    pb.set_message(format!("D: {:.4}, G: {:.4}", c_loss, g));
                } else {
                    debug!("[Epoch {}/{}] [Batch {}/{}] [D loss: {:.6}]", epoch, epochs, batch, num_batches, c_loss);
                }

                self.metrics.record_step(StepRecord {
                    epoch,
                    batch,
                    critic_loss: c_loss,
                    generator_loss: g_loss,
                });
                pb.inc(1);
            }

            pb.finish_and_clear();
            self.metrics.finish_epoch(epoch);

            let sample_path = self.save_samples(model, epoch)?;
            self.metrics.record_sample(sample_path.clone());

            info!(
                "Epoch {}/{} done: mean D loss={:.6}, mean G loss={:.6}, samples at {}",
                epoch,
                epochs,
                self.metrics.latest_critic_loss().unwrap_or(0.0),
                self.metrics.latest_generator_loss().unwrap_or(0.0),
                sample_path.display()
            );
        }

        Ok(&self.metrics)
    }

    /// Generate a fresh 5x5 grid and write it to `<run_dir>/epoch<N>.png`
    pub fn save_samples(&self, model: &Wgan, epoch: usize) -> Result<PathBuf> {
        let path = self.config.sample_path(epoch);
        let samples = model.generate(SAMPLE_COUNT);
        save_image_grid(&samples, SAMPLE_GRID_ROW, &path)?;
        Ok(path)
    }

    /// Get training metrics
    pub fn metrics(&self) -> &TrainingMetrics {
        &self.metrics
    }

    /// Consume the trainer, keeping its metrics
    pub fn into_metrics(self) -> TrainingMetrics {
        self.metrics
    }

    /// Get configuration
    pub fn config(&self) -> &WganConfig {
        &self.config
    }
}

/// One batch of WGAN training
///
/// 1. Draw a latent batch the size of `real`.
/// 2. Score real and detached generated images, step the critic on
///    `mean(D(fake)) - mean(D(real))`.
/// 3. Clamp the critic's parameters into `[-clip_value, clip_value]`.
/// 4. When `batch_idx % n_critic == 0`, regenerate from the same latent
///    batch and step the generator on `-mean(D(G(z)))`.
///
/// # Returns
///
/// Critic loss, and the generator loss when the generator was updated
pub fn train_step(
    model: &Wgan,
    optimizers: &mut WganOptimizers,
    real: &Tensor,
    batch_idx: usize,
    n_critic: usize,
    clip_value: f64,
) -> (f64, Option<f64>) {
    let batch_size = real.size()[0];
    let noise = model.sample_latent(batch_size);

    // Train critic
    let fake = model.generate_from_noise(&noise, true).detach();
    let c_loss = critic_loss(&model.score(real, true), &model.score(&fake, true));

    optimizers.critic.zero_grad();
    c_loss.backward();
    optimizers.critic.step();

    model.clip_critic(clip_value);

    // Train generator every n_critic batches, reusing the critic's noise
    let g_loss = if batch_idx % n_critic.max(1) == 0 {
        let fake = model.generate_from_noise(&noise, true);
        let g_loss = generator_loss(&model.score(&fake, true));

        optimizers.generator.zero_grad();
        g_loss.backward();
        optimizers.generator.step();

        Some(g_loss.double_value(&[]))
    } else {
        None
    };

    (c_loss.double_value(&[]), g_loss)
}

/// A finished run: the trained model and what happened along the way
pub struct TrainingRun {
    pub model: Wgan,
    pub metrics: TrainingMetrics,
}

/// Run one complete training job from a configuration
///
/// Validates the configuration, resolves the device, seeds libtorch when a
/// seed is set, loads the dataset, builds the model and trains it.
pub fn run(config: &WganConfig) -> Result<TrainingRun> {
    config.validate()?;
    let device = config.device()?;

    if let Some(seed) = config.seed {
        tch::manual_seed(seed as i64);
        debug!("Seeded libtorch with {}", seed);
    }

    let dataset = match config.synthetic_samples {
        Some(n) => {
            info!("Using {} synthetic images", n);
            ImageDataset::synthetic(n, config.channels, config.image_size)
        }
        None => ImageDataset::from_mnist_dir(&config.data_dir, config.image_size)?,
    };
    dataset.check_geometry(config.channels, config.image_size)?;

    let drop_last = drop_lone_trailing_image(config, dataset.len())?;
    let mut data_loader =
        DataLoader::new(dataset, config.batch_size, true, drop_last, config.seed).with_device(device);

    let model = Wgan::new(config, device);
    info!(
        "Created {} WGAN: latent_dim={}, image={}x{}x{}",
        config.architecture, config.latent_dim, config.channels, config.image_size, config.image_size
    );

    let mut trainer = Trainer::new(config.clone(), device);
    trainer.train(&model, &mut data_loader)?;

    Ok(TrainingRun {
        model,
        metrics: trainer.into_metrics(),
    })
}

/// Whether the loader has to skip a trailing batch of exactly one image
///
/// Training-mode batch norm cannot normalize a single value per channel, so
/// that batch is dropped for networks that cannot take one image at a time.
fn drop_lone_trailing_image(config: &WganConfig, num_images: usize) -> Result<bool> {
    if supports_single_image_batches(config.architecture, config.image_size)
        || num_images % config.batch_size != 1
    {
        return Ok(false);
    }
    if num_images == 1 {
        return Err(WganError::InvalidConfig(format!(
            "one training image is too few for the {} architecture at image_size {}",
            config.architecture, config.image_size
        )));
    }
    warn!(
        "Dropping the trailing single-image batch: {} images in batches of {}",
        num_images, config.batch_size
    );
    Ok(true)
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}
