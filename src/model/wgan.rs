//! WGAN wrapper combining Generator and Critic
//!
//! Owns both networks, their variable stores, and the device they live on.
//! The critic's weight clipping is exposed here as a transform over its
//! parameter collection, independent of the optimizer.

use tch::{nn, nn::ModuleT, nn::OptimizerConfig, nn::VarStore, Device, Kind, Tensor};

use super::discriminator::{Critic, CriticConfig};
use super::generator::{Generator, GeneratorConfig};
use super::mlp::{MlpCritic, MlpGenerator};
use crate::error::Result;
use crate::utils::{Architecture, WganConfig};

/// RMSProp optimizer pair, one per network
pub struct WganOptimizers {
    pub generator: nn::Optimizer,
    pub critic: nn::Optimizer,
}

/// Complete WGAN model
pub struct Wgan {
    generator: Box<dyn ModuleT>,
    critic: Box<dyn ModuleT>,
    /// Variable store for generator
    pub gen_vs: VarStore,
    /// Variable store for critic
    pub critic_vs: VarStore,
    /// Device (CPU/GPU)
    pub device: Device,
    latent_dim: i64,
    channels: i64,
    image_size: i64,
}

impl Wgan {
    /// Build both networks from the run configuration
    ///
    /// Parameters are initialized from the libtorch generator; call
    /// `tch::manual_seed` first for a reproducible run.
    pub fn new(config: &WganConfig, device: Device) -> Self {
        let gen_vs = VarStore::new(device);
        let critic_vs = VarStore::new(device);

        let (generator, critic): (Box<dyn ModuleT>, Box<dyn ModuleT>) = match config.architecture {
            Architecture::Conv => (
                Box::new(Generator::new(
                    &gen_vs.root(),
                    GeneratorConfig {
                        latent_dim: config.latent_dim,
                        channels: config.channels,
                        image_size: config.image_size,
                    },
                )),
                Box::new(Critic::new(
                    &critic_vs.root(),
                    CriticConfig {
                        channels: config.channels,
                        image_size: config.image_size,
                    },
                )),
            ),
            Architecture::Mlp => (
                Box::new(MlpGenerator::new(
                    &gen_vs.root(),
                    config.latent_dim,
                    config.channels,
                    config.image_size,
                )),
                Box::new(MlpCritic::new(
                    &critic_vs.root(),
                    config.channels,
                    config.image_size,
                )),
            ),
        };

        Self {
            generator,
            critic,
            gen_vs,
            critic_vs,
            device,
            latent_dim: config.latent_dim,
            channels: config.channels,
            image_size: config.image_size,
        }
    }

    /// Draw `n` standard-normal latent vectors on the model device
    pub fn sample_latent(&self, n: i64) -> Tensor {
        Tensor::randn([n, self.latent_dim], (Kind::Float, self.device))
    }

    /// Generate images from specific noise vectors
    pub fn generate_from_noise(&self, noise: &Tensor, train: bool) -> Tensor {
        self.generator.forward_t(noise, train)
    }

    /// Generate `n` images from fresh noise, without tracking gradients
    pub fn generate(&self, n: i64) -> Tensor {
        let noise = self.sample_latent(n);
        tch::no_grad(|| self.generator.forward_t(&noise, true))
    }

    /// Critic scores, shape (batch_size, 1)
    pub fn score(&self, images: &Tensor, train: bool) -> Tensor {
        self.critic.forward_t(images, train)
    }

    /// RMSProp optimizers for both networks, sharing one learning rate
    pub fn optimizers(&self, lr: f64) -> Result<WganOptimizers> {
        let rmsprop = nn::RmsProp {
            alpha: 0.99,
            eps: 1e-8,
            wd: 0.0,
            momentum: 0.0,
            centered: false,
        };
        Ok(WganOptimizers {
            generator: rmsprop.build(&self.gen_vs, lr)?,
            critic: rmsprop.build(&self.critic_vs, lr)?,
        })
    }

    /// Clamp every critic parameter into `[-clip_value, clip_value]` in place
    ///
    /// Batch-norm running statistics are buffers, not parameters, and are
    /// left untouched.
    pub fn clip_critic(&self, clip_value: f64) {
        tch::no_grad(|| {
            for mut var in self.critic_vs.trainable_variables() {
                let _ = var.clamp_(-clip_value, clip_value);
            }
        });
    }

    /// Largest absolute value over all critic parameters
    pub fn critic_max_abs(&self) -> f64 {
        self.critic_vs
            .trainable_variables()
            .iter()
            .map(|v| v.abs().max().double_value(&[]))
            .fold(0.0, f64::max)
    }

    /// Critic variables sorted by name
    pub fn critic_parameters(&self) -> Vec<(String, Tensor)> {
        sorted_variables(&self.critic_vs)
    }

    /// Generator variables sorted by name
    pub fn generator_parameters(&self) -> Vec<(String, Tensor)> {
        sorted_variables(&self.gen_vs)
    }

    /// Get latent dimension
    pub fn latent_dim(&self) -> i64 {
        self.latent_dim
    }

    /// Get image channel count
    pub fn channels(&self) -> i64 {
        self.channels
    }

    /// Get image side
    pub fn image_size(&self) -> i64 {
        self.image_size
    }
}

fn sorted_variables(vs: &VarStore) -> Vec<(String, Tensor)> {
    let mut vars: Vec<_> = vs.variables().into_iter().collect();
    vars.sort_by(|a, b| a.0.cmp(&b.0));
    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config(architecture: Architecture) -> WganConfig {
        WganConfig {
            latent_dim: 8,
            image_size: 12,
            architecture,
            ..Default::default()
        }
    }

    #[test]
    fn test_wgan_generate() {
        for arch in [Architecture::Conv, Architecture::Mlp] {
            let wgan = Wgan::new(&small_config(arch), Device::Cpu);

            let samples = wgan.generate(4);
            assert_eq!(samples.size(), vec![4, 1, 12, 12]);
            assert_eq!(wgan.score(&samples, true).size(), vec![4, 1]);
        }
    }

    #[test]
    fn test_clip_critic() {
        let wgan = Wgan::new(&small_config(Architecture::Conv), Device::Cpu);
        tch::no_grad(|| {
            for mut v in wgan.critic_vs.trainable_variables() {
                let _ = v.fill_(3.0);
            }
        });
        assert!(wgan.critic_max_abs() > 0.5);

        wgan.clip_critic(0.5);
        assert!(wgan.critic_max_abs() <= 0.5);
    }

    #[test]
    fn test_clip_leaves_generator_alone() {
        let wgan = Wgan::new(&small_config(Architecture::Conv), Device::Cpu);
        let before: Vec<Tensor> = wgan
            .generator_parameters()
            .iter()
            .map(|(_, t)| t.copy())
            .collect();

        wgan.clip_critic(0.0);

        for ((_, after), before) in wgan.generator_parameters().iter().zip(before.iter()) {
            assert!(after.equal(before));
        }
        assert_eq!(wgan.critic_max_abs(), 0.0);
    }

    #[test]
    fn test_optimizers_build() {
        let wgan = Wgan::new(&small_config(Architecture::Mlp), Device::Cpu);
        assert!(wgan.optimizers(5e-5).is_ok());
    }
}
