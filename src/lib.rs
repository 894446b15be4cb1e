//! # WGAN for image generation
//!
//! This crate trains a Wasserstein GAN with weight clipping on square images
//! (MNIST by default).
//!
//! ## Modules
//!
//! - `data`: Image datasets and batching
//! - `model`: Generator and critic networks
//! - `training`: Training loop, losses and sweeps
//! - `utils`: Configuration and sample grid output
//! - `error`: Crate error type

pub mod data;
pub mod error;
pub mod model;
pub mod training;
pub mod utils;

pub use data::{DataLoader, ImageDataset};
pub use error::{Result, WganError};
pub use model::{Critic, Generator, Wgan};
pub use training::{run, run_sweep, SweepParam, Trainer, TrainingMetrics};
pub use utils::{Architecture, WganConfig};
