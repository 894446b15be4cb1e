//! Model module containing WGAN architecture components
//!
//! This module provides:
//! - Convolutional generator and critic
//! - Fully-connected generator and critic
//! - WGAN wrapper owning both networks and their parameters

mod discriminator;
mod generator;
mod mlp;
mod wgan;

pub use discriminator::{downsampled_size, Critic, CriticConfig};
pub use generator::{Generator, GeneratorConfig};
pub use mlp::{MlpCritic, MlpGenerator};
pub use wgan::{Wgan, WganOptimizers};

use tch::Tensor;

use crate::utils::Architecture;

/// Negative slope used by every leaky activation in the critic
pub const LEAKY_SLOPE: f64 = 0.2;

/// LeakyReLU with a configurable negative slope
///
/// `Tensor::leaky_relu` is fixed at 0.01.
pub(crate) fn leaky_relu(xs: &Tensor, slope: f64) -> Tensor {
    xs.maximum(&(xs * slope))
}

/// Whether a training-mode batch of one image is safe for `architecture`
///
/// Training-mode batch norm needs more than one value per channel. The MLP
/// generator normalizes flat features, so one image is never enough; the conv
/// networks fail once the last critic stage (or the generator's first grid)
/// shrinks to 1x1.
pub fn supports_single_image_batches(architecture: Architecture, image_size: i64) -> bool {
    match architecture {
        Architecture::Conv => downsampled_size(image_size) > 1 && image_size / 4 > 1,
        Architecture::Mlp => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_image_batch_support() {
        assert!(supports_single_image_batches(Architecture::Conv, 28));
        assert!(supports_single_image_batches(Architecture::Conv, 20));
        assert!(!supports_single_image_batches(Architecture::Conv, 16));
        assert!(!supports_single_image_batches(Architecture::Conv, 8));
        assert!(!supports_single_image_batches(Architecture::Mlp, 28));
    }
}
