//! Loss functions for WGAN training
//!
//! Wasserstein critic and generator objectives. Both use batch means, so
//! they do not depend on batch size.

use tch::{Kind, Tensor};

/// Critic loss: E[D(G(z))] - E[D(x)]
///
/// Minimizing this maximizes the critic's estimate of the Earth-Mover
/// distance between real and generated data.
///
/// # Arguments
///
/// * `real_scores` - Critic output on real images
/// * `fake_scores` - Critic output on generated images
///
/// # Returns
///
/// Scalar loss tensor
pub fn critic_loss(real_scores: &Tensor, fake_scores: &Tensor) -> Tensor {
    -real_scores.mean(Kind::Float) + fake_scores.mean(Kind::Float)
}

/// Generator loss: -E[D(G(z))]
pub fn generator_loss(fake_scores: &Tensor) -> Tensor {
    -fake_scores.mean(Kind::Float)
}
