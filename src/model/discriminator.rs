//! Critic network for WGAN
//!
//! The critic scores images with an unbounded real value; higher means
//! "more like the training data". There is no sigmoid at the end.
//! Architecture uses strided 2D convolutions to downsample.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

use super::{leaky_relu, LEAKY_SLOPE};

/// Number of stride-2 stages
const STAGES: usize = 4;

/// Critic network configuration
#[derive(Debug, Clone)]
pub struct CriticConfig {
    /// Input image channels
    pub channels: i64,
    /// Input image side
    pub image_size: i64,
}

impl Default for CriticConfig {
    fn default() -> Self {
        Self {
            channels: 1,
            image_size: 28,
        }
    }
}

/// Spatial side after the four stride-2, padding-1, 3x3 convolutions
///
/// Each stage maps `s` to `ceil(s / 2)`, so 28 becomes 14, 7, 4, 2.
pub fn downsampled_size(image_size: i64) -> i64 {
    (0..STAGES).fold(image_size, |s, _| (s + 1) / 2)
}

/// Critic network
///
/// Architecture:
/// 1. Four Conv2d(stride 2) stages, BatchNorm on all but the first,
///    LeakyReLU(0.2) after each
/// 2. Flatten and Dense layer to one score per image
#[derive(Debug)]
pub struct Critic {
    config: CriticConfig,
    conv1: nn::Conv2D,
    conv2: nn::Conv2D,
    bn2: nn::BatchNorm,
    conv3: nn::Conv2D,
    bn3: nn::BatchNorm,
    conv4: nn::Conv2D,
    bn4: nn::BatchNorm,
    /// Final scoring layer
    fc: nn::Linear,
}

impl Critic {
    /// Create a new Critic network
    pub fn new(vs: &nn::Path, config: CriticConfig) -> Self {
        let conv_config = nn::ConvConfig {
            stride: 2,
            padding: 1,
            ..Default::default()
        };

        let conv1 = nn::conv2d(vs / "conv1", config.channels, 64, 3, conv_config);
        let conv2 = nn::conv2d(vs / "conv2", 64, 128, 3, conv_config);
        let bn2 = nn::batch_norm2d(vs / "bn2", 128, Default::default());
        let conv3 = nn::conv2d(vs / "conv3", 128, 256, 3, conv_config);
        let bn3 = nn::batch_norm2d(vs / "bn3", 256, Default::default());
        let conv4 = nn::conv2d(vs / "conv4", 256, 512, 3, conv_config);
        let bn4 = nn::batch_norm2d(vs / "bn4", 512, Default::default());

        let ds = downsampled_size(config.image_size);
        let fc = nn::linear(vs / "fc", 512 * ds * ds, 1, Default::default());

        Self {
            config,
            conv1,
            conv2,
            bn2,
            conv3,
            bn3,
            conv4,
            bn4,
            fc,
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    ///
    /// * `input` - Tensor of shape (batch_size, channels, image_size, image_size)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, 1) with raw scores
    pub fn forward_t(&self, input: &Tensor, train: bool) -> Tensor {
        let x = leaky_relu(&self.conv1.forward(input), LEAKY_SLOPE);

        let x = self.bn2.forward_t(&self.conv2.forward(&x), train);
        let x = leaky_relu(&x, LEAKY_SLOPE);

        let x = self.bn3.forward_t(&self.conv3.forward(&x), train);
        let x = leaky_relu(&x, LEAKY_SLOPE);

        let x = self.bn4.forward_t(&self.conv4.forward(&x), train);
        let x = leaky_relu(&x, LEAKY_SLOPE);

        let batch_size = x.size()[0];
        self.fc.forward(&x.view([batch_size, -1]))
    }

    /// Get configuration
    pub fn config(&self) -> &CriticConfig {
        &self.config
    }
}

impl ModuleT for Critic {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Critic::forward_t(self, xs, train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device, Kind};

    #[test]
    fn test_downsampled_size() {
        assert_eq!(downsampled_size(28), 2);
        assert_eq!(downsampled_size(32), 2);
        assert_eq!(downsampled_size(64), 4);
        assert_eq!(downsampled_size(8), 1);
    }

    #[test]
    fn test_critic_output_shape() {
        for (image_size, channels) in [(28, 1), (32, 3), (64, 1)] {
            let vs = VarStore::new(Device::Cpu);
            let critic = Critic::new(&vs.root(), CriticConfig { channels, image_size });

            let input = Tensor::randn(
                [4, channels, image_size, image_size],
                (Kind::Float, Device::Cpu),
            );
            let output = critic.forward_t(&input, true);

            assert_eq!(output.size(), vec![4, 1]);
        }
    }

    #[test]
    fn test_critic_single_image() {
        let vs = VarStore::new(Device::Cpu);
        let critic = Critic::new(&vs.root(), CriticConfig::default());

        let input = Tensor::randn([1, 1, 28, 28], (Kind::Float, Device::Cpu));
        let output = critic.forward_t(&input, false);

        assert_eq!(output.size(), vec![1, 1]);
    }

    #[test]
    fn test_critic_single_image_training_mode() {
        // At 28 the last stage still keeps a 2x2 map per channel
        let vs = VarStore::new(Device::Cpu);
        let critic = Critic::new(&vs.root(), CriticConfig::default());

        let input = Tensor::randn([1, 1, 28, 28], (Kind::Float, Device::Cpu));
        let output = critic.forward_t(&input, true);

        assert_eq!(output.size(), vec![1, 1]);
        assert!(output.double_value(&[0, 0]).is_finite());
    }

    #[test]
    fn test_scores_are_unbounded() {
        let vs = VarStore::new(Device::Cpu);
        let critic = Critic::new(&vs.root(), CriticConfig::default());
        tch::no_grad(|| {
            for mut v in vs.trainable_variables() {
                let _ = v.fill_(1.0);
            }
        });

        let input = Tensor::ones([2, 1, 28, 28], (Kind::Float, Device::Cpu));
        let output = critic.forward_t(&input, false);

        assert!(output.max().double_value(&[]) > 1.0);
    }
}
