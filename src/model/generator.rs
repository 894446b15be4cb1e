//! Generator network for WGAN
//!
//! The Generator transforms latent noise vectors into images.
//! Architecture projects to a quarter-resolution feature grid, then doubles
//! the resolution twice with nearest upsampling followed by 3x3 convolutions.

use tch::{nn, nn::Module, nn::ModuleT, Tensor};

/// Feature maps in the initial projected grid
const INIT_CHANNELS: i64 = 128;

/// Generator network configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Size of the latent noise vector
    pub latent_dim: i64,
    /// Output image channels
    pub channels: i64,
    /// Output image side; must be divisible by 4
    pub image_size: i64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            latent_dim: 100,
            channels: 1,
            image_size: 28,
        }
    }
}

/// Generator network
///
/// Architecture:
/// 1. Dense layer from latent space to 128 maps at `image_size / 4`
/// 2. Two upsample + Conv2d + BatchNorm + ReLU stages
/// 3. Final Conv2d with Tanh activation
#[derive(Debug)]
pub struct Generator {
    config: GeneratorConfig,
    /// Initial dense projection
    fc: nn::Linear,
    bn0: nn::BatchNorm,
    conv1: nn::Conv2D,
    bn1: nn::BatchNorm,
    conv2: nn::Conv2D,
    bn2: nn::BatchNorm,
    conv3: nn::Conv2D,
}

impl Generator {
    /// Create a new Generator network
    pub fn new(vs: &nn::Path, config: GeneratorConfig) -> Self {
        let init_size = config.image_size / 4;

        let fc = nn::linear(
            vs / "fc",
            config.latent_dim,
            INIT_CHANNELS * init_size * init_size,
            Default::default(),
        );

        let conv_config = nn::ConvConfig {
            stride: 1,
            padding: 1,
            ..Default::default()
        };

        let bn0 = nn::batch_norm2d(vs / "bn0", INIT_CHANNELS, Default::default());
        let conv1 = nn::conv2d(vs / "conv1", INIT_CHANNELS, 128, 3, conv_config);
        let bn1 = nn::batch_norm2d(vs / "bn1", 128, Default::default());
        let conv2 = nn::conv2d(vs / "conv2", 128, 64, 3, conv_config);
        let bn2 = nn::batch_norm2d(vs / "bn2", 64, Default::default());
        let conv3 = nn::conv2d(vs / "conv3", 64, config.channels, 3, conv_config);

        Self {
            config,
            fc,
            bn0,
            conv1,
            bn1,
            conv2,
            bn2,
            conv3,
        }
    }

    /// Generate images from noise
    ///
    /// # Arguments
    ///
    /// * `noise` - Tensor of shape (batch_size, latent_dim)
    /// * `train` - Whether in training mode (affects batch norm)
    ///
    /// # Returns
    ///
    /// Tensor of shape (batch_size, channels, image_size, image_size) in [-1, 1]
    pub fn forward_t(&self, noise: &Tensor, train: bool) -> Tensor {
        let batch_size = noise.size()[0];
        let init_size = self.config.image_size / 4;

        let x = self.fc.forward(noise);
        let x = x.view([batch_size, INIT_CHANNELS, init_size, init_size]);
        let x = self.bn0.forward_t(&x, train);

        let x = upsample2x(&x);
        let x = self.conv1.forward(&x);
        let x = self.bn1.forward_t(&x, train).relu();

        let x = upsample2x(&x);
        let x = self.conv2.forward(&x);
        let x = self.bn2.forward_t(&x, train).relu();

        self.conv3.forward(&x).tanh()
    }

    /// Get configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

impl ModuleT for Generator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        Generator::forward_t(self, xs, train)
    }
}

/// Nearest-neighbour upsampling by a factor of two
fn upsample2x(xs: &Tensor) -> Tensor {
    let size = xs.size();
    xs.upsample_nearest2d([size[2] * 2, size[3] * 2], None::<f64>, None::<f64>)
}
