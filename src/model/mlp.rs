//! Fully-connected generator and critic
//!
//! Flat alternative to the convolutional pair. Works for any image size.

use tch::{nn, nn::ModuleT, Tensor};

use super::{leaky_relu, LEAKY_SLOPE};

/// Hidden widths of the generator blocks
const GEN_HIDDEN: [i64; 4] = [128, 256, 512, 1024];

/// Fully-connected generator
///
/// Linear blocks with BatchNorm1d (eps 0.8, except the first block) and
/// LeakyReLU(0.2), then a linear projection to the flattened image and tanh.
#[derive(Debug)]
pub struct MlpGenerator {
    net: nn::SequentialT,
    channels: i64,
    image_size: i64,
}

impl MlpGenerator {
    pub fn new(vs: &nn::Path, latent_dim: i64, channels: i64, image_size: i64) -> Self {
        let bn_config = nn::BatchNormConfig {
            eps: 0.8,
            ..Default::default()
        };

        let mut net = nn::seq_t();
        let mut in_dim = latent_dim;
        for (i, &out_dim) in GEN_HIDDEN.iter().enumerate() {
            net = net.add(nn::linear(
                vs / format!("fc{}", i + 1),
                in_dim,
                out_dim,
                Default::default(),
            ));
            if i > 0 {
                net = net.add(nn::batch_norm1d(vs / format!("bn{}", i + 1), out_dim, bn_config));
            }
            net = net.add_fn(|x| leaky_relu(x, LEAKY_SLOPE));
            in_dim = out_dim;
        }
        let net = net
            .add(nn::linear(
                vs / "out",
                in_dim,
                channels * image_size * image_size,
                Default::default(),
            ))
            .add_fn(|x| x.tanh());

        Self {
            net,
            channels,
            image_size,
        }
    }
}

impl ModuleT for MlpGenerator {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let batch_size = xs.size()[0];
        self.net
            .forward_t(xs, train)
            .view([batch_size, self.channels, self.image_size, self.image_size])
    }
}

/// Fully-connected critic: flatten, 512, 256, 1
#[derive(Debug)]
pub struct MlpCritic {
    net: nn::SequentialT,
}

impl MlpCritic {
    pub fn new(vs: &nn::Path, channels: i64, image_size: i64) -> Self {
        let net = nn::seq_t()
            .add(nn::linear(
                vs / "fc1",
                channels * image_size * image_size,
                512,
                Default::default(),
            ))
            .add_fn(|x| leaky_relu(x, LEAKY_SLOPE))
            .add(nn::linear(vs / "fc2", 512, 256, Default::default()))
            .add_fn(|x| leaky_relu(x, LEAKY_SLOPE))
            .add(nn::linear(vs / "fc3", 256, 1, Default::default()));

        Self { net }
    }
}

impl ModuleT for MlpCritic {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        let batch_size = xs.size()[0];
        self.net.forward_t(&xs.view([batch_size, -1]), train)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::{nn::VarStore, Device, Kind};

    #[test]
    fn test_mlp_shapes() {
        let gen_vs = VarStore::new(Device::Cpu);
        let critic_vs = VarStore::new(Device::Cpu);
        let gen = MlpGenerator::new(&gen_vs.root(), 10, 1, 30);
        let critic = MlpCritic::new(&critic_vs.root(), 1, 30);

        let noise = Tensor::randn([4, 10], (Kind::Float, Device::Cpu));
        let images = gen.forward_t(&noise, true);
        assert_eq!(images.size(), vec![4, 1, 30, 30]);

        let scores = critic.forward_t(&images, true);
        assert_eq!(scores.size(), vec![4, 1]);
    }
}
