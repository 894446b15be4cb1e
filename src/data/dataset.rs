//! Image datasets
//!
//! Every dataset holds one tensor of shape (N, C, H, W) with values in
//! [-1, 1], the range of the generator's tanh output.

use std::path::Path;

use tch::{Device, Kind, Tensor};

use crate::error::{Result, WganError};

/// Side length of MNIST digits
pub const MNIST_IMAGE_SIZE: i64 = 28;

const MNIST_FILES: [&str; 4] = [
    "train-images-idx3-ubyte",
    "train-labels-idx1-ubyte",
    "t10k-images-idx3-ubyte",
    "t10k-labels-idx1-ubyte",
];

/// In-memory collection of normalized images
#[derive(Debug)]
pub struct ImageDataset {
    images: Tensor,
}

impl ImageDataset {
    /// Wrap an existing (N, C, H, W) tensor
    pub fn from_tensor(images: Tensor) -> Result<Self> {
        let size = images.size();
        if size.len() != 4 || size[2] != size[3] {
            return Err(WganError::ShapeMismatch(format!(
                "expected square images shaped (N, C, H, W), got {:?}",
                size
            )));
        }
        Ok(Self {
            images: images.to_kind(Kind::Float),
        })
    }

    /// Load the MNIST training split from uncompressed IDX files
    ///
    /// Pixels are mapped from [0, 1] to [-1, 1]. Images are bilinearly
    /// resized when `image_size` differs from 28. `dir` is created when
    /// missing, so the IDX files have somewhere to go.
    pub fn from_mnist_dir(dir: impl AsRef<Path>, image_size: i64) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let missing: Vec<_> = MNIST_FILES
            .iter()
            .filter(|name| !dir.join(name).exists())
            .collect();
        if !missing.is_empty() {
            return Err(WganError::Dataset(format!(
                "MNIST files {:?} not found in {}",
                missing,
                dir.display()
            )));
        }

        let mnist = tch::vision::mnist::load_dir(dir)
            .map_err(|e| WganError::Dataset(format!("failed to read MNIST: {}", e)))?;

        let images = mnist
            .train_images
            .view([-1, 1, MNIST_IMAGE_SIZE, MNIST_IMAGE_SIZE])
            .to_kind(Kind::Float);
        let images = (images - 0.5) / 0.5;

        let images = if image_size != MNIST_IMAGE_SIZE {
            images.upsample_bilinear2d([image_size, image_size], false, None::<f64>, None::<f64>)
        } else {
            images
        };

        tracing::info!(
            "Loaded {} MNIST images from {}",
            images.size()[0],
            dir.display()
        );
        Self::from_tensor(images)
    }

    /// Uniform noise images in [-1, 1]
    ///
    /// Drawn from the libtorch generator, so `tch::manual_seed` makes it
    /// reproducible.
    pub fn synthetic(num_images: usize, channels: i64, image_size: i64) -> Self {
        let images = Tensor::rand(
            [num_images as i64, channels, image_size, image_size],
            (Kind::Float, Device::Cpu),
        ) * 2.0
            - 1.0;
        Self { images }
    }

    /// Number of images
    pub fn len(&self) -> usize {
        self.images.size()[0] as usize
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Channel count
    pub fn channels(&self) -> i64 {
        self.images.size()[1]
    }

    /// Side of the square images
    pub fn image_size(&self) -> i64 {
        self.images.size()[2]
    }

    /// Underlying (N, C, H, W) tensor
    pub fn images(&self) -> &Tensor {
        &self.images
    }

    /// Fail unless images match the configured geometry
    pub fn check_geometry(&self, channels: i64, image_size: i64) -> Result<()> {
        if self.channels() != channels || self.image_size() != image_size {
            return Err(WganError::ShapeMismatch(format!(
                "dataset images are {}x{}x{}, config expects {}x{}x{}",
                self.channels(),
                self.image_size(),
                self.image_size(),
                channels,
                image_size,
                image_size
            )));
        }
        Ok(())
    }
}
