//! Configuration management
//!
//! One immutable hyperparameter snapshot per training run. Values come from
//! defaults, an optional TOML/JSON file, and command-line overrides, in that
//! order of precedence.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, WganError};

/// Network family used for both generator and critic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// Upsample/strided-convolution pair
    Conv,
    /// Fully-connected pair
    Mlp,
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Architecture::Conv => write!(f, "conv"),
            Architecture::Mlp => write!(f, "mlp"),
        }
    }
}

/// Hyperparameters for one WGAN run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WganConfig {
    /// Number of passes over the dataset
    pub epochs: usize,
    /// Images per batch
    pub batch_size: usize,
    /// RMSProp learning rate shared by both networks
    pub learning_rate: f64,
    /// Length of the latent noise vector
    pub latent_dim: i64,
    /// Side of the square images
    pub image_size: i64,
    /// Image channel count
    pub channels: i64,
    /// Critic updates per generator update (`n_critic`)
    pub critic_steps_per_gen_step: usize,
    /// Critic weights are clamped to `[-clip_value, clip_value]`
    pub clip_value: f64,
    /// Accepted for command-line compatibility; sampling happens once per epoch
    pub sample_interval: usize,
    /// CUDA device ordinal
    pub device_id: usize,
    /// Output subdirectory under `output_root`
    pub run_path: String,
    /// Root directory for sample grids
    pub output_root: PathBuf,
    /// Directory holding the MNIST IDX files
    pub data_dir: PathBuf,
    /// Train on this many random images instead of MNIST
    pub synthetic_samples: Option<usize>,
    /// Seed for parameter init, noise and shuffling
    pub seed: Option<u64>,
    /// Network family
    pub architecture: Architecture,
    /// Never use CUDA, even when available
    pub cpu: bool,
}

impl Default for WganConfig {
    fn default() -> Self {
        Self {
            epochs: 500,
            batch_size: 512,
            learning_rate: 0.00005,
            latent_dim: 100,
            image_size: 28,
            channels: 1,
            critic_steps_per_gen_step: 5,
            clip_value: 0.01,
            sample_interval: 400,
            device_id: 0,
            run_path: "test".to_string(),
            output_root: PathBuf::from("result"),
            data_dir: PathBuf::from("data/mnist"),
            synthetic_samples: None,
            seed: None,
            architecture: Architecture::Conv,
            cpu: false,
        }
    }
}

impl WganConfig {
    /// Load configuration from TOML file
    pub fn from_toml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save configuration to TOML file
    pub fn save_toml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to JSON file
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from a `.toml` or `.json` file, picked by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if is_toml(path) {
            Self::from_toml(path)
        } else {
            Self::from_json(path)
        }
    }

    /// Save to a `.toml` or `.json` file, picked by extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if is_toml(path) {
            self.save_toml(path)
        } else {
            self.save_json(path)
        }
    }

    /// Validate configuration
    ///
    /// Every check here runs before the networks or the device are touched,
    /// so a bad option combination never fails mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(invalid("epochs must be > 0"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be > 0"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if self.latent_dim <= 0 {
            return Err(invalid("latent_dim must be > 0"));
        }
        if self.channels <= 0 {
            return Err(invalid("channels must be > 0"));
        }
        if self.image_size <= 0 {
            return Err(invalid("image_size must be > 0"));
        }
        if self.architecture == Architecture::Conv && self.image_size % 4 != 0 {
            return Err(invalid(format!(
                "image_size must be divisible by 4 for the conv architecture, got {}",
                self.image_size
            )));
        }
        if self.batch_size == 1
            && !crate::model::supports_single_image_batches(self.architecture, self.image_size)
        {
            return Err(invalid(format!(
                "batch_size 1 leaves batch norm one value per channel for the {} architecture at image_size {}",
                self.architecture, self.image_size
            )));
        }
        if self.critic_steps_per_gen_step == 0 {
            return Err(invalid("critic_steps_per_gen_step must be > 0"));
        }
        if !(self.clip_value.is_finite() && self.clip_value >= 0.0) {
            return Err(invalid(format!(
                "clip_value must be a non-negative number, got {}",
                self.clip_value
            )));
        }
        if self.run_path.trim().is_empty() {
            return Err(invalid("run_path must not be empty"));
        }
        if self.synthetic_samples == Some(0) {
            return Err(invalid("synthetic dataset must hold at least one image"));
        }
        Ok(())
    }

    /// Resolve the compute device
    ///
    /// Without CUDA the run falls back to the CPU; with CUDA an out-of-range
    /// `device_id` is an error.
    pub fn device(&self) -> Result<tch::Device> {
        if self.cpu {
            return Ok(tch::Device::Cpu);
        }
        if tch::Cuda::is_available() {
            let count = tch::Cuda::device_count();
            if (self.device_id as i64) < count {
                Ok(tch::Device::Cuda(self.device_id))
            } else {
                Err(WganError::DeviceUnavailable(format!(
                    "cuda:{} requested but only {} device(s) present",
                    self.device_id, count
                )))
            }
        } else {
            tracing::warn!("CUDA not available, falling back to CPU");
            Ok(tch::Device::Cpu)
        }
    }

    /// Directory receiving this run's sample grids
    pub fn run_dir(&self) -> PathBuf {
        self.output_root.join(&self.run_path)
    }

    /// Path of the sample grid written at the end of `epoch`
    pub fn sample_path(&self, epoch: usize) -> PathBuf {
        self.run_dir().join(format!("epoch{}.png", epoch))
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|e| e == "toml").unwrap_or(false)
}

fn invalid(msg: impl Into<String>) -> WganError {
    WganError::InvalidConfig(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = WganConfig::default();
        assert_eq!(config.epochs, 500);
        assert_eq!(config.batch_size, 512);
        assert_eq!(config.learning_rate, 0.00005);
        assert_eq!(config.latent_dim, 100);
        assert_eq!(config.image_size, 28);
        assert_eq!(config.channels, 1);
        assert_eq!(config.critic_steps_per_gen_step, 5);
        assert_eq!(config.clip_value, 0.01);
        assert_eq!(config.sample_interval, 400);
        assert_eq!(config.device_id, 0);
        assert_eq!(config.run_path, "test");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = WganConfig::default();
        config.image_size = 30;
        assert!(matches!(config.validate(), Err(WganError::InvalidConfig(_))));

        // The fully-connected pair has no divisibility constraint
        config.architecture = Architecture::Mlp;
        assert!(config.validate().is_ok());

        let mut config = WganConfig::default();
        config.critic_steps_per_gen_step = 0;
        assert!(config.validate().is_err());

        let mut config = WganConfig::default();
        config.clip_value = -0.1;
        assert!(config.validate().is_err());

        let mut config = WganConfig::default();
        config.clip_value = 0.0;
        assert!(config.validate().is_ok());

        let mut config = WganConfig::default();
        config.learning_rate = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = WganConfig::default();
        config.run_path = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_single_image_batches_need_room_for_batch_norm() {
        let mut config = WganConfig::default();
        config.batch_size = 1;
        assert!(config.validate().is_ok());

        config.image_size = 8;
        assert!(matches!(config.validate(), Err(WganError::InvalidConfig(_))));

        let mut config = WganConfig::default();
        config.batch_size = 1;
        config.architecture = Architecture::Mlp;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut config = WganConfig::default();
        config.clip_value = 0.05;
        config.seed = Some(7);
        config.architecture = Architecture::Mlp;

        let toml_path = dir.path().join("config.toml");
        config.save(&toml_path).unwrap();
        assert_eq!(WganConfig::load(&toml_path).unwrap(), config);

        let json_path = dir.path().join("config.json");
        config.save(&json_path).unwrap();
        assert_eq!(WganConfig::load(&json_path).unwrap(), config);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: WganConfig = toml::from_str("clip_value = 0.2\nrun_path = \"clip\"").unwrap();
        assert_eq!(config.clip_value, 0.2);
        assert_eq!(config.run_path, "clip");
        assert_eq!(config.batch_size, 512);
    }

    #[test]
    fn test_sample_path() {
        let mut config = WganConfig::default();
        config.output_root = PathBuf::from("out");
        config.run_path = "clip_value/0.01".to_string();
        assert_eq!(
            config.sample_path(3),
            PathBuf::from("out/clip_value/0.01/epoch3.png")
        );
    }

    #[test]
    fn test_forced_cpu_device() {
        let config = WganConfig {
            cpu: true,
            ..Default::default()
        };
        assert_eq!(config.device().unwrap(), tch::Device::Cpu);
    }
}
