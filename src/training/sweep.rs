//! Single-hyperparameter sweeps
//!
//! Runs one full training job per value, each writing into its own
//! `<prefix>/<value>` run directory.

use tracing::info;

use super::metrics::TrainingMetrics;
use super::trainer::run;
use crate::error::{Result, WganError};
use crate::utils::WganConfig;

/// Hyperparameter varied by a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SweepParam {
    /// Critic weight clamp bound
    ClipValue,
    /// Latent vector length
    LatentDim,
    /// Shared RMSProp learning rate
    LearningRate,
}

impl SweepParam {
    /// Values swept when none are given
    pub fn default_values(&self) -> Vec<f64> {
        match self {
            SweepParam::ClipValue => vec![0.01, 0.05, 0.1, 0.2, 0.5],
            SweepParam::LatentDim => vec![100.0, 200.0, 300.0, 400.0, 500.0],
            SweepParam::LearningRate => vec![0.00005, 0.0001, 0.0005, 0.001, 0.005],
        }
    }

    /// Run directory prefix
    pub fn dir_prefix(&self) -> &'static str {
        match self {
            SweepParam::ClipValue => "clip_value",
            SweepParam::LatentDim => "latent_dims",
            SweepParam::LearningRate => "lr",
        }
    }

    /// Derive the run configuration for one value
    pub fn apply(&self, base: &WganConfig, value: f64) -> Result<WganConfig> {
        let mut config = base.clone();
        let label = match self {
            SweepParam::ClipValue => {
                config.clip_value = value;
                float_label(value)
            }
            SweepParam::LatentDim => {
                if value.fract() != 0.0 || value <= 0.0 {
                    return Err(WganError::InvalidConfig(format!(
                        "latent_dim sweep values must be positive integers, got {}",
                        value
                    )));
                }
                config.latent_dim = value as i64;
                config.latent_dim.to_string()
            }
            SweepParam::LearningRate => {
                config.learning_rate = value;
                float_label(value)
            }
        };
        config.run_path = format!("{}/{}", self.dir_prefix(), label);
        config.validate()?;
        Ok(config)
    }
}

/// Train once per value, in order, stopping at the first failure
///
/// Every derived configuration is validated before the first run starts.
pub fn run_sweep(
    base: &WganConfig,
    param: SweepParam,
    values: &[f64],
) -> Result<Vec<(WganConfig, TrainingMetrics)>> {
    let configs = values
        .iter()
        .map(|&v| param.apply(base, v))
        .collect::<Result<Vec<_>>>()?;

    let mut results = Vec::with_capacity(configs.len());
    for (i, config) in configs.into_iter().enumerate() {
        info!(
            "Sweep {:?} run {}/{}: {}",
            param,
            i + 1,
            values.len(),
            config.run_path
        );
        let outcome = run(&config)?;
        results.push((config, outcome.metrics));
    }

    Ok(results)
}

/// Directory label for a float: shortest digits, exponent form below 1e-4
/// or from 1e16 up with a signed two-digit exponent (`5e-05`), and a `.0`
/// suffix on whole numbers (`1.0`)
fn float_label(value: f64) -> String {
    let sci = format!("{:e}", value);
    let exponent = sci
        .split_once('e')
        .and_then(|(mantissa, exp)| exp.parse::<i32>().ok().map(|exp| (mantissa, exp)));

    match exponent {
        Some((mantissa, exp)) if exp < -4 || exp >= 16 => {
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        _ => {
            let plain = value.to_string();
            if plain.contains('.') || !value.is_finite() {
                plain
            } else {
                format!("{}.0", plain)
            }
        }
    }
}
