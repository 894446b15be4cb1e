//! WGAN training CLI
//!
//! Main entry point providing:
//! - Training one WGAN run
//! - Sweeping one hyperparameter over a list of values
//! - Writing a default configuration file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wgan_mnist::{run, run_sweep, Architecture, SweepParam, WganConfig};

/// Wasserstein GAN with weight clipping
#[derive(Parser)]
#[command(name = "wgan")]
#[command(version)]
#[command(about = "Train a weight-clipped WGAN on image data")]
struct Cli {
    /// Verbosity level
    #[arg(short, long, global = true, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train one model
    Train(TrainArgs),

    /// Train once per value of one hyperparameter
    Sweep {
        /// Hyperparameter to vary
        #[arg(long, value_enum)]
        param: SweepParam,

        /// Values to try (comma separated); built-in list when omitted
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        values: Vec<f64>,

        #[command(flatten)]
        base: TrainArgs,
    },

    /// Write a default configuration file
    Init {
        /// Output path; `.toml` or `.json`
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

/// Run options; anything given here overrides the config file
#[derive(Args, Debug)]
struct TrainArgs {
    /// Configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of epochs
    #[arg(long, alias = "n_epochs")]
    epochs: Option<usize>,

    /// Images per batch
    #[arg(long, alias = "batch_size")]
    batch_size: Option<usize>,

    /// Shared RMSProp learning rate
    #[arg(long, aliases = ["lr", "learning_rate"])]
    learning_rate: Option<f64>,

    /// Latent vector length
    #[arg(long, alias = "latent_dim")]
    latent_dim: Option<i64>,

    /// Square image side
    #[arg(long, aliases = ["img_size", "image_size"])]
    image_size: Option<i64>,

    /// Image channels
    #[arg(long)]
    channels: Option<i64>,

    /// Critic updates per generator update
    #[arg(long, aliases = ["n_critic", "critic_steps_per_gen_step"])]
    critic_steps_per_gen_step: Option<usize>,

    /// Critic weight clamp bound
    #[arg(long, alias = "clip_value")]
    clip_value: Option<f64>,

    /// Accepted for compatibility; samples are written once per epoch
    #[arg(long, alias = "sample_interval")]
    sample_interval: Option<usize>,

    /// CUDA device ordinal
    #[arg(long, alias = "device_id")]
    device_id: Option<usize>,

    /// Output subdirectory under the output root
    #[arg(long, aliases = ["image_path", "run_path"])]
    run_path: Option<String>,

    /// Root directory for sample grids
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Directory holding the MNIST IDX files
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Train on this many random images instead of MNIST
    #[arg(long)]
    synthetic: Option<usize>,

    /// Random seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Network family
    #[arg(long, value_enum)]
    architecture: Option<Architecture>,

    /// Force CPU even when CUDA is available
    #[arg(long)]
    cpu: bool,
}

impl TrainArgs {
    /// Defaults, then the config file, then command-line values
    fn resolve(&self) -> Result<WganConfig> {
        let mut config = match &self.config {
            Some(path) => WganConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => WganConfig::default(),
        };

        if let Some(v) = self.epochs {
            config.epochs = v;
        }
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if let Some(v) = self.learning_rate {
            config.learning_rate = v;
        }
        if let Some(v) = self.latent_dim {
            config.latent_dim = v;
        }
        if let Some(v) = self.image_size {
            config.image_size = v;
        }
        if let Some(v) = self.channels {
            config.channels = v;
        }
        if let Some(v) = self.critic_steps_per_gen_step {
            config.critic_steps_per_gen_step = v;
        }
        if let Some(v) = self.clip_value {
            config.clip_value = v;
        }
        if let Some(v) = self.sample_interval {
            config.sample_interval = v;
        }
        if let Some(v) = self.device_id {
            config.device_id = v;
        }
        if let Some(v) = &self.run_path {
            config.run_path = v.clone();
        }
        if let Some(v) = &self.output_root {
            config.output_root = v.clone();
        }
        if let Some(v) = &self.data_dir {
            config.data_dir = v.clone();
        }
        if self.synthetic.is_some() {
            config.synthetic_samples = self.synthetic;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(v) = self.architecture {
            config.architecture = v;
        }
        config.cpu |= self.cpu;

        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train(args) => {
            let config = args.resolve()?;
            info!("{:?}", config);

            let outcome = run(&config)?;
            info!(
                "Training complete: {} batches, {} generator updates, final D loss={:.6}, G loss={:.6}",
                outcome.metrics.num_steps(),
                outcome.metrics.generator_updates(),
                outcome.metrics.latest_critic_loss().unwrap_or(0.0),
                outcome.metrics.latest_generator_loss().unwrap_or(0.0)
            );
            info!("Samples written to {}", config.run_dir().display());
        }
        Commands::Sweep {
            param,
            values,
            base,
        } => {
            let config = base.resolve()?;
            let values = if values.is_empty() {
                param.default_values()
            } else {
                values
            };
            info!("Sweeping {:?} over {:?}", param, values);

            let results = run_sweep(&config, param, &values)?;
            for (run_config, metrics) in &results {
                info!(
                    "{}: final D loss={:.6}, G loss={:.6}",
                    run_config.run_path,
                    metrics.latest_critic_loss().unwrap_or(0.0),
                    metrics.latest_generator_loss().unwrap_or(0.0)
                );
            }
        }
        Commands::Init { output } => {
            WganConfig::default().save(&output)?;
            info!("Created default configuration at {}", output.display());
        }
    }

    Ok(())
}
