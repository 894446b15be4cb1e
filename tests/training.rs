//! Integration tests for the WGAN training loop.

use tch::{Device, Kind, Tensor};
use tempfile::TempDir;

use wgan_mnist::{
    data::{DataLoader, ImageDataset},
    model::Wgan,
    training::{run, Trainer},
    Architecture, WganConfig, WganError,
};

/// The reference scenario: one epoch over 64 images in batches of 32
fn scenario_config(output_root: &std::path::Path) -> WganConfig {
    WganConfig {
        epochs: 1,
        batch_size: 32,
        image_size: 28,
        channels: 1,
        latent_dim: 100,
        clip_value: 0.01,
        critic_steps_per_gen_step: 5,
        synthetic_samples: Some(64),
        output_root: output_root.to_path_buf(),
        run_path: "scenario".to_string(),
        seed: Some(1),
        cpu: true,
        ..Default::default()
    }
}

#[test]
fn test_end_to_end_scenario() {
    let dir = TempDir::new().unwrap();
    let config = scenario_config(dir.path());

    let outcome = run(&config).unwrap();
    let metrics = &outcome.metrics;

    assert_eq!(metrics.num_steps(), 2);
    assert_eq!(metrics.generator_updates(), 1);
    assert!(metrics.steps[0].updated_generator());
    assert!(!metrics.steps[1].updated_generator());

    let sample = dir.path().join("scenario").join("epoch0.png");
    assert!(sample.exists());
    assert_eq!(metrics.samples, vec![sample]);

    let files: Vec<_> = std::fs::read_dir(dir.path().join("scenario"))
        .unwrap()
        .collect();
    assert_eq!(files.len(), 1);

    assert!(outcome.model.critic_max_abs() <= 0.01);
}

#[test]
fn test_one_generator_update_per_n_critic_batches() {
    let dir = TempDir::new().unwrap();
    let config = WganConfig {
        epochs: 2,
        batch_size: 4,
        image_size: 8,
        latent_dim: 8,
        critic_steps_per_gen_step: 3,
        synthetic_samples: Some(24),
        ..scenario_config(dir.path())
    };

    let metrics = run(&config).unwrap().metrics;

    // 6 batches per epoch, updates at batch 0 and 3 of each epoch
    assert_eq!(metrics.num_steps(), 12);
    for step in &metrics.steps {
        assert_eq!(step.updated_generator(), step.batch % 3 == 0);
    }
    assert_eq!(metrics.generator_updates(), 4);
    assert_eq!(metrics.num_epochs(), 2);
    assert!(dir.path().join("scenario/epoch0.png").exists());
    assert!(dir.path().join("scenario/epoch1.png").exists());
}

#[test]
fn test_zero_clip_value_collapses_critic() {
    let dir = TempDir::new().unwrap();
    let config = WganConfig {
        epochs: 1,
        batch_size: 4,
        image_size: 8,
        latent_dim: 8,
        clip_value: 0.0,
        critic_steps_per_gen_step: 1,
        synthetic_samples: Some(16),
        ..scenario_config(dir.path())
    };

    let outcome = run(&config).unwrap();

    assert_eq!(outcome.model.critic_max_abs(), 0.0);
    for step in &outcome.metrics.steps {
        assert_eq!(step.generator_loss.map(f64::abs), Some(0.0));
    }
}

#[test]
fn test_trainer_with_explicit_loader() {
    let dir = TempDir::new().unwrap();
    let config = WganConfig {
        epochs: 1,
        batch_size: 5,
        image_size: 12,
        latent_dim: 16,
        architecture: Architecture::Mlp,
        ..scenario_config(dir.path())
    };

    let images = Tensor::rand([12, 1, 12, 12], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
    let dataset = ImageDataset::from_tensor(images).unwrap();
    let mut loader = DataLoader::new(dataset, config.batch_size, true, false, Some(9));
    let model = Wgan::new(&config, Device::Cpu);

    let mut trainer = Trainer::new(config.clone(), Device::Cpu);
    let metrics = trainer.train(&model, &mut loader).unwrap();

    // 12 images in batches of 5: 5, 5, 2
    assert_eq!(metrics.num_steps(), 3);
    assert_eq!(metrics.generator_updates(), 1);
    assert!(config.sample_path(0).exists());
}

#[test]
fn test_geometry_mismatch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = WganConfig {
        image_size: 26,
        ..scenario_config(dir.path())
    };

    assert!(matches!(run(&config), Err(WganError::InvalidConfig(_))));
    assert!(!dir.path().join("scenario").exists());
}

#[test]
fn test_missing_mnist_fails_at_startup() {
    let dir = TempDir::new().unwrap();
    let config = WganConfig {
        synthetic_samples: None,
        data_dir: dir.path().join("no-mnist-here"),
        ..scenario_config(dir.path())
    };

    assert!(matches!(run(&config), Err(WganError::Dataset(_))));
    assert!(!dir.path().join("scenario").exists());
    // The cache directory is left in place for the IDX files
    assert!(config.data_dir.is_dir());
}

#[test]
fn test_lone_trailing_image_does_not_reach_batch_norm() {
    let dir = TempDir::new().unwrap();
    let config = WganConfig {
        epochs: 2,
        batch_size: 4,
        image_size: 8,
        latent_dim: 8,
        synthetic_samples: Some(5),
        ..scenario_config(dir.path())
    };

    let metrics = run(&config).unwrap().metrics;

    // 5 images in batches of 4: the single-image remainder is skipped
    assert_eq!(metrics.num_steps(), 2);
    assert!(metrics.steps.iter().all(|s| s.batch == 0));
    assert!(dir.path().join("scenario/epoch1.png").exists());
}

#[test]
fn test_non_finite_loss_aborts_training() {
    let dir = TempDir::new().unwrap();
    let config = WganConfig {
        epochs: 3,
        batch_size: 8,
        image_size: 8,
        latent_dim: 8,
        ..scenario_config(dir.path())
    };

    let images = Tensor::rand([8, 1, 8, 8], (Kind::Float, Device::Cpu)) * 2.0 - 1.0;
    let _ = images.get(3).get(0).get(4).get(4).fill_(f64::NAN);
    let dataset = ImageDataset::from_tensor(images).unwrap();
    let mut loader = DataLoader::new(dataset, config.batch_size, true, false, Some(2));
    let model = Wgan::new(&config, Device::Cpu);

    let mut trainer = Trainer::new(config.clone(), Device::Cpu);
    let err = trainer.train(&model, &mut loader).unwrap_err();

    assert!(matches!(
        err,
        WganError::NonFiniteLoss {
            epoch: 0,
            batch: 0,
            ..
        }
    ));
    assert!(!config.sample_path(0).exists());
    assert_eq!(trainer.metrics().num_steps(), 0);
}
