//! Data module for loading and batching training images
//!
//! This module provides:
//! - Image datasets (MNIST IDX files or synthetic noise) normalized to [-1, 1]
//! - DataLoader for shuffled batching

mod dataset;
mod loader;

pub use dataset::{ImageDataset, MNIST_IMAGE_SIZE};
pub use loader::{DataLoader, DataLoaderIter};
