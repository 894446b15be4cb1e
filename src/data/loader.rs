//! DataLoader for batching and iterating over training images
//!
//! Provides batching for WGAN training with support for:
//! - Seeded random shuffling, redone every epoch
//! - Optional dropping of the last incomplete batch
//! - Transfer of each batch to the training device

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tch::{Device, Tensor};

use super::dataset::ImageDataset;

/// DataLoader yielding (batch, C, H, W) image tensors
pub struct DataLoader {
    dataset: ImageDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    device: Device,
    /// Current permutation of sample indices
    indices: Vec<usize>,
    /// Current position in iteration
    current_idx: usize,
    rng: StdRng,
}

impl DataLoader {
    /// Create a new DataLoader
    ///
    /// # Arguments
    ///
    /// * `dataset` - Images to iterate over
    /// * `batch_size` - Number of images per batch
    /// * `shuffle` - Whether to reshuffle every epoch
    /// * `drop_last` - Whether to skip the trailing incomplete batch
    /// * `seed` - Shuffle seed; OS entropy when `None`
    pub fn new(
        dataset: ImageDataset,
        batch_size: usize,
        shuffle: bool,
        drop_last: bool,
        seed: Option<u64>,
    ) -> Self {
        let indices: Vec<usize> = (0..dataset.len()).collect();
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            dataset,
            batch_size: batch_size.max(1),
            shuffle,
            drop_last,
            device: Device::Cpu,
            indices,
            current_idx: 0,
            rng,
        }
    }

    /// Move yielded batches to `device`
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Get the number of batches per epoch
    pub fn num_batches(&self) -> usize {
        let num_samples = self.num_samples();
        if self.drop_last {
            num_samples / self.batch_size
        } else {
            (num_samples + self.batch_size - 1) / self.batch_size
        }
    }

    /// Get total number of samples
    pub fn num_samples(&self) -> usize {
        self.dataset.len()
    }

    /// Get batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Underlying dataset
    pub fn dataset(&self) -> &ImageDataset {
        &self.dataset
    }

    /// Reset for new epoch
    pub fn reset(&mut self) {
        self.current_idx = 0;
        if self.shuffle {
            self.indices.shuffle(&mut self.rng);
        }
    }

    /// Get next batch
    ///
    /// Returns None when epoch is complete
    pub fn next_batch(&mut self) -> Option<Tensor> {
        let num_samples = self.indices.len();
        let start = self.current_idx;

        if start >= num_samples {
            return None;
        }

        let end = (start + self.batch_size).min(num_samples);

        if self.drop_last && end - start < self.batch_size {
            return None;
        }

        let batch_indices: Vec<i64> = self.indices[start..end].iter().map(|&i| i as i64).collect();
        let index = Tensor::from_slice(&batch_indices);
        let batch = self
            .dataset
            .images()
            .index_select(0, &index)
            .to_device(self.device);

        self.current_idx = end;
        Some(batch)
    }

    /// Start a fresh epoch and iterate over its batches
    pub fn iter(&mut self) -> DataLoaderIter<'_> {
        self.reset();
        DataLoaderIter { loader: self }
    }
}

/// Iterator adapter for DataLoader
pub struct DataLoaderIter<'a> {
    loader: &'a mut DataLoader,
}

impl<'a> Iterator for DataLoaderIter<'a> {
    type Item = Tensor;

    fn next(&mut self) -> Option<Self::Item> {
        self.loader.next_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tch::Kind;

    fn indexed_dataset(n: i64) -> ImageDataset {
        // Image i is filled with the value i
        let images = Tensor::arange(n, (Kind::Float, Device::Cpu))
            .view([n, 1, 1, 1])
            .expand([n, 1, 2, 2], false)
            .contiguous();
        ImageDataset::from_tensor(images).unwrap()
    }

    fn batch_ids(batch: &Tensor) -> Vec<i64> {
        let firsts = batch.flatten(1, -1).select(1, 0).to_kind(Kind::Int64);
        Vec::<i64>::try_from(&firsts).unwrap()
    }

    #[test]
    fn test_dataloader_basic() {
        let mut loader = DataLoader::new(indexed_dataset(10), 3, false, false, None);

        assert_eq!(loader.num_batches(), 4); // ceil(10/3) = 4
        assert_eq!(loader.num_samples(), 10);

        let batches: Vec<_> = loader.iter().collect();
        assert_eq!(batches.len(), 4);
        assert_eq!(batches[0].size(), vec![3, 1, 2, 2]);
        assert_eq!(batches[3].size(), vec![1, 1, 2, 2]); // Last batch has 1 sample
        assert_eq!(batch_ids(&batches[0]), vec![0, 1, 2]);
    }

    #[test]
    fn test_dataloader_drop_last() {
        let mut loader = DataLoader::new(indexed_dataset(10), 3, false, true, None);

        assert_eq!(loader.num_batches(), 3); // floor(10/3) = 3
        let batches: Vec<_> = loader.iter().collect();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.size()[0] == 3));
    }

    #[test]
    fn test_shuffle_covers_every_sample() {
        let mut loader = DataLoader::new(indexed_dataset(9), 4, true, false, Some(3));

        let mut seen: Vec<i64> = loader.iter().flat_map(|b| batch_ids(&b)).collect();
        seen.sort();
        assert_eq!(seen, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn test_seeded_shuffle_is_reproducible() {
        let mut a = DataLoader::new(indexed_dataset(32), 8, true, false, Some(42));
        let mut b = DataLoader::new(indexed_dataset(32), 8, true, false, Some(42));

        for _ in 0..2 {
            let ids_a: Vec<i64> = a.iter().flat_map(|t| batch_ids(&t)).collect();
            let ids_b: Vec<i64> = b.iter().flat_map(|t| batch_ids(&t)).collect();
            assert_eq!(ids_a, ids_b);
        }
    }
}
