//! Utility module with helper functions
//!
//! This module provides:
//! - Run configuration handling
//! - Sample grid rendering

mod config;
mod grid;

pub use config::{Architecture, WganConfig};
pub use grid::{arrange_grid, save_image_grid, GridImage, GRID_PADDING};
