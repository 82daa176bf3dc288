//! Core point generators: always registered, never probed.

mod base_build;
mod custom_data;
mod custom_data_map;

pub use base_build::{BuildBaseGenerator, DEFAULT_BUILD_MEASUREMENT};
pub use custom_data::{CustomDataGenerator, DEFAULT_CUSTOM_MEASUREMENT};
pub use custom_data_map::CustomDataMapGenerator;
