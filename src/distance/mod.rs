pub mod matrix;
pub mod providers;

pub use matrix::{create_provider, DistanceError, DistanceProvider};
