pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod model;
pub mod mutation;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{Result, SparkError};
