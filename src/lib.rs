pub mod config;
pub mod datasets;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod sink;
pub mod transform;

pub use config::Config;
pub use error::PipelineError;
pub use pipeline::{Dataset, RunSummary, Slice};
