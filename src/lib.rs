pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;

pub use error::{EtlError, Result};
pub use pipeline::{run_pipeline, Pipeline, RunSummary};
