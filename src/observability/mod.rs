// Observability: metrics recording and export. Logging setup lives in `crate::logging`.

pub mod metrics;

pub use metrics::{init, render_to_file};
