//! Pipeline entry points.
//!
//! - `run_pipeline`: One drift detection pass (fetch → diff → notify → promote)
//! - `run_extract`: Fetch and extract the current document without touching storage
//! - `run_status`: Describe the stored baseline and latest documents

pub mod extract;
pub mod run;
pub mod status;

pub use extract::run_extract;
pub use run::{DriftPipeline, run_pipeline};
pub use status::run_status;
