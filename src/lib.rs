//! massbuild - batch-compile embedded sketches and compare buildsets
//!
//! The `build` side compiles every sketch for every board and leaves one
//! record directory per attempt. The `report` side scans those records,
//! measures the compiled artifacts and compares buildsets against a
//! baseline.

pub mod cli;
pub mod compile;
pub mod config;
pub mod dataset;
pub mod delta;
pub mod error;
pub mod measure;
pub mod record;
pub mod report;
pub mod scanner;
