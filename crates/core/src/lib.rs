pub mod config;
pub mod document;
pub mod error;
pub mod stats;

pub use config::{CleanerConfig, DedupScope, NoiseRule, OracleConfig, PatternSpec, Script};
pub use document::*;
pub use error::*;
pub use stats::*;
