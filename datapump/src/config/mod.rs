//! Configuration for the datapump binary.

mod dependencies;
mod settings;

pub use dependencies::Dependencies;
pub use settings::{Input, Settings};
