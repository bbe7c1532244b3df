//! Terminal helpers shared by the CLI

pub mod progress;
pub mod styling;

pub use progress::*;
pub use styling::*;
