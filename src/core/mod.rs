//! Core functionality for vidscan

pub mod miner;
pub mod registry;
pub mod scanner;
pub mod stream;

pub use miner::*;
pub use registry::*;
pub use scanner::*;
pub use stream::*;
