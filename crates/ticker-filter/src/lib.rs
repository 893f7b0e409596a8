pub mod orchestrator;
pub mod registry;
pub mod strategies;

pub use orchestrator::*;
pub use registry::*;
pub use strategies::*;
