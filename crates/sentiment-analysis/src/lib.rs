pub mod weighting;

pub use weighting::*;
