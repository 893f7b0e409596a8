pub mod engine;
pub mod indicators;
pub mod scorer;


pub use engine::*;
pub use indicators::*;
pub use scorer::*;
