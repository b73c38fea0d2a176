pub mod initialize;
pub mod resolve;

pub use initialize::*;
pub use resolve::*;
