pub mod tier;
pub mod usage;

pub use tier::*;
pub use usage::*;
