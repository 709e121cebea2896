pub mod counter_store;
pub mod metrics;
pub mod usage;

pub use counter_store::*;
pub use metrics::*;
pub use usage::*;
