pub mod config;
pub mod drawdown;
pub mod graphing;
pub mod refprice;
pub mod results;

// Re-export the types most callers and tests reach for.
pub use crate::drawdown::{compute, DrawdownSeries, Window};
pub use crate::results::{BalanceSample, BalanceSeries};
