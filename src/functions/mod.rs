pub mod indicators;
pub mod traits;

pub use traits::{Indicator, PriceField, VectorizedIndicator};
