pub mod trend;
pub mod volatility;

pub use trend::EMA;
pub use volatility::{HighestHigh, LowestLow};
