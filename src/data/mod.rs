pub mod cache;
pub mod connectors;
pub mod series;

pub use cache::IndicatorCache;
pub use connectors::{CsvConnector, DatasetMetadata};
pub use series::PriceSeries;
