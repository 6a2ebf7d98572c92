pub mod traits;
pub mod evolution;
pub mod backtesting;
pub mod strategy;
pub mod manager;

pub use manager::{AppConfig, ConfigManager, ReportingConfig};
pub use evolution::{EvolutionConfig, OptimizationPreset};
pub use backtesting::BacktestingConfig;
pub use strategy::StrategySettings;
pub use traits::ConfigSection;
