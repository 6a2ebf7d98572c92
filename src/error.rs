use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvotradeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Backtest error: {0}")]
    Backtest(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("Breeding exhausted at generation {generation}: no valid offspring after {attempts} attempts")]
    Exhaustion { generation: usize, attempts: usize },

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config source error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, EvotradeError>;
