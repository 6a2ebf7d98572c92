use serde::{Deserialize, Serialize};

/// OHLCV columns understood by the loaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredColumn {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl RequiredColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::Volume => "volume",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            Self::Open,
            Self::High,
            Self::Low,
            Self::Close,
            Self::Volume,
        ]
    }

    /// Volume is optional; bars without it load with zero volume.
    pub fn is_mandatory(&self) -> bool {
        !matches!(self, Self::Volume)
    }

    /// Common alternative column names
    pub fn aliases(&self) -> Vec<&'static str> {
        match self {
            Self::Open => vec!["open", "Open", "OPEN", "o", "abertura"],
            Self::High => vec!["high", "High", "HIGH", "h", "maxima"],
            Self::Low => vec!["low", "Low", "LOW", "l", "minima"],
            Self::Close => vec!["close", "Close", "CLOSE", "c", "fechamento"],
            Self::Volume => vec!["volume", "Volume", "VOLUME", "vol", "Vol", "v"],
        }
    }
}

/// Metadata about loaded CSV data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub file_path: String,
    pub num_rows: usize,
    pub num_columns: usize,
    pub columns: Vec<String>,
    pub price_range: (f64, f64), // (min, max) of close
}
