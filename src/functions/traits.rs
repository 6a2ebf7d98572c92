use polars::prelude::*;

/// Price column an indicator is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl PriceField {
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::High => "high",
            Self::Low => "low",
            Self::Close => "close",
            Self::Volume => "volume",
        }
    }
}

/// Base trait for all indicators
pub trait Indicator: Send + Sync {
    /// Short name, used as the cache key prefix
    fn alias(&self) -> &'static str;

    /// Input column
    fn source(&self) -> PriceField;

    /// Window length in bars
    fn period(&self) -> usize;

    fn cache_key(&self) -> String {
        format!("{}_{}_{}", self.alias(), self.source().column_name(), self.period())
    }
}

/// Indicators expressible as a single Polars expression over their source column
pub trait VectorizedIndicator: Indicator {
    fn calculate_vectorized(&self, series: Expr) -> Expr;
}
