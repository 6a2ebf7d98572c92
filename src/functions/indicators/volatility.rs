use crate::functions::traits::{Indicator, PriceField, VectorizedIndicator};
use polars::prelude::*;

fn full_window(period: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size: period,
        min_periods: period,
        ..Default::default()
    }
}

/// Lowest low of the last `period` bars, current bar included.
/// Null until a full window is available.
pub struct LowestLow {
    pub period: usize,
}

impl LowestLow {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for LowestLow {
    fn alias(&self) -> &'static str {
        "lowest"
    }

    fn source(&self) -> PriceField {
        PriceField::Low
    }

    fn period(&self) -> usize {
        self.period
    }
}

impl VectorizedIndicator for LowestLow {
    fn calculate_vectorized(&self, series: Expr) -> Expr {
        series.rolling_min(full_window(self.period))
    }
}

/// Highest high of the last `period` bars, current bar included
pub struct HighestHigh {
    pub period: usize,
}

impl HighestHigh {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for HighestHigh {
    fn alias(&self) -> &'static str {
        "highest"
    }

    fn source(&self) -> PriceField {
        PriceField::High
    }

    fn period(&self) -> usize {
        self.period
    }
}

impl VectorizedIndicator for HighestHigh {
    fn calculate_vectorized(&self, series: Expr) -> Expr {
        series.rolling_max(full_window(self.period))
    }
}
