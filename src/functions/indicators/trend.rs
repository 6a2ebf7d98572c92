use crate::functions::traits::{Indicator, PriceField, VectorizedIndicator};
use polars::prelude::*;

/// Exponential moving average with `alpha = 2 / (period + 1)`.
///
/// Uses the adjusted (bias-corrected) form, so the first value equals the
/// first input and no warm-up bars are dropped:
/// `ema[t] = sum((1-a)^i * x[t-i]) / sum((1-a)^i)` for `i = 0..=t`.
pub struct EMA {
    pub period: usize,
    pub source: PriceField,
}

impl EMA {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            source: PriceField::Close,
        }
    }

    pub fn alpha(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }
}

impl Indicator for EMA {
    fn alias(&self) -> &'static str {
        "ema"
    }

    fn source(&self) -> PriceField {
        self.source
    }

    fn period(&self) -> usize {
        self.period
    }
}

impl VectorizedIndicator for EMA {
    fn calculate_vectorized(&self, series: Expr) -> Expr {
        let options = EWMOptions {
            alpha: self.alpha(),
            adjust: true,
            min_periods: 1,
            ..Default::default()
        };

        series.ewm_mean(options)
    }
}
