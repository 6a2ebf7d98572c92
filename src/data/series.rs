use crate::data::cache::IndicatorCache;
use crate::data::connectors::{DataValidator, RequiredColumn};
use crate::error::{EvotradeError, Result};
use crate::functions::indicators::{HighestHigh, LowestLow, EMA};
use crate::functions::traits::VectorizedIndicator;
use crate::types::Candle;
use polars::prelude::*;
use std::sync::Arc;

const INDICATOR_CACHE_CAPACITY: usize = 256;

/// Ordered OHLCV bars with memoized indicator columns.
///
/// Shared read-only across evaluation threads; the only interior mutability is
/// the indicator cache.
pub struct PriceSeries {
    frame: DataFrame,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    cache: IndicatorCache,
}

impl PriceSeries {
    /// Build from a frame whose OHLC(V) columns can be resolved by alias.
    /// A missing volume column loads as zeros.
    pub fn from_frame(df: DataFrame) -> Result<Self> {
        if df.height() == 0 {
            return Err(EvotradeError::DataLoading("Price series is empty".to_string()));
        }

        let column_map = DataValidator::validate_ohlcv(&df)?;
        let extract = |required: RequiredColumn| -> Result<Vec<f64>> {
            let Some(name) = column_map.get(&required) else {
                return Ok(vec![0.0; df.height()]);
            };
            let casted = df.column(name)?.cast(&DataType::Float64)?;
            let values = casted.f64()?;
            if values.null_count() > 0 && required.is_mandatory() {
                return Err(EvotradeError::DataLoading(format!(
                    "Column '{}' contains {} null values",
                    name,
                    values.null_count()
                )));
            }
            Ok(values.into_iter().map(|v| v.unwrap_or(0.0)).collect())
        };

        let open = extract(RequiredColumn::Open)?;
        let high = extract(RequiredColumn::High)?;
        let low = extract(RequiredColumn::Low)?;
        let close = extract(RequiredColumn::Close)?;
        let volume = extract(RequiredColumn::Volume)?;

        Self::from_columns(open, high, low, close, volume)
    }

    pub fn from_candles(candles: &[Candle]) -> Result<Self> {
        if candles.is_empty() {
            return Err(EvotradeError::DataLoading("Price series is empty".to_string()));
        }

        Self::from_columns(
            candles.iter().map(|c| c.open).collect(),
            candles.iter().map(|c| c.high).collect(),
            candles.iter().map(|c| c.low).collect(),
            candles.iter().map(|c| c.close).collect(),
            candles.iter().map(|c| c.volume).collect(),
        )
    }

    fn from_columns(
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Result<Self> {
        let frame = df! {
            "open" => &open,
            "high" => &high,
            "low" => &low,
            "close" => &close,
            "volume" => &volume,
        }?;

        Ok(Self {
            frame,
            high,
            low,
            close,
            volume,
            cache: IndicatorCache::new(INDICATOR_CACHE_CAPACITY),
        })
    }

    /// Evaluate a vectorized indicator over its source column, memoized by cache key.
    /// Nulls (incomplete windows) come back as NaN.
    pub fn indicator<I: VectorizedIndicator>(&self, indicator: &I) -> Result<Arc<Vec<f64>>> {
        if indicator.period() == 0 {
            return Err(EvotradeError::Backtest(format!(
                "Indicator '{}' needs a period of at least 1",
                indicator.alias()
            )));
        }

        self.cache.get_or_try_insert(&indicator.cache_key(), || -> Result<Vec<f64>> {
            let source = col(indicator.source().column_name());
            let out = self
                .frame
                .clone()
                .lazy()
                .select([indicator.calculate_vectorized(source).alias("value")])
                .collect()?;

            let values = out.column("value")?.f64()?;
            Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        })
    }

    pub fn ema(&self, period: usize) -> Result<Arc<Vec<f64>>> {
        self.indicator(&EMA::new(period))
    }

    pub fn lowest_low(&self, lookback: usize) -> Result<Arc<Vec<f64>>> {
        self.indicator(&LowestLow::new(lookback))
    }

    pub fn highest_high(&self, lookback: usize) -> Result<Arc<Vec<f64>>> {
        self.indicator(&HighestHigh::new(lookback))
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }
}

impl std::fmt::Debug for PriceSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceSeries")
            .field("bars", &self.len())
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(closes: &[f64]) -> PriceSeries {
        let candles: Vec<Candle> = closes
            .iter()
            .map(|c| Candle::new(*c, c + 1.0, c - 1.0, *c, 10.0))
            .collect();
        PriceSeries::from_candles(&candles).unwrap()
    }

    #[test]
    fn test_ema_matches_adjusted_closed_form() {
        let closes = [10.0, 11.0, 12.5, 11.5, 13.0, 14.0];
        let prices = series(&closes);
        let ema = prices.ema(3).unwrap();

        let decay: f64 = 1.0 - 2.0 / 4.0;
        for t in 0..closes.len() {
            let num: f64 = (0..=t).map(|i| decay.powi(i as i32) * closes[t - i]).sum();
            let den: f64 = (0..=t).map(|i| decay.powi(i as i32)).sum();
            assert!((ema[t] - num / den).abs() < 1e-9, "bar {}", t);
        }
        assert_eq!(ema[0], 10.0);
    }

    #[test]
    fn test_ema_is_memoized() {
        let prices = series(&[1.0, 2.0, 3.0]);
        let a = prices.ema(2).unwrap();
        let b = prices.ema(2).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_rolling_extremes_need_full_window() {
        let prices = series(&[10.0, 8.0, 12.0, 9.0]);
        let lows = prices.lowest_low(2).unwrap();
        assert!(lows[0].is_nan());
        assert_eq!(lows[1], 7.0);
        assert_eq!(lows[3], 8.0);

        let highs = prices.highest_high(3).unwrap();
        assert!(highs[1].is_nan());
        assert_eq!(highs[2], 13.0);
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let prices = series(&[1.0, 2.0]);
        assert!(prices.ema(0).is_err());
    }

    #[test]
    fn test_empty_candles_rejected() {
        assert!(PriceSeries::from_candles(&[]).is_err());
    }
}
