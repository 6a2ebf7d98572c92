use crate::{
    data::PriceSeries,
    engines::evaluation::{
        portfolio::{DEFAULT_FEE_RATE, DEFAULT_INITIAL_CAPITAL},
        BacktestEvaluator, Portfolio,
    },
    engines::generation::strategy::{SideParams, StrategyConfig},
    engines::metrics::{MetricsEngine, DEFAULT_PERIODS_PER_YEAR},
    error::{EvotradeError, Result},
    types::{BacktestStats, Direction, ExitReason, Trade},
};
use std::sync::Arc;

/// Bars skipped before the first entry is considered
pub const DEFAULT_WARMUP_BARS: usize = 999;

/// Full output of a simulation
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub stats: BacktestStats,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
}

/// Indicator columns for one side of the strategy
struct SideSignals {
    params: SideParams,
    ema_fast: Arc<Vec<f64>>,
    ema_slow: Arc<Vec<f64>>,
    stop_level: Arc<Vec<f64>>,
}

impl SideSignals {
    fn long(params: SideParams, prices: &PriceSeries) -> Result<Self> {
        Ok(Self {
            params,
            ema_fast: prices.ema(params.fast_period)?,
            ema_slow: prices.ema(params.slow_period)?,
            stop_level: prices.lowest_low(params.stop_lookback)?,
        })
    }

    fn short(params: SideParams, prices: &PriceSeries) -> Result<Self> {
        Ok(Self {
            params,
            ema_fast: prices.ema(params.fast_period)?,
            ema_slow: prices.ema(params.slow_period)?,
            stop_level: prices.highest_high(params.stop_lookback)?,
        })
    }
}

/// Double-EMA breakout with fixed stop and risk/reward target.
///
/// Long setup at bar `i`: the previous close is above both EMAs and the
/// current high breaks the previous high. The fill is at the previous high,
/// the stop at the lowest low of the last `stop_lookback` bars and the
/// target at `risk_reward` times the risk. Shorts mirror this. One position
/// at a time; exits are checked from the bar after entry, target first.
#[derive(Debug, Clone)]
pub struct DoubleEmaBacktester {
    initial_capital: f64,
    fee_rate: f64,
    warmup_bars: usize,
    periods_per_year: f64,
}

impl Default for DoubleEmaBacktester {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            fee_rate: DEFAULT_FEE_RATE,
            warmup_bars: DEFAULT_WARMUP_BARS,
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

impl DoubleEmaBacktester {
    pub fn new(initial_capital: f64, fee_rate: f64, warmup_bars: usize) -> Self {
        Self {
            initial_capital,
            fee_rate,
            warmup_bars,
            ..Default::default()
        }
    }

    pub fn with_periods_per_year(mut self, periods_per_year: f64) -> Self {
        self.periods_per_year = periods_per_year;
        self
    }

    fn validate_side(side: &SideParams, label: &str) -> Result<()> {
        if side.fast_period == 0 || side.slow_period == 0 || side.stop_lookback == 0 {
            return Err(EvotradeError::Backtest(format!(
                "{} side needs periods and stop lookback of at least 1: {:?}",
                label, side
            )));
        }
        if !(side.risk_reward.is_finite() && side.risk_reward > 0.0) {
            return Err(EvotradeError::Backtest(format!(
                "{} side risk/reward must be positive, got {}",
                label, side.risk_reward
            )));
        }
        Ok(())
    }

    /// Run the simulation and keep trades and equity curve
    pub fn simulate(&self, config: &StrategyConfig, prices: &PriceSeries) -> Result<BacktestReport> {
        let StrategyConfig::DoubleEmaBreakout { long, short } = config;
        if long.is_none() && short.is_none() {
            return Err(EvotradeError::Backtest("Strategy has neither a long nor a short side".to_string()));
        }
        if let Some(side) = long {
            Self::validate_side(side, "long")?;
        }
        if let Some(side) = short {
            Self::validate_side(side, "short")?;
        }

        let long = long.as_ref().map(|p| SideSignals::long(*p, prices)).transpose()?;
        let short = short.as_ref().map(|p| SideSignals::short(*p, prices)).transpose()?;

        let high = prices.high();
        let low = prices.low();
        let close = prices.close();
        let bars = prices.len();
        let start = self.warmup_bars.max(1);

        let mut portfolio = Portfolio::new(self.initial_capital, self.fee_rate);

        for i in 0..bars {
            if i >= start {
                if portfolio.is_flat() {
                    self.try_enter(&mut portfolio, i, long.as_ref(), short.as_ref(), prices)?;
                } else {
                    Self::check_exit(&mut portfolio, i, high[i], low[i])?;
                }
            }
            portfolio.mark_to_market(close[i]);
        }

        if !portfolio.is_flat() {
            let last = bars - 1;
            portfolio.close_position(last, close[last], ExitReason::EndOfData)?;
            if let Some(value) = portfolio.equity_curve.last_mut() {
                *value = portfolio.cash;
            }
        }

        let stats = MetricsEngine::new(self.initial_capital)
            .with_periods_per_year(self.periods_per_year)
            .calculate(portfolio.get_trades(), portfolio.get_equity_curve());

        log::trace!(
            "{}: {} trades, return {:.2}%, max drawdown {:.2}%",
            config.label(),
            stats.trade_count,
            stats.total_return_pct,
            stats.max_drawdown_pct
        );

        Ok(BacktestReport {
            stats,
            trades: portfolio.trades,
            equity_curve: portfolio.equity_curve,
        })
    }

    fn try_enter(
        &self,
        portfolio: &mut Portfolio,
        i: usize,
        long: Option<&SideSignals>,
        short: Option<&SideSignals>,
        prices: &PriceSeries,
    ) -> Result<()> {
        let high = prices.high();
        let low = prices.low();
        let prev_close = prices.close()[i - 1];

        let long_setup = long.filter(|s| {
            prev_close > s.ema_fast[i - 1] && prev_close > s.ema_slow[i - 1] && high[i] > high[i - 1]
        });
        let short_setup = short.filter(|s| {
            prev_close < s.ema_fast[i - 1] && prev_close < s.ema_slow[i - 1] && low[i] < low[i - 1]
        });

        // A long setup takes precedence even when its stop window is incomplete
        if let Some(side) = long_setup {
            let stop = side.stop_level[i];
            if stop.is_finite() {
                let entry = high[i - 1];
                let target = entry + (entry - stop) * side.params.risk_reward;
                portfolio.open_position(i, Direction::Long, entry, stop, target)?;
            }
        } else if let Some(side) = short_setup {
            let stop = side.stop_level[i];
            if stop.is_finite() {
                let entry = low[i - 1];
                let target = entry - (stop - entry) * side.params.risk_reward;
                portfolio.open_position(i, Direction::Short, entry, stop, target)?;
            }
        }

        Ok(())
    }

    fn check_exit(portfolio: &mut Portfolio, i: usize, high: f64, low: f64) -> Result<()> {
        let Some(pos) = &portfolio.position else {
            return Ok(());
        };
        let (stop, target) = (pos.stop_price, pos.target_price);

        let exit = match pos.direction {
            Direction::Long if high >= target => Some((target, ExitReason::TakeProfit)),
            Direction::Long if low <= stop => Some((stop, ExitReason::StopLoss)),
            Direction::Short if low <= target => Some((target, ExitReason::TakeProfit)),
            Direction::Short if high >= stop => Some((stop, ExitReason::StopLoss)),
            _ => None,
        };

        if let Some((price, reason)) = exit {
            portfolio.close_position(i, price, reason)?;
        }
        Ok(())
    }
}

impl BacktestEvaluator for DoubleEmaBacktester {
    fn run(&self, config: &StrategyConfig, prices: &PriceSeries) -> Result<BacktestStats> {
        Ok(self.simulate(config, prices)?.stats)
    }
}
