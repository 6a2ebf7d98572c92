use crate::{
    error::{EvotradeError, Result},
    types::{Direction, ExitReason, Trade},
};

/// Default proportional fee per leg
pub const DEFAULT_FEE_RATE: f64 = 0.00055;
pub const DEFAULT_INITIAL_CAPITAL: f64 = 1000.0;

/// Single-position, all-in portfolio with proportional fees
pub struct Portfolio {
    pub initial_capital: f64,
    pub fee_rate: f64,
    pub cash: f64,
    pub position: Option<Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Position {
    pub direction: Direction,
    pub entry_bar: usize,
    pub entry_price: f64,
    pub size: f64,
    pub entry_fee: f64,
    pub stop_price: f64,
    pub target_price: f64,
}

impl Position {
    /// Capital committed at entry, fee included
    pub fn cost_basis(&self) -> f64 {
        self.size * self.entry_price + self.entry_fee
    }
}

impl Portfolio {
    pub fn new(initial_capital: f64, fee_rate: f64) -> Self {
        Self {
            initial_capital,
            fee_rate,
            cash: initial_capital,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// Commit the whole equity to a new position at `price`.
    ///
    /// The fee is taken from the committed amount, so
    /// `size * price * (1 + fee_rate) == equity`.
    pub fn open_position(
        &mut self,
        bar: usize,
        direction: Direction,
        price: f64,
        stop_price: f64,
        target_price: f64,
    ) -> Result<()> {
        if self.position.is_some() {
            return Err(EvotradeError::Backtest(format!(
                "Cannot open a position at bar {}: one is already open",
                bar
            )));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(EvotradeError::Backtest(format!(
                "Invalid entry price {} at bar {}",
                price, bar
            )));
        }

        let notional = self.cash / (1.0 + self.fee_rate);
        let fee = notional * self.fee_rate;
        let size = notional / price;

        match direction {
            Direction::Long => self.cash -= notional + fee,
            Direction::Short => self.cash += notional - fee, // proceeds from the short sale
        }

        self.position = Some(Position {
            direction,
            entry_bar: bar,
            entry_price: price,
            size,
            entry_fee: fee,
            stop_price,
            target_price,
        });

        Ok(())
    }

    pub fn close_position(&mut self, bar: usize, price: f64, reason: ExitReason) -> Result<()> {
        let Some(pos) = self.position.take() else {
            return Err(EvotradeError::Backtest(format!(
                "Cannot close at bar {}: no open position",
                bar
            )));
        };

        let exit_value = pos.size * price;
        let exit_fee = exit_value * self.fee_rate;
        let entry_value = pos.size * pos.entry_price;

        let profit = match pos.direction {
            Direction::Long => {
                self.cash += exit_value - exit_fee;
                exit_value - exit_fee - (entry_value + pos.entry_fee)
            }
            Direction::Short => {
                self.cash -= exit_value + exit_fee; // buy back
                (entry_value - pos.entry_fee) - (exit_value + exit_fee)
            }
        };

        let cost_basis = pos.cost_basis();
        self.trades.push(Trade {
            entry_bar: pos.entry_bar,
            exit_bar: bar,
            entry_price: pos.entry_price,
            exit_price: price,
            direction: pos.direction,
            size: pos.size,
            profit,
            return_pct: if cost_basis > 0.0 { profit / cost_basis * 100.0 } else { 0.0 },
            exit_reason: reason,
            fees: pos.entry_fee + exit_fee,
        });

        Ok(())
    }

    /// Cash plus the open position marked at `price`
    pub fn equity_at(&self, price: f64) -> f64 {
        match &self.position {
            Some(pos) => match pos.direction {
                Direction::Long => self.cash + pos.size * price,
                Direction::Short => self.cash - pos.size * price,
            },
            None => self.cash,
        }
    }

    /// Record end-of-bar equity
    pub fn mark_to_market(&mut self, close: f64) {
        let equity = self.equity_at(close);
        self.equity_curve.push(equity);
    }

    pub fn get_trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn get_equity_curve(&self) -> &[f64] {
        &self.equity_curve
    }
}
