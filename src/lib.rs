//! Generational genetic search over trading-strategy parameters.
//!
//! A [`engines::generation::Evolver`] breeds parameter genomes, scores them
//! through a [`engines::evaluation::BacktestEvaluator`] on a
//! [`data::PriceSeries`] and returns the best configurations found.

pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod functions;
pub mod services;
pub mod types;

pub use error::{EvotradeError, Result};
