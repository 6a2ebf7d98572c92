use crate::data::series::PriceSeries;
use crate::error::{EvotradeError, Result};
use polars::prelude::*;
use std::path::Path;
use super::{
    types::{DatasetMetadata, RequiredColumn},
    validator::DataValidator,
};

/// Default minimum number of bars for a meaningful backtest
pub const DEFAULT_MIN_ROWS: usize = 100;

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| EvotradeError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load, validate and normalize a CSV file into a [`PriceSeries`]
    pub fn load_prices<P: AsRef<Path>>(path: P, min_rows: Option<usize>) -> Result<PriceSeries> {
        let df = Self::load(&path)?;

        DataValidator::validate_minimum_rows(&df, min_rows.unwrap_or(DEFAULT_MIN_ROWS))?;

        // Warn about nulls but don't fail
        let null_report = DataValidator::check_nulls(&df)?;
        if !null_report.is_empty() {
            log::warn!("Null values detected: {:?}", null_report);
        }

        let df = Self::normalize_columns(df)?;
        let metadata = Self::create_metadata(&path, &df)?;
        log::info!(
            "Loaded {} bars from {} (close {:.2}..{:.2})",
            metadata.num_rows,
            metadata.file_path,
            metadata.price_range.0,
            metadata.price_range.1
        );

        PriceSeries::from_frame(df)
    }

    pub fn create_metadata<P: AsRef<Path>>(path: P, df: &DataFrame) -> Result<DatasetMetadata> {
        let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();

        let close_col = Self::find_close_column(df);
        let price_range = if let Some(close_name) = close_col {
            let close = df.column(close_name)?.cast(&DataType::Float64)?;
            let close_f64 = close.f64()?;
            (close_f64.min().unwrap_or(0.0), close_f64.max().unwrap_or(0.0))
        } else {
            (0.0, 0.0)
        };

        Ok(DatasetMetadata {
            file_path: path.as_ref().to_string_lossy().to_string(),
            num_rows: df.height(),
            num_columns: df.width(),
            columns,
            price_range,
        })
    }

    /// Rename resolved OHLCV columns to their lowercase standard names
    pub fn normalize_columns(mut df: DataFrame) -> Result<DataFrame> {
        let column_map = DataValidator::validate_ohlcv(&df)?;

        for (required, actual_name) in column_map {
            let standard_name = required.as_str();
            if actual_name != standard_name {
                df.rename(&actual_name, standard_name.into())
                    .map_err(|e| EvotradeError::DataLoading(format!("Failed to rename column: {}", e)))?;
            }
        }

        Ok(df)
    }

    fn find_close_column(df: &DataFrame) -> Option<&'static str> {
        let columns = df.get_column_names();
        RequiredColumn::Close
            .aliases()
            .into_iter()
            .find(|alias| columns.iter().any(|col| col.as_str() == *alias))
    }
}
