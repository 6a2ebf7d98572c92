use crate::error::{EvotradeError, Result};
use polars::prelude::*;
use super::types::RequiredColumn;
use std::collections::HashMap;

pub struct DataValidator;

impl DataValidator {
    /// Resolve OHLC(V) columns and check their types and relationships
    pub fn validate_ohlcv(df: &DataFrame) -> Result<HashMap<RequiredColumn, String>> {
        let mut column_map = HashMap::new();

        for required in RequiredColumn::all() {
            match Self::find_column(df, &required) {
                Some(col_name) => {
                    column_map.insert(required, col_name.to_string());
                }
                None if required.is_mandatory() => {
                    return Err(EvotradeError::DataLoading(format!(
                        "Missing required column: {} (tried aliases: {:?})",
                        required.as_str(),
                        required.aliases()
                    )));
                }
                None => {
                    log::debug!("No {} column found, defaulting to zero", required.as_str());
                }
            }
        }

        for (req_col, actual_name) in &column_map {
            let column = df.column(actual_name)?;
            if !matches!(column.dtype(), DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32) {
                return Err(EvotradeError::DataLoading(format!(
                    "Column '{}' ({}) must be numeric, found {:?}",
                    actual_name,
                    req_col.as_str(),
                    column.dtype()
                )));
            }
        }

        Self::validate_ohlc_relationships(df, &column_map)?;

        Ok(column_map)
    }

    /// Find column by checking aliases
    fn find_column(df: &DataFrame, required: &RequiredColumn) -> Option<&'static str> {
        let columns = df.get_column_names();
        required
            .aliases()
            .into_iter()
            .find(|alias| columns.iter().any(|col| col.as_str() == *alias))
    }

    /// High must be the top of the bar and low its bottom
    fn validate_ohlc_relationships(
        df: &DataFrame,
        column_map: &HashMap<RequiredColumn, String>,
    ) -> Result<()> {
        let lookup = |col: RequiredColumn| -> Result<Float64Chunked> {
            let name = column_map.get(&col).ok_or_else(|| {
                EvotradeError::DataLoading(format!("Column {} was not resolved", col.as_str()))
            })?;
            let casted = df.column(name)?.cast(&DataType::Float64)?;
            Ok(casted.f64()?.clone())
        };

        let open = lookup(RequiredColumn::Open)?;
        let high = lookup(RequiredColumn::High)?;
        let low = lookup(RequiredColumn::Low)?;
        let close = lookup(RequiredColumn::Close)?;

        for i in 0..df.height() {
            if let (Some(h), Some(l), Some(o), Some(c)) = (
                high.get(i),
                low.get(i),
                open.get(i),
                close.get(i),
            ) {
                if h < l {
                    return Err(EvotradeError::DataLoading(format!(
                        "Invalid data at row {}: high ({}) < low ({})",
                        i, h, l
                    )));
                }
                if h < o || h < c {
                    return Err(EvotradeError::DataLoading(format!(
                        "Invalid data at row {}: high ({}) < open ({}) or close ({})",
                        i, h, o, c
                    )));
                }
                if l > o || l > c {
                    return Err(EvotradeError::DataLoading(format!(
                        "Invalid data at row {}: low ({}) > open ({}) or close ({})",
                        i, l, o, c
                    )));
                }
            }
        }

        Ok(())
    }

    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(EvotradeError::DataLoading(format!(
                "Insufficient data: {} rows, minimum {} required",
                df.height(),
                min_rows
            )));
        }
        Ok(())
    }

    /// Null counts per column, only for columns that have any
    pub fn check_nulls(df: &DataFrame) -> Result<Vec<(String, usize)>> {
        let mut null_report = Vec::new();

        for column in df.get_columns() {
            let null_count = column.null_count();
            if null_count > 0 {
                null_report.push((column.name().to_string(), null_count));
            }
        }

        Ok(null_report)
    }
}
