//! Sales table handling for forecasting.
//!
//! The inbound data contract is a table of `{date, category, sales, revenue}`
//! rows. [`SalesTable`] keeps the raw table as a polars `DataFrame` and hands
//! out validated, (category, date)-sorted [`SalesRecord`] rows to the rest of
//! the pipeline, which operates on plain buffers.

use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// One observation: a category's sales and revenue on a calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub category: String,
    pub sales: f64,
    pub revenue: f64,
}

/// Raw sales table backed by a polars DataFrame.
#[derive(Debug, Clone)]
pub struct SalesTable {
    /// Data frame containing the sales data
    df: DataFrame,
    /// Name of the date column
    date_column: String,
    /// Name of the category column
    category_column: String,
    /// Name of the sales column
    sales_column: String,
    /// Name of the revenue column, if present
    revenue_column: Option<String>,
}

/// Data loader for sales tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a sales table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<SalesTable> {
        let file = File::open(path)?;
        // Use polars DataFrame reader directly
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::detect_and_create_table(df)
    }

    /// Create a sales table from an existing DataFrame
    pub fn from_dataframe(df: DataFrame) -> Result<SalesTable> {
        Self::detect_and_create_table(df)
    }

    fn detect_and_create_table(df: DataFrame) -> Result<SalesTable> {
        let date_column = Self::detect_column(&df, &["date", "day", "ds"])
            .ok_or_else(|| ForecastError::DataError("No date column found in data".to_string()))?;
        let category_column = Self::detect_column(&df, &["category", "cat"]).ok_or_else(|| {
            ForecastError::DataError("No category column found in data".to_string())
        })?;
        let sales_column = Self::detect_column(&df, &["sales", "units", "quantity"])
            .ok_or_else(|| ForecastError::DataError("No sales column found in data".to_string()))?;
        let revenue_column = Self::detect_column(&df, &["revenue", "amount"]);

        Ok(SalesTable {
            df,
            date_column,
            category_column,
            sales_column,
            revenue_column,
        })
    }

    /// Find the first column whose lowercased name contains one of the candidates
    fn detect_column(df: &DataFrame, candidates: &[&str]) -> Option<String> {
        let column_names = df.get_column_names();

        for candidate in candidates {
            for name in &column_names {
                if name.to_lowercase().contains(candidate) {
                    return Some(name.to_string());
                }
            }
        }

        None
    }
}

impl SalesTable {
    /// Create a sales table from in-memory records
    pub fn from_records(records: &[SalesRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(ForecastError::DataError(
                "Cannot build a sales table from zero records".to_string(),
            ));
        }

        let dates: Vec<String> = records.iter().map(|r| r.date.to_string()).collect();
        let categories: Vec<String> = records.iter().map(|r| r.category.clone()).collect();
        let sales: Vec<f64> = records.iter().map(|r| r.sales).collect();
        let revenue: Vec<f64> = records.iter().map(|r| r.revenue).collect();

        let date_series = Series::new("date", dates);
        let category_series = Series::new("category", categories);
        let sales_series = Series::new("sales", sales);
        let revenue_series = Series::new("revenue", revenue);

        let df = DataFrame::new(vec![
            date_series,
            category_series,
            sales_series,
            revenue_series,
        ])?;

        Ok(Self {
            df,
            date_column: "date".to_string(),
            category_column: "category".to_string(),
            sales_column: "sales".to_string(),
            revenue_column: Some("revenue".to_string()),
        })
    }

    /// Get the underlying DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Number of rows in the table
    pub fn len(&self) -> usize {
        self.df.height()
    }

    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Extract validated records, sorted by (category, date).
    ///
    /// Fails on null cells, unparseable dates, or negative sales/revenue.
    pub fn records(&self) -> Result<Vec<SalesRecord>> {
        let dates = self.date_values()?;
        let categories = self.string_column(&self.category_column)?;
        let sales = self.numeric_column(&self.sales_column)?;
        let revenue = match &self.revenue_column {
            Some(name) => self.numeric_column(name)?,
            None => vec![0.0; self.df.height()],
        };

        let height = self.df.height();
        if dates.len() != height
            || categories.len() != height
            || sales.len() != height
            || revenue.len() != height
        {
            return Err(ForecastError::DataError(
                "Sales table contains null values".to_string(),
            ));
        }

        let mut records = Vec::with_capacity(height);
        for i in 0..height {
            if sales[i] < 0.0 || revenue[i] < 0.0 {
                return Err(ForecastError::ValidationError(format!(
                    "Negative sales or revenue at row {} ({} on {})",
                    i, categories[i], dates[i]
                )));
            }
            records.push(SalesRecord {
                date: dates[i],
                category: categories[i].clone(),
                sales: sales[i],
                revenue: revenue[i],
            });
        }

        records.sort_by(|a, b| (a.category.as_str(), a.date).cmp(&(b.category.as_str(), b.date)));

        Ok(records)
    }

    /// Get the date column as calendar dates
    fn date_values(&self) -> Result<Vec<NaiveDate>> {
        let col = self.df.column(&self.date_column)?;

        match col.dtype() {
            DataType::Utf8 => col
                .utf8()?
                .into_iter()
                .flatten()
                .map(|s| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
                        ForecastError::DataError(format!("Unparseable date '{}': {}", s, e))
                    })
                })
                .collect(),
            DataType::Date => {
                let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch");
                col.date()?
                    .into_iter()
                    .flatten()
                    .map(|days| {
                        epoch
                            .checked_add_signed(Duration::days(days as i64))
                            .ok_or_else(|| {
                                ForecastError::DataError(format!(
                                    "Date value {} days from epoch is out of range",
                                    days
                                ))
                            })
                    })
                    .collect()
            }
            other => Err(ForecastError::DataError(format!(
                "Unsupported date column type: {}",
                other
            ))),
        }
    }

    /// Get a string column as owned values
    fn string_column(&self, name: &str) -> Result<Vec<String>> {
        let col = self.df.column(name)?;
        match col.dtype() {
            DataType::Utf8 => Ok(col
                .utf8()?
                .into_iter()
                .flatten()
                .map(|s| s.to_string())
                .collect()),
            other => Err(ForecastError::DataError(format!(
                "Expected string column '{}', found {}",
                name, other
            ))),
        }
    }

    /// Get a numeric column as f64 values
    fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let col = self.df.column(name)?;
        match col.dtype() {
            DataType::Float64 => Ok(col.f64()?.into_iter().flatten().collect()),
            DataType::Float32 => Ok(col
                .f32()?
                .into_iter()
                .flatten()
                .map(|v| v as f64)
                .collect()),
            DataType::Int64 => Ok(col
                .i64()?
                .into_iter()
                .flatten()
                .map(|v| v as f64)
                .collect()),
            DataType::Int32 => Ok(col
                .i32()?
                .into_iter()
                .flatten()
                .map(|v| v as f64)
                .collect()),
            other => Err(ForecastError::DataError(format!(
                "Expected numeric column '{}', found {}",
                name, other
            ))),
        }
    }
}

/// Resample one category's series to strict daily frequency.
///
/// Interior gaps are forward-filled, leading gaps back-filled; values are
/// never interpolated so the weekly cycle length stays exact. Input must be
/// date-sorted; duplicate dates collapse to their last value.
pub fn fill_daily(dates: &[NaiveDate], values: &[f64]) -> (Vec<NaiveDate>, Vec<f64>) {
    if dates.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let first = dates[0];
    let last = dates[dates.len() - 1];
    let span = (last - first).num_days() as usize + 1;

    let mut out_dates = Vec::with_capacity(span);
    let mut out_values = Vec::with_capacity(span);

    let mut idx = 0;
    let mut current = first;
    let mut last_seen = values[0];

    while current <= last {
        // Consume every observation for the current day so the cursor never
        // falls behind on duplicate dates.
        while idx < dates.len() && dates[idx] == current {
            last_seen = values[idx];
            idx += 1;
        }
        out_dates.push(current);
        out_values.push(last_seen);
        current = current.succ_opt().expect("date overflow");
    }

    (out_dates, out_values)
}
