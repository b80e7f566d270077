//! Shared fixtures: synthetic daily sales tables with trend, weekly
//! seasonality, and noise.
#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use sales_forecast::config::ForecastConfig;
use sales_forecast::data::{SalesRecord, SalesTable};

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, 1, 4).unwrap()
}

/// Build a contiguous daily table for the given categories.
pub fn synthetic_table(categories: &[&str], days: usize, seed: u64) -> SalesTable {
    SalesTable::from_records(&synthetic_records(categories, days, seed)).unwrap()
}

pub fn synthetic_records(categories: &[&str], days: usize, seed: u64) -> Vec<SalesRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 25.0).unwrap();
    let start = start_date();

    let mut records = Vec::with_capacity(categories.len() * days);
    for (c, category) in categories.iter().enumerate() {
        let base = 500.0 + 150.0 * c as f64;
        for d in 0..days {
            let date = start + Duration::days(d as i64);
            let weekly = [0.0, 10.0, 5.0, 20.0, 45.0, 90.0, 70.0][d % 7];
            let trend = 0.3 * d as f64;
            let sales = (base + weekly + trend + noise.sample(&mut rng)).max(0.0);
            records.push(SalesRecord {
                date,
                category: category.to_string(),
                sales: (sales * 100.0).round() / 100.0,
                revenue: (sales * 50.0 * 100.0).round() / 100.0,
            });
        }
    }
    records
}

/// A constant-sales category appended to a synthetic table, for degradation
/// scenarios.
pub fn with_constant_category(
    mut records: Vec<SalesRecord>,
    category: &str,
    days: usize,
    level: f64,
) -> Vec<SalesRecord> {
    let start = start_date();
    for d in 0..days {
        records.push(SalesRecord {
            date: start + Duration::days(d as i64),
            category: category.to_string(),
            sales: level,
            revenue: level * 50.0,
        });
    }
    records
}

/// Default configuration shrunk so test fits stay fast.
pub fn fast_config() -> ForecastConfig {
    let mut config = ForecastConfig::default();
    config.boosting.n_estimators = 30;
    config.boosting.max_depth = 4;
    config.boosting.min_child_weight = 3.0;
    config.boosting.early_stopping_rounds = 10;
    config
}
