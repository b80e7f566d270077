mod common;

use chrono::Duration;
use rstest::rstest;
use sales_forecast::data::SalesTable;
use sales_forecast::ensemble::{EnsembleForecastModel, ForecastRequest, TimePeriod};

const CATEGORIES: [&str; 8] = [
    "Beauty",
    "Books",
    "Clothing",
    "Electronics",
    "Garden",
    "Grocery",
    "Sports",
    "Toys",
];

fn trained_model(categories: &[&str], days: usize) -> EnsembleForecastModel {
    let table = common::synthetic_table(categories, days, 42);
    let mut model = EnsembleForecastModel::new(common::fast_config());
    model.train(&table).unwrap();
    model
}

#[rstest]
#[case(TimePeriod::Week, 7)]
#[case(TimePeriod::Month, 30)]
#[case(TimePeriod::Year, 365)]
fn horizon_returns_exact_row_count(#[case] period: TimePeriod, #[case] expected: usize) {
    let model = trained_model(&["Books", "Toys"], 140);
    let start = common::start_date() + Duration::days(140);

    let results = model
        .predict(&["Books".to_string()], period, Some(start))
        .unwrap();
    let points = &results["Books"];

    assert_eq!(points.len(), expected);
    for (i, point) in points.iter().enumerate() {
        assert_eq!(point.date, start + Duration::days(i as i64));
    }
}

#[test]
fn concrete_scenario_week_forecast() {
    // 730 daily rows x 8 categories, week horizon for one category.
    let model = trained_model(&CATEGORIES, 730);
    let tomorrow = common::start_date() + Duration::days(730);

    let results = model
        .predict(&["Electronics".to_string()], TimePeriod::Week, Some(tomorrow))
        .unwrap();
    let points = &results["Electronics"];

    assert_eq!(points.len(), 7);
    for pair in points.windows(2) {
        assert!(pair[1].date > pair[0].date);
    }
    assert_eq!(points[0].date, tomorrow);

    for point in points {
        assert!(point.predicted_sales >= 0.0);
        assert!(point.confidence_lower >= 0.0);
        assert!(point.confidence_lower <= point.predicted_sales);
        assert!(point.predicted_sales <= point.confidence_upper);
    }

    // The synthetic series sits in the hundreds; a sane forecast should too.
    assert!(points.iter().all(|p| p.predicted_sales > 100.0));
}

#[test]
fn unknown_category_is_omitted_not_an_error() {
    let model = trained_model(&["Books", "Toys"], 140);

    let results = model
        .predict(
            &["Books".to_string(), "Furniture".to_string()],
            TimePeriod::Week,
            Some(common::start_date() + Duration::days(140)),
        )
        .unwrap();

    assert!(results.contains_key("Books"));
    assert!(!results.contains_key("Furniture"));
}

#[test]
fn constant_category_degrades_to_boosting_only() {
    let records = common::with_constant_category(
        common::synthetic_records(&["Books", "Toys"], 140, 42),
        "Voucher",
        140,
        400.0,
    );
    let table = SalesTable::from_records(&records).unwrap();

    let mut model = EnsembleForecastModel::new(common::fast_config());
    let report = model.train(&table).unwrap();

    assert_eq!(report.degraded_categories, vec!["Voucher".to_string()]);

    // The degraded category still yields a valid boosting-only series.
    let results = model
        .predict(
            &["Voucher".to_string()],
            TimePeriod::Week,
            Some(common::start_date() + Duration::days(140)),
        )
        .unwrap();
    let points = &results["Voucher"];
    assert_eq!(points.len(), 7);
    assert!(points.iter().all(|p| p.predicted_sales >= 0.0));
}

#[test]
fn training_is_deterministic_with_pinned_seed() {
    let table = common::synthetic_table(&["Books", "Toys"], 140, 42);
    let start = common::start_date() + Duration::days(140);

    let mut a = EnsembleForecastModel::new(common::fast_config());
    a.train(&table).unwrap();
    let mut b = EnsembleForecastModel::new(common::fast_config());
    b.train(&table).unwrap();

    let fa = a
        .predict(&["Books".to_string()], TimePeriod::Month, Some(start))
        .unwrap();
    let fb = b
        .predict(&["Books".to_string()], TimePeriod::Month, Some(start))
        .unwrap();

    assert_eq!(fa, fb);
}

#[test]
fn request_without_categories_covers_all_trained() {
    let model = trained_model(&["Books", "Toys"], 140);

    let request = ForecastRequest {
        time_period: TimePeriod::Week,
        categories: None,
        include_confidence: true,
    };
    let results = model.forecast(&request).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.contains_key("Books"));
    assert!(results.contains_key("Toys"));
}

#[test]
fn request_can_drop_confidence_columns() {
    let model = trained_model(&["Books"], 140);

    let request = ForecastRequest {
        time_period: TimePeriod::Week,
        categories: Some(vec!["Books".to_string()]),
        include_confidence: false,
    };
    let results = model.forecast(&request).unwrap();

    for point in &results["Books"] {
        assert_eq!(point.confidence_lower, point.predicted_sales);
        assert_eq!(point.confidence_upper, point.predicted_sales);
    }
}

#[test]
fn metadata_reports_model_state() {
    let untrained = EnsembleForecastModel::new(common::fast_config());
    let meta = untrained.metadata();
    assert!(!meta.trained);
    assert_eq!(meta.feature_count, 0);

    let model = trained_model(&["Books", "Toys"], 140);
    let meta = model.metadata();
    assert!(meta.trained);
    assert_eq!(meta.feature_count, 25);
    assert_eq!(meta.category_count, 2);
    assert!(meta.holdout.is_some());
}

#[test]
fn short_histories_are_rejected() {
    // Fewer rows than the longest lag window leaves nothing to fit on.
    let table = common::synthetic_table(&["Books"], 25, 1);
    let mut model = EnsembleForecastModel::new(common::fast_config());
    assert!(model.train(&table).is_err());
}
