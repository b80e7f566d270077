use chrono::NaiveDate;
use sales_forecast::data::DataLoader;
use std::fs;

#[test]
fn csv_with_inferred_integer_sales_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.csv");
    fs::write(
        &path,
        "date,category,sales,revenue\n\
         2024-01-01,Books,120,6000\n\
         2024-01-02,Books,135,6750\n\
         2024-01-01,Toys,80,4000\n",
    )
    .unwrap();

    let table = DataLoader::from_csv(&path).unwrap();
    let records = table.records().unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].category, "Books");
    assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(records[0].sales, 120.0);
    assert_eq!(records[2].category, "Toys");
    assert_eq!(records[2].revenue, 4000.0);
}

#[test]
fn csv_without_required_columns_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prices.csv");
    fs::write(&path, "timestamp,open,close\n2024-01-01,1.0,2.0\n").unwrap();

    assert!(DataLoader::from_csv(&path).is_err());
}
