mod common;

use pretty_assertions::assert_eq;
use sales_forecast::features::{
    build_training_rows, feature_vector, CategoryEncoding, FEATURE_COUNT, FEATURE_NAMES, MAX_LAG,
};

#[test]
fn feature_names_match_vector_width() {
    assert_eq!(FEATURE_NAMES.len(), FEATURE_COUNT);

    let history = vec![10.0; 40];
    let x = feature_vector(
        common::start_date(),
        common::start_date(),
        &history,
        1,
    );
    assert_eq!(x.len(), FEATURE_COUNT);
}

#[test]
fn earliest_rows_per_category_are_dropped() {
    let records = common::synthetic_records(&["Books", "Toys"], 100, 7);
    let encoding = CategoryEncoding::fit(&["Books", "Toys"]);

    let rows = build_training_rows(&records, &encoding, common::start_date()).unwrap();

    // 100 days per category, the first MAX_LAG of each dropped.
    assert_eq!(rows.len(), 2 * (100 - MAX_LAG));
    assert!(rows.iter().all(|r| r.features.iter().all(|v| v.is_finite())));
}

#[test]
fn output_is_bit_for_bit_deterministic() {
    let records = common::synthetic_records(&["Books", "Garden"], 90, 3);
    let encoding = CategoryEncoding::fit(&["Books", "Garden"]);

    let a = build_training_rows(&records, &encoding, common::start_date()).unwrap();
    let b = build_training_rows(&records, &encoding, common::start_date()).unwrap();

    assert_eq!(a.len(), b.len());
    for (ra, rb) in a.iter().zip(b.iter()) {
        for (va, vb) in ra.features.iter().zip(rb.features.iter()) {
            assert_eq!(va.to_bits(), vb.to_bits());
        }
    }
}

#[test]
fn category_features_are_isolated() {
    let base = common::synthetic_records(&["Books", "Toys"], 120, 11);

    // Same Books series, wildly different Toys series.
    let mut perturbed = base.clone();
    for record in perturbed.iter_mut() {
        if record.category == "Toys" {
            record.sales *= 10.0;
        }
    }

    let encoding = CategoryEncoding::fit(&["Books", "Toys"]);
    let rows_a = build_training_rows(&base, &encoding, common::start_date()).unwrap();
    let rows_b = build_training_rows(&perturbed, &encoding, common::start_date()).unwrap();

    let books_a: Vec<_> = rows_a.iter().filter(|r| r.category == "Books").collect();
    let books_b: Vec<_> = rows_b.iter().filter(|r| r.category == "Books").collect();

    assert_eq!(books_a.len(), books_b.len());
    for (ra, rb) in books_a.iter().zip(books_b.iter()) {
        assert_eq!(ra.date, rb.date);
        assert_eq!(ra.features, rb.features);
        assert_eq!(ra.target, rb.target);
    }
}

#[test]
fn existing_encoding_is_applied_not_rebuilt() {
    // Encoding trained on three categories, applied to a table containing
    // only one of them plus an unseen one.
    let encoding = CategoryEncoding::fit(&["Books", "Garden", "Toys"]);
    assert_eq!(encoding.code_of("Toys"), 2);

    let records = common::synthetic_records(&["Toys", "Unseen"], 60, 5);
    let rows = build_training_rows(&records, &encoding, common::start_date()).unwrap();

    let code_idx = FEATURE_NAMES
        .iter()
        .position(|&n| n == "category_encoded")
        .unwrap();
    for row in rows.iter().filter(|r| r.category == "Toys") {
        assert_eq!(row.features[code_idx], 2.0);
    }
    for row in rows.iter().filter(|r| r.category == "Unseen") {
        assert_eq!(row.features[code_idx], 0.0);
    }
}
