// tests/aggregate_properties.rs
//
// Properties of compute_scores over generated record sets.

use std::collections::HashSet;

use proptest::prelude::*;

use livability_scores::{
    compute_scores, AggregateOptions, Category, CategoryValues, DuplicatePolicy, MetricRecord,
    PeriodLabel, WeightVector,
};

fn values() -> impl Strategy<Value = [f64; 7]> {
    prop::array::uniform7(0.0f64..=1.0)
}

fn records() -> impl Strategy<Value = Vec<MetricRecord>> {
    prop::collection::vec((0u8..6, 2018i64..2023, values()), 1..40).prop_map(|rows| {
        rows.into_iter()
            .map(|(c, y, v)| {
                MetricRecord::new(
                    format!("City {c}"),
                    PeriodLabel::Year(y),
                    CategoryValues::complete(v),
                )
            })
            .collect()
    })
}

/// Non-negative weights normalised to sum 1.
fn unit_weights() -> impl Strategy<Value = WeightVector> {
    prop::array::uniform7(0.0f64..=1.0)
        .prop_filter("not all zero", |w| w.iter().sum::<f64>() > 1e-6)
        .prop_map(|w| {
            let total: f64 = w.iter().sum();
            let pairs: Vec<(Category, f64)> = Category::ALL
                .iter()
                .zip(w.iter())
                .map(|(c, v)| (*c, v / total))
                .collect();
            WeightVector::from_pairs(&pairs)
        })
}

proptest! {
    #[test]
    fn one_output_per_distinct_key(rs in records(), w in unit_weights()) {
        let out = compute_scores(&rs, &w, AggregateOptions::default()).unwrap();
        let keys: HashSet<String> = rs.iter().map(MetricRecord::key).collect();
        prop_assert_eq!(out.len(), keys.len());
        let out_keys: HashSet<String> =
            out.iter().map(|s| format!("{}_{}", s.city, s.period)).collect();
        prop_assert_eq!(out_keys, keys);
    }

    #[test]
    fn score_stays_within_category_range(v in values(), w in unit_weights()) {
        let r = MetricRecord::new("A", PeriodLabel::Year(2022), CategoryValues::complete(v));
        let out = compute_scores(&[r], &w, AggregateOptions::default()).unwrap();
        let lo = v.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(out[0].score >= lo - 1e-9 && out[0].score <= hi + 1e-9,
            "score {} outside [{}, {}]", out[0].score, lo, hi);
    }

    #[test]
    fn first_seen_record_decides_duplicates(a in values(), b in values(), w in unit_weights()) {
        let first = MetricRecord::new("A", PeriodLabel::Year(2022), CategoryValues::complete(a));
        let second = MetricRecord::new("A", PeriodLabel::Year(2022), CategoryValues::complete(b));
        let alone = compute_scores(std::slice::from_ref(&first), &w, AggregateOptions::default()).unwrap();
        let both = compute_scores(&[first, second], &w, AggregateOptions::default()).unwrap();
        prop_assert_eq!(both.len(), 1);
        prop_assert_eq!(both[0].score, alone[0].score);
    }

    #[test]
    fn average_of_identical_rows_is_unchanged(v in values(), n in 1usize..5) {
        let rows: Vec<MetricRecord> = (0..n)
            .map(|_| MetricRecord::new("A", PeriodLabel::Year(2022), CategoryValues::complete(v)))
            .collect();
        let opts = AggregateOptions { duplicates: DuplicatePolicy::Average, ..Default::default() };
        let avg = compute_scores(&rows, &WeightVector::default(), opts).unwrap();
        let first = compute_scores(&rows[..1], &WeightVector::default(), AggregateOptions::default()).unwrap();
        prop_assert!((avg[0].score - first[0].score).abs() < 1e-9);
    }
}

#[test]
fn default_weights_on_all_ones_is_one() {
    let r = MetricRecord::new("A", PeriodLabel::Year(2022), CategoryValues::complete([1.0; 7]));
    let out = compute_scores(&[r], &WeightVector::default(), AggregateOptions::default()).unwrap();
    assert!((out[0].score - 1.0).abs() < 1e-12);
}
