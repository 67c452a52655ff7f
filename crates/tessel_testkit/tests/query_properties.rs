//! Property tests for condition translation and query execution.

use proptest::prelude::*;
use std::ops::Bound;
use tessel_core::{translate, Comparisons, Condition, Order, PREFIX_SENTINEL};
use tessel_engine::{Key, KeyRange};
use tessel_testkit::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

/// The `value` field of each record, in result order.
fn values(records: &[serde_json::Value]) -> Vec<i64> {
    field_values(records, "value")
}

/// Values sorted the way the `value` index walks them: by value, then id.
fn index_order(input: &[i64]) -> Vec<i64> {
    let mut sorted = input.to_vec();
    sorted.sort_unstable();
    sorted
}

#[test]
fn prefix_range_uses_sentinel_upper_bound() {
    let range = translate(&Condition::StartsWith("ab".into())).unwrap().unwrap();
    let expected = KeyRange::bound("ab", format!("ab{PREFIX_SENTINEL}"), false, false).unwrap();
    assert_eq!(range, expected);
    assert!(range.includes(&Key::from("abc")));
    assert!(range.includes(&Key::from("ab")));
    assert!(!range.includes(&Key::from("ac")));
}

#[test]
fn inverted_bounds_are_rejected() {
    let err = Comparisons::new().gte(10).lte(5).to_range(false).unwrap_err();
    assert!(matches!(err, tessel_core::CoreError::Validation { .. }));
}

proptest! {
    #[test]
    fn gte_and_lte_give_inclusive_bounds(a in -1000i64..1000, b in -1000i64..1000) {
        let (lo, hi) = (a.min(b), a.max(b));
        let range = Comparisons::new().gte(lo).lte(hi).to_range(false).unwrap().unwrap();
        let (lo, hi) = (Key::from(lo), Key::from(hi));
        let (lower, upper) = range.to_bounds();
        prop_assert_eq!(lower, Bound::Included(&lo));
        prop_assert_eq!(upper, Bound::Included(&hi));
    }

    #[test]
    fn prefix_range_contains_every_extension(prefix in prefix_strategy(), tail in "[a-z]{0,4}") {
        let range = translate(&Condition::StartsWith(prefix.clone())).unwrap().unwrap();
        let extended = format!("{prefix}{tail}");
        prop_assert!(range.includes(&Key::from(extended)));
    }

    #[test]
    fn equals_is_a_single_key_range(key in key_strategy()) {
        let range = translate(&Condition::Equals(key.clone())).unwrap().unwrap();
        prop_assert_eq!(range, KeyRange::only(key));
    }

    #[test]
    fn descending_is_reversed_ascending(input in values_strategy()) {
        let fixture = TestDatabase::values(&input);
        let rt = runtime();
        let query = fixture.query("items").index("value");
        let asc = rt.block_on(query.order_by(Order::Ascending).find_all()).unwrap();
        let mut desc = rt.block_on(query.order_by(Order::Descending).find_all()).unwrap();
        desc.reverse();
        prop_assert_eq!(values(&asc), index_order(&input));
        prop_assert_eq!(asc, desc);
    }

    #[test]
    fn cursor_descending_matches_bulk_descending(input in values_strategy()) {
        let fixture = TestDatabase::values(&input);
        let rt = runtime();
        let query = fixture.query("items").index("value").order_by(Order::Descending);
        let bulk = rt.block_on(query.find_all()).unwrap();
        let cursor = rt.block_on(query.limit(u32::MAX).find_all()).unwrap();
        prop_assert_eq!(bulk, cursor);
    }

    #[test]
    fn pagination_returns_the_expected_window(
        input in values_strategy(),
        (limit, offset) in page_strategy(),
        order in order_strategy(),
    ) {
        let fixture = TestDatabase::values(&input);
        let rt = runtime();
        let mut query = fixture.query("items").index("value").order_by(order).offset(offset);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let before = fixture.stats();
        let records = rt.block_on(query.find_all()).unwrap();
        let delta = fixture.stats().since(&before);

        let mut expected = index_order(&input);
        if order == Order::Descending {
            expected.reverse();
        }
        let expected: Vec<i64> = expected
            .into_iter()
            .skip(offset as usize)
            .take(limit.map_or(usize::MAX, |l| l as usize))
            .collect();
        prop_assert_eq!(values(&records), expected);

        let n = input.len() as u64;
        match limit {
            Some(0) => prop_assert_eq!(delta.transactions_opened, 0),
            Some(limit) => {
                prop_assert_eq!(delta.transactions_opened, 1);
                prop_assert_eq!(delta.cursor_visits, n.min(u64::from(offset) + u64::from(limit)));
            }
            None => prop_assert_eq!(delta.transactions_opened, 1),
        }
    }

    #[test]
    fn count_ignores_paging(
        input in values_strategy(),
        target in 0i64..50,
        (limit, offset) in page_strategy(),
    ) {
        let fixture = TestDatabase::values(&input);
        let rt = runtime();
        let mut query = fixture.query("items").index("value").equals(target).offset(offset);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let count = rt.block_on(query.count()).unwrap();
        let expected = input.iter().filter(|v| **v == target).count() as u64;
        prop_assert_eq!(count, expected);
    }

    #[test]
    fn comparison_queries_match_their_range(
        input in values_strategy(),
        comparisons in comparisons_strategy(),
    ) {
        let fixture = TestDatabase::values(&input);
        let rt = runtime();
        let result = rt.block_on(fixture.query("items").index("value").filter(comparisons.clone()).find_all());
        match comparisons.to_range(false) {
            Ok(range) => {
                let expected: Vec<i64> = index_order(&input)
                    .into_iter()
                    .filter(|v| range.as_ref().map_or(true, |r| r.includes(&Key::from(*v))))
                    .collect();
                prop_assert_eq!(values(&result.unwrap()), expected);
            }
            Err(err) => prop_assert_eq!(result.unwrap_err(), err),
        }
    }

    #[test]
    fn strict_mode_accepts_what_it_does_not_reject(comparisons in comparisons_strategy()) {
        let lenient = comparisons.to_range(false);
        match comparisons.check_strict() {
            Ok(()) => prop_assert_eq!(comparisons.to_range(true), lenient),
            Err(_) => prop_assert!(comparisons.to_range(true).is_err()),
        }
    }
}
