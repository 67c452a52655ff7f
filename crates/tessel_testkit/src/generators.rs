//! Property-based test generators using proptest.

use proptest::prelude::*;
use tessel_core::{Comparisons, Order};
use tessel_engine::Key;

/// Strategy for numeric keys.
pub fn number_key_strategy() -> impl Strategy<Value = Key> {
    (-1_000i64..1_000).prop_map(Key::from)
}

/// Strategy for short lowercase text keys.
pub fn text_key_strategy() -> impl Strategy<Value = Key> {
    prop::string::string_regex("[a-z]{0,6}")
        .expect("Invalid regex")
        .prop_map(Key::from)
}

/// Strategy for keys of either kind.
pub fn key_strategy() -> impl Strategy<Value = Key> {
    prop_oneof![number_key_strategy(), text_key_strategy()]
}

/// Strategy for a non-empty prefix.
pub fn prefix_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,4}").expect("Invalid regex")
}

/// Strategy for the values of an `items` fixture. Duplicates are likely.
pub fn values_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..50, 0..40)
}

/// Strategy for `(limit, offset)` pairs, limit possibly unset.
pub fn page_strategy() -> impl Strategy<Value = (Option<u32>, u32)> {
    (prop::option::of(0u32..50), 0u32..50)
}

/// Strategy for result order.
pub fn order_strategy() -> impl Strategy<Value = Order> {
    prop_oneof![Just(Order::Ascending), Just(Order::Descending)]
}

/// Strategy for comparison sets over small integers, each field
/// independently present or absent.
pub fn comparisons_strategy() -> impl Strategy<Value = Comparisons> {
    let bound = || prop::option::of(0i64..50);
    (bound(), bound(), bound(), bound(), bound(), prop::option::of((0i64..50, 0i64..50)))
        .prop_map(|(eq, gt, gte, lt, lte, between)| {
            let mut comparisons = Comparisons::new();
            comparisons.eq = eq.map(Key::from);
            comparisons.gt = gt.map(Key::from);
            comparisons.gte = gte.map(Key::from);
            comparisons.lt = lt.map(Key::from);
            comparisons.lte = lte.map(Key::from);
            comparisons.between = between
                .map(|(a, b)| (a.min(b), a.max(b)))
                .map(|(a, b)| (Key::from(a), Key::from(b)));
            comparisons
        })
}
