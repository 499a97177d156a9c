//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the codec round trip, the expiry predicate and the
//! storage's behavior against a simple model.

use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::DateTime;

use crate::backend::{Driver, MemoryDriver};
use crate::cache::{codec, CacheEntry, RegExpValue, SetOptions, Storage, StorageOptions, Value};
use crate::error::StorageError;

// == Strategies ==
/// Generates valid keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,16}"
}

/// Finite numbers, kept to values that survive a JSON round trip exactly
fn finite_number_strategy() -> impl Strategy<Value = f64> {
    (-1_000_000i64..1_000_000i64, 0u32..4).prop_map(|(n, scale)| n as f64 / 10f64.powi(scale as i32))
}

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        finite_number_strategy().prop_map(Value::Number),
        Just(Value::Number(f64::INFINITY)),
        Just(Value::Number(f64::NEG_INFINITY)),
        // Plain text never starts with the sentinel prefix
        "[a-z0-9 ]{0,24}".prop_map(Value::String),
        (-8_640_000_000_000i64..8_640_000_000_000i64)
            .prop_map(|ms| Value::Date(DateTime::from_timestamp_millis(ms).unwrap())),
        ("[a-z.*+?]{1,12}", "[gimsuy]{0,3}")
            .prop_map(|(source, flags)| Value::RegExp(RegExpValue::new(source, flags))),
        "function [a-z]{1,8}\\(\\) \\{ return [0-9]{1,3} \\}".prop_map(Value::Function),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
    ]
}

/// Values without NaN, so derived equality applies
fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map: BTreeMap<String, Value>| Value::Object(map)),
        ]
    })
}

#[derive(Debug, Clone)]
enum StorageOp {
    Set { key: String, value: i64 },
    Get { key: String },
    Remove { key: String },
}

fn storage_op_strategy() -> impl Strategy<Value = StorageOp> {
    // A small key space so operations collide
    let key = "[a-d]";
    prop_oneof![
        (key, any::<i64>()).prop_map(|(key, value)| StorageOp::Set { key, value }),
        key.prop_map(|key| StorageOp::Get { key }),
        key.prop_map(|key| StorageOp::Remove { key }),
    ]
}

fn isolated_storage(name: &str) -> Storage {
    let drivers: Vec<Arc<dyn Driver>> = vec![Arc::new(MemoryDriver::new())];
    tokio_test::block_on(Storage::open_with(StorageOptions::new(name), &drivers, None)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Decoding an encoded value yields an equal value
    #[test]
    fn prop_codec_roundtrip(value in value_strategy()) {
        let decoded = codec::decode(codec::encode(&value));
        prop_assert_eq!(decoded, value);
    }

    // NaN is the one kind compared by predicate rather than equality
    #[test]
    fn prop_codec_nan_inside_structures(depth in 0usize..4) {
        let mut value = Value::Number(f64::NAN);
        for _ in 0..depth {
            value = Value::Array(vec![value]);
        }

        let mut decoded = codec::decode(codec::encode(&value));
        for _ in 0..depth {
            let Value::Array(mut items) = decoded else {
                return Err(TestCaseError::fail("expected array"));
            };
            decoded = items.remove(0);
        }
        prop_assert!(matches!(decoded, Value::Number(n) if n.is_nan()));
    }

    // Expiry flips exactly one millisecond after updated_at + max_age
    #[test]
    fn prop_ttl_boundary(max_age in 1i64..1_000_000, elapsed in 0u64..2_000_000) {
        let entry = CacheEntry::new("k", Value::Null, String::new(), max_age);
        let now = entry.updated_at() + elapsed;

        prop_assert_eq!(entry.is_outdated_at(now), elapsed > max_age as u64);
    }

    // Non-positive policies never expire
    #[test]
    fn prop_non_positive_max_age_never_expires(max_age in i64::MIN..=0, elapsed in any::<u64>()) {
        let entry = CacheEntry::new("k", Value::Null, String::new(), max_age);
        prop_assert!(!entry.is_outdated_at(entry.updated_at().saturating_add(elapsed)));
    }

    // The storage agrees with a plain map for any sequence of operations
    #[test]
    fn prop_storage_matches_model(ops in prop::collection::vec(storage_op_strategy(), 1..40)) {
        let storage = isolated_storage("model");
        let mut model: HashMap<String, i64> = HashMap::new();

        tokio_test::block_on(async {
            for op in ops {
                match op {
                    StorageOp::Set { key, value } => {
                        storage.set_item(&key, Value::from(value), SetOptions::default()).await.unwrap();
                        model.insert(key, value);
                    }
                    StorageOp::Get { key } => {
                        match (storage.get_item(&key).await, model.get(&key)) {
                            (Ok(got), Some(expected)) => assert_eq!(got, Value::from(*expected)),
                            (Err(StorageError::NotFound(_)), None) => {}
                            (got, expected) => panic!("mismatch: {:?} vs {:?}", got, expected),
                        }
                    }
                    StorageOp::Remove { key } => {
                        storage.remove_item(&key).await.unwrap();
                        model.remove(&key);
                    }
                }
            }

            let mut expected_keys: Vec<String> = model.keys().cloned().collect();
            expected_keys.sort();
            assert_eq!(storage.keys().await, expected_keys);
            assert_eq!(storage.length().await, model.len());
        });
    }
}

// Round trip for regexp literals with slashes in the pattern
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn prop_regexp_literal_roundtrip(source in "[a-z/]{1,10}", flags in "[gimsuy]{0,3}") {
        let re = RegExpValue::new(source, flags);
        prop_assert_eq!(RegExpValue::parse(&re.to_string()), Some(re));
    }
}
