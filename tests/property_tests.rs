//! Property-based tests for labtrack
//!
//! - Test ranking and evaluation invariants
//! - Test that execution only mutates on success
//! - Run with ProptestConfig::with_cases(100)

use std::collections::BTreeMap;

use chrono::NaiveDate;
use labtrack::catalog::{
    evaluate, ExperimentId, ExperimentRecord, ReagentId, ReagentRecord, RecipeId, RecipeRecord,
    Registry,
};
use labtrack::execution::{execute, SimulationModel};
use labtrack::topk::{SortOrder, TopKSelection};
use labtrack::Error;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Tally of (index, count) pairs
fn arb_tally() -> impl Strategy<Value = Vec<(usize, u32)>> {
    proptest::collection::vec(0u32..20, 0..40)
        .prop_map(|counts| counts.into_iter().enumerate().collect())
}

/// Stock levels and required quantities for a recipe of 1..5 reagents
fn arb_requirements() -> impl Strategy<Value = Vec<(f64, f64)>> {
    proptest::collection::vec((0.1f64..100.0, 0.0f64..200.0), 1..5)
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

fn build(requirements: &[(f64, f64)]) -> Registry {
    let mut registry = Registry::new();
    let mut recipe = RecipeRecord::builder(RecipeId(1), "Recipe");
    for (i, &(quantity, stock)) in requirements.iter().enumerate() {
        let id = ReagentId(u32::try_from(i).unwrap() + 1);
        registry
            .add_reagent(ReagentRecord::builder(id, format!("R{i}"), "g").inventory(stock).build().unwrap())
            .unwrap();
        recipe = recipe.requirement(id, quantity, "g");
    }
    registry.add_recipe(recipe.build().unwrap()).unwrap();
    registry
        .add_experiment(
            ExperimentRecord::new(
                ExperimentId(1),
                RecipeId(1),
                vec!["Ana".into()],
                today(),
                0.0,
            )
            .unwrap(),
        )
        .unwrap();
    registry
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: Top-K returns min(k, n) entries, best first
    #[test]
    fn prop_topk_sorted_and_bounded(tally in arb_tally(), k in 1usize..50) {
        let n = tally.len();
        let top = tally.clone().top_k(k, SortOrder::Descending).unwrap();
        prop_assert_eq!(top.len(), k.min(n));
        for pair in top.windows(2) {
            prop_assert!(pair[0].1 >= pair[1].1);
            if pair[0].1 == pair[1].1 {
                // Ties keep first-encountered order
                prop_assert!(pair[0].0 < pair[1].0);
            }
        }
    }

    /// Property: Top-K equals a stable sort truncated to k
    #[test]
    fn prop_topk_matches_stable_sort(tally in arb_tally(), k in 1usize..50) {
        let mut expected = tally.clone();
        expected.sort_by(|a, b| b.1.cmp(&a.1));
        expected.truncate(k);
        prop_assert_eq!(tally.clone().top_k(k, SortOrder::Descending).unwrap(), expected);

        let mut ascending = tally.clone();
        ascending.sort_by(|a, b| a.1.cmp(&b.1));
        ascending.truncate(k);
        prop_assert_eq!(tally.top_k(k, SortOrder::Ascending).unwrap(), ascending);
    }

    /// Property: a result is valid iff every ranged value is within its range
    #[test]
    fn prop_evaluate_inclusive(value in -10.0f64..10.0, low in -5.0f64..0.0, high in 0.0f64..5.0) {
        let obtained = BTreeMap::from([("m".to_string(), value)]);
        let acceptable = BTreeMap::from([("m".to_string(), (low, high))]);
        prop_assert_eq!(evaluate(&obtained, &acceptable), low <= value && value <= high);
        prop_assert!(evaluate(&obtained, &BTreeMap::new()));
    }

    /// Property: execution succeeds iff every stock covers its requirement,
    /// and a failed run mutates nothing
    #[test]
    fn prop_execute_all_or_nothing(requirements in arb_requirements(), seed in any::<u64>()) {
        let mut registry = build(&requirements);
        let before = registry.clone();
        let mut rng = StdRng::seed_from_u64(seed);
        let runnable = requirements.iter().all(|&(quantity, stock)| stock >= quantity);

        match execute(&mut registry, ExperimentId(1), today(), &SimulationModel::default(), &mut rng) {
            Ok(report) => {
                prop_assert!(runnable);
                prop_assert_eq!(registry.results().len(), 1);
                for (used, &(quantity, stock)) in report.consumption.iter().zip(&requirements) {
                    let left = registry.reagent(used.reagent).unwrap().inventory();
                    prop_assert!(left <= stock - quantity * 1.001 + 1e-9);
                    prop_assert!(left >= stock - quantity * 1.225 - 1e-9);
                }
            }
            Err(Error::InsufficientInventory { .. }) => {
                prop_assert!(!runnable);
                prop_assert_eq!(registry.reagents(), before.reagents());
                prop_assert!(registry.results().is_empty());
            }
            Err(e) => prop_assert!(false, "unexpected error: {}", e),
        }
    }
}
