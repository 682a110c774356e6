//! Property tests for calculation-graph traversal and calculation checks

use approx::relative_eq;
use ledgerline_taxonomy::*;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn concept_id(i: usize) -> ConceptId {
    ConceptId::from(format!("test_Concept{i:02}"))
}

/// A taxonomy over `n` concepts with arbitrary calculation arcs. Cycles and
/// self-loops are allowed; the build keeps them.
fn cyclic_taxonomy(n: usize, arcs: &[(usize, usize, bool)]) -> ResolvedTaxonomy {
    let snapshot = TaxonomySnapshot {
        concepts: (0..n).map(|i| Concept::new(concept_id(i))).collect(),
        calculations: arcs
            .iter()
            .enumerate()
            .map(|(order, &(parent, child, negative))| CalculationArc {
                parent: concept_id(parent % n),
                child: concept_id(child % n),
                weight: if negative { -1.0 } else { 1.0 },
                order: order as f64,
            })
            .collect(),
        ..TaxonomySnapshot::default()
    };
    ResolvedTaxonomy::build(snapshot).unwrap().0
}

fn arcs_strategy() -> impl Strategy<Value = (usize, Vec<(usize, usize, bool)>)> {
    (2usize..10).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec((0..n, 0..n, any::<bool>()), 0..30),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        failure_persistence: None,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_all_descendants_terminates_on_cycles((n, arcs) in arcs_strategy()) {
        let tax = cyclic_taxonomy(n, &arcs);
        for i in 0..n {
            let start = concept_id(i);
            let descendants = tax.all_descendants(&start);

            prop_assert!(!descendants.contains(&start));
            prop_assert!(descendants.len() < n);
            for d in &descendants {
                prop_assert!(tax.contains(d));
            }
        }
    }

    #[test]
    fn prop_all_descendants_is_closed_under_children((n, arcs) in arcs_strategy()) {
        let tax = cyclic_taxonomy(n, &arcs);
        for i in 0..n {
            let start = concept_id(i);
            let descendants = tax.all_descendants(&start);
            let mut reachable: BTreeSet<ConceptId> = descendants.clone();
            reachable.insert(start.clone());

            for node in &reachable {
                for child in tax.calculation_children(node) {
                    prop_assert!(reachable.contains(&child.child));
                }
            }
            for child in tax.calculation_children(&start) {
                if child.child != start {
                    prop_assert!(descendants.contains(&child.child));
                }
            }
        }
    }

    #[test]
    fn prop_calculation_check_is_the_weighted_child_sum(
        (n, arcs) in arcs_strategy(),
        values in prop::collection::vec(-1.0e6f64..1.0e6, 10),
    ) {
        let tax = cyclic_taxonomy(n, &arcs);
        let values: BTreeMap<ConceptId, f64> = values
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, v)| (concept_id(i), *v))
            .collect();

        for i in 0..n {
            let parent = concept_id(i);
            let Some(check) = check_calculation(&tax, &parent, &values, 0.01) else {
                prop_assert!(tax.calculation_children(&parent).is_empty());
                continue;
            };
            let expected: f64 = tax
                .calculation_children(&parent)
                .iter()
                .map(|c| values[&c.child] * c.weight)
                .sum();
            prop_assert!(relative_eq!(check.calculated, expected, epsilon = 1e-6));
            prop_assert!(relative_eq!(
                check.difference,
                (check.reported - check.calculated).abs(),
                epsilon = 1e-6
            ));
            prop_assert!(check.children_missing.is_empty());
        }
    }
}
