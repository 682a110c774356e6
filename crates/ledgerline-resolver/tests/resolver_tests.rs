//! Tests for tiered label resolution against the sample taxonomy

use approx::assert_relative_eq;
use ledgerline_confidence::ResolutionTier;
use ledgerline_lineage::{CellRef, IdGenerator, LineageBuilder};
use ledgerline_resolver::*;
use ledgerline_taxonomy::*;

const SAMPLE: &str = include_str!("../../../fixtures/sample_taxonomy.json");

fn taxonomy() -> ResolvedTaxonomy {
    let snapshot = TaxonomySnapshot::from_json(SAMPLE).unwrap();
    ResolvedTaxonomy::build(snapshot).unwrap().0
}

fn id(s: &str) -> ConceptId {
    ConceptId::from(s)
}

// ============================================================================
// Exact tiers
// ============================================================================

#[test]
fn test_exact_label_and_alias_tiers() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());

    let exact = resolver.resolve("Revenues");
    assert_eq!(exact.tier(), ResolutionTier::ExactLabel);
    assert_eq!(exact.concept, Some(id("us-gaap_Revenues")));
    assert_relative_eq!(exact.confidence.value(), 0.90);

    let alias = resolver.resolve("  TURNOVER ");
    assert_eq!(alias.tier(), ResolutionTier::Alias);
    assert_eq!(alias.normalized, "turnover");
    assert_relative_eq!(alias.confidence.value(), 0.95);
}

#[test]
fn test_override_beats_alias() {
    let tax = taxonomy();
    let store = OverrideStore::new();
    store
        .add(OverrideEntry::new("Turnover", "us-gaap_SalesRevenueGoodsNet"), &tax)
        .unwrap();
    let resolver = Resolver::new(&tax, ResolverConfig::default()).with_overrides(&store);

    let r = resolver.resolve("turnover");
    assert_eq!(r.tier(), ResolutionTier::Override);
    assert_eq!(r.concept, Some(id("us-gaap_SalesRevenueGoodsNet")));
    assert_relative_eq!(r.confidence.value(), 1.0);
    assert_eq!(r.method(), "Override Memory (user override)");
}

// ============================================================================
// Fuzzy tier
// ============================================================================

#[test]
fn test_fuzzy_exact_hit_on_total_label() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());
    let r = resolver.resolve("Total revenues");
    assert_eq!(r.tier(), ResolutionTier::FuzzyLabel);
    assert_eq!(r.concept, Some(id("us-gaap_Revenues")));
    match &r.detail {
        ResolutionDetail::Fuzzy {
            score, role, match_kind, ..
        } => {
            assert_relative_eq!(*score, 98.0);
            assert_eq!(*role, LabelRole::Total);
            assert_eq!(*match_kind, MatchKind::Exact);
        }
        other => panic!("expected fuzzy detail, got {other:?}"),
    }
    assert_relative_eq!(r.confidence.value(), 0.882, epsilon = 1e-9);
    assert_eq!(r.method(), "Fuzzy Taxonomy (total, score=98)");
}

#[test]
fn test_fuzzy_terse_label() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());
    let r = resolver.resolve("Net income");
    assert_eq!(r.concept, Some(id("us-gaap_NetIncomeLoss")));
    assert_relative_eq!(r.confidence.value(), 0.855, epsilon = 1e-9);
}

#[test]
fn test_fuzzy_prefix_prefers_standard_label_and_lists_alternatives() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());
    let r = resolver.resolve("Income tax expense");
    assert_eq!(r.tier(), ResolutionTier::FuzzyLabel);
    assert_eq!(r.concept, Some(id("us-gaap_IncomeTaxExpenseBenefit")));
    assert!(r.confidence.value() >= 0.5 && r.confidence.value() <= 0.9);

    assert!(!r.alternatives.is_empty());
    assert!(r.alternatives.len() <= 3);
    assert!(r
        .alternatives
        .iter()
        .all(|a| a.concept != id("us-gaap_IncomeTaxExpenseBenefit")));
}

#[test]
fn test_short_input_skips_fuzzy() {
    let tax = taxonomy();
    let config = ResolverConfig {
        fuzzy_min_len: 20,
        ..ResolverConfig::default()
    };
    let resolver = Resolver::new(&tax, config);
    // would be a fuzzy exact hit on the total label otherwise
    let r = resolver.resolve("Total revenues");
    assert_eq!(r.tier(), ResolutionTier::Keyword);
    assert_eq!(r.concept, Some(id("us-gaap_Revenues")));
}

// ============================================================================
// Keyword and hierarchy tiers
// ============================================================================

#[test]
fn test_keyword_rules_in_declared_order() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());
    for (input, concept, rule) in [
        ("COGS", "us-gaap_CostOfRevenue", "cogs"),
        ("SG&A", "us-gaap_SellingGeneralAndAdministrativeExpense", "sg&a"),
        ("R&D", "us-gaap_ResearchAndDevelopmentExpense", "r&d"),
        ("PP&E", "us-gaap_PropertyPlantAndEquipmentNet", "ppe"),
    ] {
        let r = resolver.resolve(input);
        assert_eq!(r.tier(), ResolutionTier::Keyword, "{input}");
        assert_eq!(r.concept, Some(id(concept)), "{input}");
        assert_relative_eq!(r.confidence.value(), 0.70);
        match &r.detail {
            ResolutionDetail::Keyword { rule: name, .. } => assert_eq!(name, rule),
            other => panic!("expected keyword detail, got {other:?}"),
        }
    }
}

#[test]
fn test_keyword_rule_skips_concepts_missing_from_taxonomy() {
    let tax = taxonomy();
    let mut config = ResolverConfig::default();
    config.keyword_rules.insert(
        0,
        KeywordRule::new("ghost", &["cogs"], "us-gaap_NotInTaxonomy"),
    );
    let resolver = Resolver::new(&tax, config);
    assert_eq!(
        resolver.resolve("cogs").concept,
        Some(id("us-gaap_CostOfRevenue"))
    );
}

#[test]
fn test_hierarchy_fallback_walks_to_safe_parent() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());
    let r = resolver.resolve("advertising");
    assert_eq!(r.tier(), ResolutionTier::Hierarchy);
    assert_eq!(
        r.concept,
        Some(id("us-gaap_SellingGeneralAndAdministrativeExpense"))
    );
    assert_relative_eq!(r.confidence.value(), 0.60);
    assert_eq!(r.method(), "Safe Parent Fallback (depth=2)");

    let path = r.audit_path().unwrap();
    assert_eq!(
        path,
        &[
            id("us-gaap_AdvertisingExpense"),
            id("us-gaap_SellingAndMarketingExpense"),
            id("us-gaap_SellingGeneralAndAdministrativeExpense"),
        ]
    );
}

#[test]
fn test_hierarchy_respects_depth_cap_and_safe_mode() {
    let tax = taxonomy();
    let shallow = Resolver::new(
        &tax,
        ResolverConfig {
            max_hierarchy_depth: 1,
            ..ResolverConfig::default()
        },
    );
    assert_eq!(
        shallow.resolve("advertising").tier(),
        ResolutionTier::Unmapped
    );

    let off = Resolver::new(
        &tax,
        ResolverConfig {
            safe_mode: false,
            ..ResolverConfig::default()
        },
    );
    assert!(!off.resolve("advertising").found());
}

#[test]
fn test_find_safe_parent_excludes_start() {
    let tax = taxonomy();
    let safe = ResolverConfig::default().safe_parents;
    // AssetsCurrent is itself safe; the walk must climb to Assets
    let hit = find_safe_parent(&tax, &id("us-gaap_AssetsCurrent"), &safe, 5).unwrap();
    assert_eq!(hit.parent, id("us-gaap_Assets"));
    assert_eq!(hit.depth, 1);
    assert_eq!(hit.path_string(), "us-gaap_AssetsCurrent -> us-gaap_Assets");
}

// ============================================================================
// Unmapped, stats, batch
// ============================================================================

#[test]
fn test_unmapped_is_terminal_not_error() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());
    for input in ["xyzzy", "", "   "] {
        let r = resolver.resolve(input);
        assert!(!r.found());
        assert_eq!(r.tier(), ResolutionTier::Unmapped);
        assert!(r.confidence.is_zero());
        assert_eq!(r.method(), "Unmapped");
    }
}

#[test]
fn test_serialized_resolution_carries_found_and_method() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());

    let hit = serde_json::to_value(resolver.resolve("Turnover")).unwrap();
    assert_eq!(hit["found"], serde_json::Value::Bool(true));
    assert_eq!(hit["method"], "Explicit Alias");
    assert_eq!(hit["concept"], "us-gaap_Revenues");

    let miss = serde_json::to_value(resolver.resolve("xyzzy")).unwrap();
    assert_eq!(miss["found"], serde_json::Value::Bool(false));
    assert_eq!(miss["method"], "Unmapped");
    assert!(miss["concept"].is_null());

    let back: Resolution = serde_json::from_value(hit).unwrap();
    assert!(back.found());
    assert_eq!(back.method(), "Explicit Alias");
}

#[test]
fn test_stats_count_every_resolution() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());
    for input in ["Revenues", "Turnover", "COGS", "xyzzy"] {
        resolver.resolve(input);
    }
    let stats = resolver.stats();
    assert_eq!(stats.total(), 4);
    assert_eq!(stats.found(), 3);
    assert_eq!(stats.count(ResolutionTier::Alias), 1);
    assert_relative_eq!(stats.percent(ResolutionTier::Unmapped), 25.0);

    resolver.reset_stats();
    assert_eq!(resolver.stats().total(), 0);
    assert_eq!(resolver.stats().percent(ResolutionTier::Alias), 0.0);
}

#[test]
fn test_batch_matches_sequential_in_order() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());
    let labels = vec![
        "Revenues",
        "Total revenues",
        "COGS",
        "advertising",
        "Net income",
        "xyzzy",
        "Inventory, net",
    ];
    let batch = resolver.resolve_batch(&labels);
    assert_eq!(batch.len(), labels.len());
    for (label, result) in labels.iter().zip(&batch) {
        assert_eq!(result, &resolver.resolve(label));
    }
    assert_eq!(resolver.stats().total(), 2 * labels.len() as u64);
}

// ============================================================================
// Lineage emission and serialization
// ============================================================================

#[test]
fn test_record_resolution_carries_tier_and_path() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());
    let mut builder = LineageBuilder::new(IdGenerator::new("r"));
    let cell = builder
        .add_source_cell(
            CellRef {
                sheet: "IS".into(),
                row: 7,
                col: 1,
                cell_ref: "A7".into(),
            },
            Some("Advertising".into()),
            Some(12.0),
        )
        .unwrap();
    let (extracted, _) = builder
        .add_extraction(&cell, "Advertising", Some(12.0), None)
        .unwrap();

    let r = resolver.resolve("Advertising");
    let (mapped, edge) = record_resolution(&mut builder, &extracted, &r).unwrap();
    let graph = builder.graph();

    let edge = graph.get_edge(&edge).unwrap();
    assert_eq!(edge.tier, Some(ResolutionTier::Hierarchy));
    assert_eq!(edge.method, "Safe Parent Fallback (depth=2)");

    let node = graph.get_node(&mapped).unwrap();
    assert_relative_eq!(node.confidence.value(), 0.60);
    assert_eq!(
        node.metadata["hierarchy_path"].as_array().map(|p| p.len()),
        Some(3)
    );
    assert!(graph.validate().is_valid());
}

#[test]
fn test_resolution_serializes_with_tier_tag() {
    let tax = taxonomy();
    let resolver = Resolver::new(&tax, ResolverConfig::default());
    let json = serde_json::to_value(resolver.resolve("COGS")).unwrap();
    assert_eq!(json["detail"]["tier"], "keyword");
    assert_eq!(json["concept"], "us-gaap_CostOfRevenue");

    let config: ResolverConfig = serde_json::from_str(r#"{"max_hierarchy_depth": 2}"#).unwrap();
    assert_eq!(config.max_hierarchy_depth, 2);
    assert!(config.safe_mode);
    assert_eq!(config.keyword_rules, default_keyword_rules());
}
