//! Integration tests for the complete Ledgerline pipeline
//!
//! These tests verify end-to-end functionality across crates:
//! - Taxonomy snapshot → ResolvedTaxonomy → Resolver
//! - Rows → Pipeline → Lineage graph → verdicts
//! - Lineage document and override files on disk
//!
//! Run with: cargo test --test integration_tests

use approx::assert_relative_eq;
use ledgerline_confidence::VerdictStatus;
use ledgerline_lineage::{LineageDocument, LineageGraph, NodeId, NodeKind, TraceOptions};
use ledgerline_pipeline::{load_rows, Pipeline, PipelineConfig, PipelineReport};
use ledgerline_resolver::{Resolver, ResolverConfig};
use ledgerline_taxonomy::{
    OverrideEntry, OverrideStore, ResolvedTaxonomy, TaxonomyProvider, TaxonomySnapshot,
};
use std::collections::BTreeSet;
use tempfile::tempdir;

const TAXONOMY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/sample_taxonomy.json");
const ROWS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/sample_rows.json");
const CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/sample_config.json");

fn taxonomy() -> ResolvedTaxonomy {
    let snapshot = TaxonomySnapshot::load(TAXONOMY).unwrap();
    let (taxonomy, report) = ResolvedTaxonomy::build(snapshot).unwrap();
    // The fixture carries one alias to a concept it does not define.
    assert_eq!(report.rejected_aliases.len(), 1);
    taxonomy
}

fn sample_run(taxonomy: &ResolvedTaxonomy) -> PipelineReport {
    let config = PipelineConfig::load(CONFIG).unwrap();
    let rows = load_rows(ROWS).unwrap();
    Pipeline::new(taxonomy, config).unwrap().run(&rows).unwrap()
}

// ============================================================================
// Full run from fixtures
// ============================================================================

#[test]
fn test_sample_run_end_to_end() {
    let tax = taxonomy();
    let report = sample_run(&tax);

    assert_eq!(report.graph.metadata().session_id, "sample");
    assert!(report.validation.is_valid(), "{:?}", report.validation.violations);

    let gp22 = report.metric(Some("FY2022"), "gross_profit").unwrap();
    let gp23 = report.metric(Some("FY2023"), "gross_profit").unwrap();
    assert_relative_eq!(gp22.value, 540.0, epsilon = 1e-9);
    assert_relative_eq!(gp23.value, 600.0, epsilon = 1e-9);
    assert_eq!(report.metrics.len(), 10);

    assert!(report.checks.iter().all(|c| c.valid));
    assert_eq!(report.checks.len(), 4);

    assert_eq!(report.verdicts.len(), 2);
    assert_eq!(report.verdict("DCF").unwrap().status, VerdictStatus::Pass);
    let comps = report.verdict("COMPS").unwrap();
    assert_eq!(comps.status, VerdictStatus::Blocked);
    let missing: Vec<&str> = comps.blocking.iter().map(|f| f.input.as_str()).collect();
    assert_eq!(missing, vec!["Market Cap", "Enterprise Value"]);
}

#[test]
fn test_every_calculated_node_reaches_a_source_cell() {
    let tax = taxonomy();
    let report = sample_run(&tax);

    for node in report.graph.query_nodes_by_kind(NodeKind::Calculated) {
        let ancestors = report
            .graph
            .trace_backward(&node.id, Default::default())
            .unwrap();
        assert!(
            ancestors.iter().any(|n| n.kind == NodeKind::SourceCell),
            "{} has no source cell",
            node.id
        );
    }
}

#[test]
fn test_resolver_and_pipeline_agree() {
    let tax = taxonomy();
    let report = sample_run(&tax);
    let rows = load_rows(ROWS).unwrap();

    let resolver = Resolver::new(&tax, ResolverConfig::default());
    for (row, resolution) in rows.iter().zip(&report.resolutions) {
        let direct = resolver.resolve(&row.label);
        assert_eq!(&direct, resolution, "{}", row.label);
    }
}

// ============================================================================
// Files on disk
// ============================================================================

#[test]
fn test_lineage_document_round_trip() {
    let tax = taxonomy();
    let report = sample_run(&tax);
    let dir = tempdir().unwrap();
    let path = dir.path().join("lineage.json");

    report.graph.to_document().save(&path).unwrap();
    let doc = LineageDocument::load(&path).unwrap();
    let reloaded = LineageGraph::from_document(doc).unwrap();

    assert_eq!(reloaded.node_count(), report.graph.node_count());
    assert_eq!(reloaded.edge_count(), report.graph.edge_count());
    assert_eq!(reloaded.statistics(), report.graph.statistics());
    assert!(reloaded.validate().is_valid());

    let ebitda = report.metric(Some("FY2023"), "ebitda").unwrap();
    let breakdown = reloaded.confidence_breakdown(&ebitda.node).unwrap();
    assert_eq!(breakdown.confidence, ebitda.confidence);
}

#[test]
fn test_saved_run_traces_like_the_live_graph() {
    let tax = taxonomy();
    let report = sample_run(&tax);
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.json");
    report.graph.to_document().save(&path).unwrap();

    let reloaded = LineageGraph::from_document(LineageDocument::load(&path).unwrap()).unwrap();
    assert_eq!(reloaded.metadata().session_id, "sample");

    let ids = |graph: &LineageGraph, node: &NodeId, options: TraceOptions| -> BTreeSet<NodeId> {
        graph
            .trace_backward(node, options)
            .unwrap()
            .into_iter()
            .map(|n| n.id.clone())
            .collect()
    };
    for metric in &report.metrics {
        let live = ids(&report.graph, &metric.node, TraceOptions::default());
        let saved = ids(&reloaded, &metric.node, TraceOptions::default());
        assert_eq!(saved, live, "{}", metric.node);
    }

    let shallow = TraceOptions {
        include_inactive: false,
        max_depth: Some(1),
    };
    let gp = report.metric(Some("FY2023"), "gross_profit").unwrap();
    let parents = ids(&reloaded, &gp.node, shallow);
    let all = ids(&reloaded, &gp.node, TraceOptions::default());
    assert!(!parents.is_empty());
    assert!(parents.len() < all.len());
    assert!(parents.is_subset(&all));

    let revenue = report.bucket(Some("FY2023"), "revenue").unwrap();
    let revenue_node = revenue.node.as_ref().unwrap();
    let consumers = reloaded
        .trace_forward(revenue_node, TraceOptions::default())
        .unwrap();
    assert!(consumers.iter().any(|n| n.id == gp.node));
}

#[test]
fn test_snapshot_round_trip_keeps_results() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("taxonomy.json");
    TaxonomySnapshot::load(TAXONOMY).unwrap().save(&path).unwrap();

    let (copy, _) = ResolvedTaxonomy::build(TaxonomySnapshot::load(&path).unwrap()).unwrap();
    let original = taxonomy();
    assert_eq!(copy.concept_count(), original.concept_count());

    let a = sample_run(&original);
    let b = sample_run(&copy);
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.resolutions, b.resolutions);
}

#[test]
fn test_override_file_changes_the_run() {
    let tax = taxonomy();
    let dir = tempdir().unwrap();
    let path = dir.path().join("overrides.json");

    let entries = vec![
        OverrideEntry::new("Memo: restated", "us-gaap_NetIncomeLoss"),
        OverrideEntry::new("Unknown line", "us-gaap_DoesNotExist"),
    ];
    std::fs::write(&path, serde_json::to_string_pretty(&entries).unwrap()).unwrap();

    let loaded: Vec<OverrideEntry> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let (store, rejected) = OverrideStore::load(loaded, &tax);
    assert_eq!(rejected.len(), 1);
    assert_eq!(store.len(), 1);
    assert!(!tax.contains(&rejected[0].concept));

    let config = PipelineConfig::load(CONFIG).unwrap();
    let rows = load_rows(ROWS).unwrap();
    let report = Pipeline::new(&tax, config)
        .unwrap()
        .with_overrides(&store)
        .run(&rows)
        .unwrap();

    let memo = report.resolutions.last().unwrap();
    assert_eq!(memo.concept.as_ref().map(|c| c.as_str()), Some("us-gaap_NetIncomeLoss"));
    assert_eq!(report.graph.query_override_mappings().len(), 1);
    // The memo row has no value, so net income is unchanged.
    let net_income = report.bucket(Some("FY2023"), "net_income").unwrap();
    assert_eq!(net_income.outcome.result.value, 150.0);
}
