//! End-to-end pipeline runs over the sample taxonomy

use approx::assert_relative_eq;
use ledgerline_aggregate::AggregateMethod;
use ledgerline_confidence::{AggregationStrategy, ResolutionTier, VerdictStatus};
use ledgerline_lineage::{NodeKind, TraceOptions};
use ledgerline_pipeline::*;
use ledgerline_taxonomy::*;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

const SAMPLE: &str = include_str!("../../../fixtures/sample_taxonomy.json");

fn taxonomy() -> ResolvedTaxonomy {
    let snapshot = TaxonomySnapshot::from_json(SAMPLE).unwrap();
    ResolvedTaxonomy::build(snapshot).unwrap().0
}

fn config() -> PipelineConfig {
    PipelineConfig {
        session: Some("test".to_string()),
        ..PipelineConfig::default()
    }
}

/// Income statement and balance sheet for one period; column 2.
fn fy2023() -> Vec<RawRow> {
    let lines = [
        ("Revenues", 1000.0),
        ("Product revenue", 600.0),
        ("Service revenue", 400.0),
        ("Cost of revenue", 400.0),
        ("Selling, general and administrative expense", 200.0),
        ("Research and development expense", 100.0),
        ("Depreciation, depletion and amortization", 50.0),
        ("Interest expense", 20.0),
        ("Net income (loss)", 150.0),
        ("Cash and cash equivalents", 100.0),
        ("Accounts receivable, net", 120.0),
        ("Inventory, net", 80.0),
        ("Assets, current", 300.0),
        ("Assets", 1000.0),
        ("Liabilities, current", 150.0),
        ("Long-term debt", 300.0),
        ("Liabilities", 600.0),
        ("Stockholders' equity", 400.0),
        ("Payments to acquire property, plant and equipment", 80.0),
        ("xyzzy", 5.0),
    ];
    lines
        .iter()
        .enumerate()
        .map(|(i, (label, value))| {
            RawRow::new("Financials", i as u32 + 2, 2, label)
                .with_period("FY2023")
                .with_value(*value)
        })
        .collect()
}

/// A second period whose revenue components overshoot the reported total.
fn fy2024() -> Vec<RawRow> {
    [
        ("Revenues", 1100.0),
        ("Product revenue", 700.0),
        ("Service revenue", 500.0),
        ("Cost of revenue", 500.0),
        ("Selling, general and administrative expense", 250.0),
    ]
    .iter()
    .enumerate()
    .map(|(i, (label, value))| {
        RawRow::new("Financials", i as u32 + 2, 3, label)
            .with_period("FY2024")
            .with_value(*value)
    })
    .collect()
}

// ============================================================================
// Single period
// ============================================================================

#[test]
fn test_single_period_metrics() {
    let tax = taxonomy();
    let pipeline = Pipeline::new(&tax, config()).unwrap();
    let report = pipeline.run(&fy2023()).unwrap();
    let p = Some("FY2023");

    let revenue = report.bucket(p, "revenue").unwrap();
    assert_eq!(revenue.outcome.result.method, AggregateMethod::TotalLineUsed);
    assert_eq!(revenue.outcome.result.value, 1000.0);
    assert_relative_eq!(revenue.confidence.value(), 0.855, epsilon = 1e-9);

    let cogs = report.bucket(p, "cogs").unwrap();
    assert_eq!(
        cogs.outcome.result.strategy,
        Some(AggregationStrategy::SingleValue)
    );
    assert_relative_eq!(cogs.confidence.value(), 0.81, epsilon = 1e-9);

    let value = |name: &str| report.metric(p, name).unwrap().value;
    assert_eq!(value("gross_profit"), 600.0);
    assert_eq!(value("ebitda"), 300.0);
    assert_eq!(value("ebit"), 250.0);
    assert_eq!(value("net_debt"), 200.0);
    assert_eq!(value("working_capital"), 150.0);

    let gross = report.metric(p, "gross_profit").unwrap();
    assert_eq!(gross.formula, "revenue - cogs");
    assert_eq!(gross.inputs.get("revenue"), Some(&1000.0));
    assert_relative_eq!(gross.confidence.value(), 0.81, epsilon = 1e-9);

    assert!(report.validation.is_valid(), "{:?}", report.validation.violations);
}

#[test]
fn test_buckets_without_rows_have_no_node() {
    let tax = taxonomy();
    let report = Pipeline::new(&tax, config())
        .unwrap()
        .run(&fy2023())
        .unwrap();

    let tax_bucket = report.bucket(Some("FY2023"), "tax").unwrap();
    assert!(tax_bucket.node.is_none());
    assert_eq!(tax_bucket.outcome.result.method, AggregateMethod::NoData);
    assert!(tax_bucket.confidence.is_zero());
    assert!(!report.model_inputs.contains_key("Income Tax"));
}

#[test]
fn test_unmapped_rows_are_reported() {
    let tax = taxonomy();
    let report = Pipeline::new(&tax, config())
        .unwrap()
        .run(&fy2023())
        .unwrap();

    assert_eq!(report.resolutions.len(), 20);
    let last = report.resolutions.last().unwrap();
    assert_eq!(last.tier(), ResolutionTier::Unmapped);
    assert_eq!(report.resolution_stats.total(), 20);
    assert_eq!(report.resolution_stats.found(), 19);

    assert_eq!(report.quality.mapped_nodes, 20);
    assert_eq!(report.quality.mapped_with_concept, 19);
    assert_eq!(report.quality.unmapped_labels, vec!["xyzzy".to_string()]);
    assert_relative_eq!(report.quality.coverage, 0.95, epsilon = 1e-9);
}

#[test]
fn test_metric_traces_back_to_source_cells() {
    let tax = taxonomy();
    let report = Pipeline::new(&tax, config())
        .unwrap()
        .run(&fy2023())
        .unwrap();
    let ebitda = report.metric(Some("FY2023"), "ebitda").unwrap();

    let cells: BTreeSet<String> = report
        .graph
        .trace_backward(&ebitda.node, TraceOptions::default())
        .unwrap()
        .into_iter()
        .filter(|n| n.kind == NodeKind::SourceCell)
        .filter_map(|n| n.cell.as_ref().map(|c| c.cell_ref.clone()))
        .collect();
    // Revenues, cost of revenue, SG&A and R&D; excluded components stay out.
    let expected: BTreeSet<String> = ["B2", "B5", "B6", "B7"].iter().map(|s| s.to_string()).collect();
    assert_eq!(cells, expected);
}

#[test]
fn test_confidence_never_rises_downstream() {
    let tax = taxonomy();
    let report = Pipeline::new(&tax, config())
        .unwrap()
        .run(&fy2023())
        .unwrap();

    for metric in &report.metrics {
        let ancestors = report
            .graph
            .trace_backward(&metric.node, TraceOptions::default())
            .unwrap();
        for ancestor in ancestors {
            if matches!(ancestor.kind, NodeKind::Aggregated | NodeKind::Calculated) {
                assert!(
                    metric.confidence <= ancestor.confidence,
                    "{} above {}",
                    metric.name,
                    ancestor.id
                );
            }
        }
    }
}

#[test]
fn test_cross_checks_pass_for_consistent_statements() {
    let tax = taxonomy();
    let report = Pipeline::new(&tax, config())
        .unwrap()
        .run(&fy2023())
        .unwrap();

    let kinds: Vec<CheckKind> = report.checks.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![CheckKind::BalanceSheet, CheckKind::RevenueIntegrity]);
    assert!(report.checks.iter().all(|c| c.valid));
}

// ============================================================================
// Multiple periods
// ============================================================================

#[test]
fn test_periods_are_aggregated_separately() {
    let tax = taxonomy();
    let mut rows = fy2023();
    rows.extend(fy2024());
    let report = Pipeline::new(&tax, config()).unwrap().run(&rows).unwrap();

    let revenue = report.bucket(Some("FY2024"), "revenue").unwrap();
    assert_eq!(revenue.outcome.result.method, AggregateMethod::CalculatedSum);
    assert_eq!(revenue.outcome.result.value, 1200.0);
    assert!(revenue.outcome.result.conflict);
    assert_relative_eq!(revenue.confidence.value(), 0.585, epsilon = 1e-9);

    assert_eq!(report.metric(Some("FY2024"), "gross_profit").unwrap().value, 700.0);
    assert_eq!(report.metric(Some("FY2023"), "gross_profit").unwrap().value, 600.0);
    // No D&A row for FY2024.
    assert!(report.metric(Some("FY2024"), "ebit").is_none());

    let failed: Vec<&CrossCheck> = report.checks.iter().filter(|c| !c.valid).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].period.as_deref(), Some("FY2024"));
    assert_eq!(failed[0].kind, CheckKind::RevenueIntegrity);

    let conflicts = report.graph.query_aggregations_with_conflicts();
    assert!(conflicts.len() >= 2);
    assert!(report.validation.is_valid());
}

#[test]
fn test_model_inputs_keep_lowest_period() {
    let tax = taxonomy();
    let mut rows = fy2023();
    rows.extend(fy2024());
    let report = Pipeline::new(&tax, config()).unwrap().run(&rows).unwrap();

    let revenue = report.model_inputs["Revenue"].unwrap();
    assert_relative_eq!(revenue.value(), 0.585, epsilon = 1e-9);

    let dcf = report.verdict("dcf").unwrap();
    assert_eq!(dcf.status, VerdictStatus::Blocked);
    assert!(dcf.blocking.iter().any(|f| f.input == "Revenue"));
}

// ============================================================================
// Verdicts
// ============================================================================

#[test]
fn test_missing_assumption_blocks_dcf() {
    let tax = taxonomy();
    let report = Pipeline::new(&tax, config())
        .unwrap()
        .run(&fy2023())
        .unwrap();

    let dcf = report.verdict("DCF").unwrap();
    assert_eq!(dcf.status, VerdictStatus::Blocked);
    let blocked: Vec<&str> = dcf.blocking.iter().map(|f| f.input.as_str()).collect();
    assert_eq!(blocked, vec!["WACC"]);
    assert!(dcf.overall_confidence.is_zero());
}

#[test]
fn test_assumptions_complete_the_model() {
    let tax = taxonomy();

    let mut passing = config();
    passing.assumptions.insert("WACC".to_string(), 0.85);
    let report = Pipeline::new(&tax, passing).unwrap().run(&fy2023()).unwrap();
    let dcf = report.verdict("DCF").unwrap();
    assert_eq!(dcf.status, VerdictStatus::Pass, "{:?}", dcf.blocking);
    assert_relative_eq!(dcf.overall_confidence.value(), 0.81, epsilon = 1e-9);

    let mut weak = config();
    weak.assumptions.insert("WACC".to_string(), 0.75);
    let report = Pipeline::new(&tax, weak).unwrap().run(&fy2023()).unwrap();
    let dcf = report.verdict("DCF").unwrap();
    assert_eq!(dcf.status, VerdictStatus::Warning);
    assert_eq!(dcf.warnings.len(), 1);
    assert_eq!(dcf.warnings[0].input, "WACC");
}

#[test]
fn test_summary_lists_every_model() {
    let tax = taxonomy();
    let report = Pipeline::new(&tax, config())
        .unwrap()
        .run(&fy2023())
        .unwrap();
    let summary = report.summary();

    assert_eq!(summary.session, "test");
    assert_eq!(summary.rows, 20);
    assert!(summary.graph_valid);
    assert_eq!(summary.failed_checks, 0);
    assert_eq!(summary.verdicts.len(), 3);
    assert_eq!(summary.verdicts["DCF"], VerdictStatus::Blocked);

    let json = serde_json::to_string(&summary).unwrap();
    assert!(json.contains("\"BLOCKED\""));
}

// ============================================================================
// Events, overrides and configuration
// ============================================================================

#[test]
fn test_events_follow_phase_order() {
    let tax = taxonomy();
    let seen: Arc<Mutex<Vec<PipelineEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut pipeline = Pipeline::new(&tax, config()).unwrap();
    pipeline.on_event(Box::new(move |event: &PipelineEvent| {
        sink.lock().unwrap().push(event.clone());
    }));
    pipeline.run(&fy2023()).unwrap();

    let events = seen.lock().unwrap();
    assert_eq!(events.len(), 8);
    assert_eq!(events[0], PipelineEvent::RowsExtracted { rows: 20 });
    assert!(matches!(events[1], PipelineEvent::LabelsResolved { .. }));
    match &events[2] {
        PipelineEvent::PeriodAggregated {
            period,
            buckets_with_data,
            buckets_without_data,
            conflicts,
        } => {
            assert_eq!(period.as_deref(), Some("FY2023"));
            assert_eq!(*buckets_with_data, 12);
            assert_eq!(*buckets_without_data, 1);
            assert_eq!(*conflicts, 0);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(
        events[3],
        PipelineEvent::MetricsCalculated {
            period: Some("FY2023".to_string()),
            calculated: 5,
            skipped: 0,
        }
    );
    assert!(matches!(events[4], PipelineEvent::ChecksCompleted { total: 2, .. }));
    assert!(events[5..]
        .iter()
        .all(|e| matches!(e, PipelineEvent::ModelEvaluated { .. })));
}

#[test]
fn test_overrides_reach_the_graph() {
    let tax = taxonomy();
    let store = OverrideStore::new();
    store
        .add(
            OverrideEntry::new("xyzzy", "us-gaap_InterestExpense"),
            &tax,
        )
        .unwrap();
    let report = Pipeline::new(&tax, config())
        .unwrap()
        .with_overrides(&store)
        .run(&fy2023())
        .unwrap();

    assert_eq!(report.resolution_stats.count(ResolutionTier::Override), 1);
    assert_eq!(report.graph.query_override_mappings().len(), 1);
    // Interest now sums the original line and the override.
    let interest = report.bucket(Some("FY2023"), "interest").unwrap();
    assert_eq!(interest.outcome.result.value, 25.0);
    assert_relative_eq!(report.quality.coverage, 1.0);
}

#[test]
fn test_same_session_gives_same_ids() {
    let tax = taxonomy();
    let pipeline = Pipeline::new(&tax, config()).unwrap();
    let first = pipeline.run(&fy2023()).unwrap();
    let second = pipeline.run(&fy2023()).unwrap();

    let ids = |r: &PipelineReport| -> Vec<String> {
        r.graph.nodes().iter().map(|n| n.id.to_string()).collect()
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.metrics, second.metrics);
}

#[test]
fn test_invalid_config_is_rejected() {
    let tax = taxonomy();
    let mut config = config();
    config.metrics.push(MetricDefinition::new(
        "margin",
        "Margin",
        vec![MetricTerm::plus("profit")],
    ));
    let err = Pipeline::new(&tax, config).err().unwrap();
    assert!(matches!(err, PipelineError::InvalidConfig(_)));
    assert!(err.to_string().contains("profit"));
}

#[test]
fn test_rows_load_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rows.json");
    std::fs::write(
        &path,
        r#"[{"sheet": "IS", "row": 3, "col": 2, "label": "Revenues", "period": "FY2023", "value": 10.0},
            {"sheet": "IS", "row": 4, "col": 2, "label": "Notes"}]"#,
    )
    .unwrap();

    let rows = load_rows(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].cell().cell_ref, "B3");
    assert_eq!(rows[1].value, None);

    let missing = load_rows(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(missing, PipelineError::Io { .. }));
}
